//! Game engines.
//!
//! Each engine owns its slice of session state and exposes pure state
//! transitions over a [`Session`](crate::session::Session). The manager
//! and router stay agnostic to which engine is active except through the
//! session's game type.

pub mod bingo;
pub mod trivia;

use serde::{Deserialize, Serialize};

use crate::session::Session;
use bingo::BingoState;
use trivia::{Question, TriviaState};

/// Which game a session is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Trivia,
    Bingo,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivia => "trivia",
            Self::Bingo => "bingo",
        }
    }
}

/// Per-game state, tagged by game type.
///
/// A session either has no game state or state whose shape matches its
/// game type; a mix of the two shapes is unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Trivia(TriviaState),
    Bingo(BingoState),
}

impl GameState {
    pub fn game_type(&self) -> GameType {
        match self {
            Self::Trivia(_) => GameType::Trivia,
            Self::Bingo(_) => GameType::Bingo,
        }
    }

    /// The bare state object sent to clients (without the type tag).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Trivia(state) => serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
            Self::Bingo(state) => serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Initialize the given game on a session, replacing any previous game
/// state and resetting every player's per-game fields.
pub fn initialize(session: &mut Session, game_type: GameType, questions: Vec<Question>) {
    match game_type {
        GameType::Trivia => trivia::initialize(session, questions),
        GameType::Bingo => bingo::initialize(session),
    }
}

/// Event kinds that only the session host may drive.
pub fn is_authority_action(kind: &str) -> bool {
    matches!(kind, "start-game" | "advance-question" | "call-number")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[test]
    fn test_game_type_strings() {
        assert_eq!(GameType::Trivia.as_str(), "trivia");
        assert_eq!(GameType::Bingo.as_str(), "bingo");
    }

    #[test]
    fn test_initialize_dispatch() {
        let mut session = Session::new("a1b2c3d4".to_string(), None);
        initialize(&mut session, GameType::Bingo, Vec::new());
        assert_eq!(session.game_type, Some(GameType::Bingo));

        initialize(&mut session, GameType::Trivia, trivia::default_question_bank());
        assert_eq!(session.game_type, Some(GameType::Trivia));
    }

    #[test]
    fn test_authority_actions() {
        assert!(is_authority_action("start-game"));
        assert!(is_authority_action("advance-question"));
        assert!(is_authority_action("call-number"));

        assert!(!is_authority_action("join-session"));
        assert!(!is_authority_action("submit-answer"));
        assert!(!is_authority_action("mark-number"));
        assert!(!is_authority_action("claim-pattern"));
    }
}
