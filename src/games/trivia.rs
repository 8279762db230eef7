//! Trivia game engine.
//!
//! A fixed or injected question bank, one current question at a time,
//! advanced by the host. Scores live on the session's players.

use serde::{Deserialize, Serialize};

use crate::games::{GameState, GameType};
use crate::session::Session;

/// A single trivia question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// Trivia slice of session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriviaState {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
}

impl TriviaState {
    /// The question currently being asked, if the game is still running.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Game over is defined as the index having moved past the last question.
    pub fn is_game_over(&self) -> bool {
        self.current_question_index >= self.questions.len()
    }
}

/// Result of an answer submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub is_correct: bool,
    pub correct_answer: String,
}

/// Result of advancing to the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    pub has_next: bool,
    pub is_game_over: bool,
}

/// A player's final standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub name: String,
    pub score: i32,
}

/// The built-in question bank, used when the embedding server does not
/// inject its own.
pub fn default_question_bank() -> Vec<Question> {
    fn q(text: &str, options: [&str; 4], correct: &str) -> Question {
        Question {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
        }
    }

    vec![
        q(
            "What is the capital of France?",
            ["London", "Berlin", "Paris", "Madrid"],
            "Paris",
        ),
        q("What is 2 + 2?", ["3", "4", "5", "6"], "4"),
        q(
            "Which planet is known as the Red Planet?",
            ["Venus", "Mars", "Jupiter", "Saturn"],
            "Mars",
        ),
        q(
            "What is the largest ocean on Earth?",
            ["Atlantic", "Indian", "Arctic", "Pacific"],
            "Pacific",
        ),
        q(
            "Who painted the Mona Lisa?",
            ["Van Gogh", "Picasso", "Leonardo da Vinci", "Michelangelo"],
            "Leonardo da Vinci",
        ),
    ]
}

/// Initialize a trivia game on the session.
///
/// Sets the question index to zero and resets every player's score.
pub fn initialize(session: &mut Session, questions: Vec<Question>) {
    session.game_type = Some(GameType::Trivia);
    session.game = Some(GameState::Trivia(TriviaState {
        questions,
        current_question_index: 0,
    }));

    for player in &mut session.players {
        player.score = Some(0);
    }
}

/// Submit an answer for the current question.
///
/// Compares by exact string equality and increments the submitting
/// player's score on a match. Returns `None` when no trivia game is
/// active, the player is not in the session, or the game is already
/// over; the caller treats that as a silent no-op.
pub fn submit_answer(session: &mut Session, player_id: &str, answer: &str) -> Option<AnswerResult> {
    let correct_answer = match &session.game {
        Some(GameState::Trivia(state)) => state.current_question()?.correct_answer.clone(),
        _ => return None,
    };

    let player = session.player_mut(player_id)?;
    let is_correct = answer == correct_answer;
    if is_correct {
        player.score = Some(player.score.unwrap_or(0) + 1);
    }

    Some(AnswerResult {
        is_correct,
        correct_answer,
    })
}

/// Move to the next question. Host-authority action.
pub fn advance(session: &mut Session) -> AdvanceResult {
    let state = match &mut session.game {
        Some(GameState::Trivia(state)) => state,
        _ => {
            return AdvanceResult {
                has_next: false,
                is_game_over: true,
            }
        }
    };

    state.current_question_index += 1;
    let is_game_over = state.is_game_over();

    AdvanceResult {
        has_next: !is_game_over,
        is_game_over,
    }
}

/// Final scores, highest first. The sort is stable, so ties keep the
/// players' join order.
pub fn final_scores(session: &Session) -> Vec<FinalScore> {
    let mut scores: Vec<FinalScore> = session
        .players
        .iter()
        .map(|p| FinalScore {
            name: p.name.clone(),
            score: p.score.unwrap_or(0),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}
