//! Session and player state.
//!
//! A session (lobby) is one game instance: a roster of players, an
//! optional host connection with authority to drive the game, and the
//! active game's state. The roster is the sole source of truth for
//! membership; there is no separate index.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::games::{GameState, GameType};
use crate::store::SessionStore;
use crate::validation::{
    validate_player, validate_session_id, PlayerValidationError, RawPlayer, SESSION_ID_LEN,
};

/// Transport-layer connection identifier. Doubles as the player identity
/// for the lifetime of a session.
pub type ConnectionId = String;

/// A player in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Connection ID of the player
    pub id: ConnectionId,

    /// Sanitized display name
    pub name: String,

    /// Validated image data URI, if any
    pub avatar: Option<String>,

    /// When the player joined
    pub joined_at: chrono::DateTime<chrono::Utc>,

    /// Trivia score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,

    /// Bingo card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bingo_card: Option<crate::games::bingo::BingoCard>,
}

impl Player {
    pub fn new(id: ConnectionId, name: String, avatar: Option<String>) -> Self {
        Self {
            id,
            name,
            avatar,
            joined_at: chrono::Utc::now(),
            score: None,
            bingo_card: None,
        }
    }
}

/// Session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique 8-hex-digit session ID
    pub id: String,

    /// Players in join order
    pub players: Vec<Player>,

    /// When the session was created
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Connection with authority over game progression, once attached
    pub host_connection_id: Option<ConnectionId>,

    /// Declared game type (set at creation or game start)
    pub game_type: Option<GameType>,

    /// Active game state, tagged by game type
    pub game: Option<GameState>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: String, game_type: Option<GameType>) -> Self {
        Self {
            id,
            players: Vec::new(),
            created_at: chrono::Utc::now(),
            host_connection_id: None,
            game_type,
            game: None,
        }
    }

    /// Append a player to the roster.
    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Remove a player by connection ID, preserving the order of the rest.
    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    /// Get a player by connection ID.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Get a mutable player by connection ID.
    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Check if a connection is a player in this session.
    pub fn has_player(&self, id: &str) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Check if a connection holds host authority for this session.
    pub fn is_host(&self, connection_id: &str) -> bool {
        self.host_connection_id.as_deref() == Some(connection_id)
    }

    /// The bare game state object sent to clients, or null.
    pub fn game_state_json(&self) -> serde_json::Value {
        self.game
            .as_ref()
            .map(|g| g.to_json())
            .unwrap_or(serde_json::Value::Null)
    }

    /// The projection served by the external HTTP lookup route.
    pub fn to_summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "players": self.players,
            "playerCount": self.player_count(),
            "gameType": self.game_type.map(|t| t.as_str()),
            "gameState": self.game_state_json(),
        })
    }
}

/// Why a join was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    InvalidSessionId,
    SessionNotFound,
    InvalidPlayer(PlayerValidationError),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSessionId => write!(f, "Invalid session ID"),
            Self::SessionNotFound => write!(f, "Session not found"),
            Self::InvalidPlayer(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for JoinError {}

/// A player removed from a session by a connection loss.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub session_id: String,
    pub player: Player,
    /// Roster after the removal
    pub remaining: Vec<Player>,
}

/// Generate an 8-hex-digit session ID.
///
/// Collision-resistant at party scale rather than formally unique; the
/// manager re-rolls on the off chance an ID is already live.
pub fn generate_session_id() -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

/// Session lifecycle and membership, over an injected store.
///
/// All mutation goes through a get/mutate/set bracket against the store;
/// the manager never retains a session reference across calls.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Create and persist a new empty session.
    pub async fn create_session(&self, game_type: Option<GameType>) -> Session {
        let id = loop {
            let candidate = generate_session_id();
            if !self.store.has(&candidate).await {
                break candidate;
            }
        };

        let session = Session::new(id.clone(), game_type);
        self.store.set(&id, &session).await;
        session
    }

    /// Set the host connection iff the session exists, reporting whether
    /// it did.
    ///
    /// A stale or garbled host-attach silently no-ops so an
    /// already-connected host UI never sees a spurious error.
    pub async fn attach_host(&self, session_id: &str, connection_id: &str) -> bool {
        let Some(mut session) = self.store.get(session_id).await else {
            return false;
        };
        session.host_connection_id = Some(connection_id.to_string());
        self.store.set(session_id, &session).await;
        true
    }

    /// Validate and join a player into a session.
    ///
    /// Checks id format, existence, and player payload in that order,
    /// short-circuiting on the first failure. On success returns the new
    /// player and the roster after the join.
    pub async fn join_session(
        &self,
        session_id: &str,
        raw: &RawPlayer,
        connection_id: &str,
    ) -> Result<(Player, Vec<Player>), JoinError> {
        if !validate_session_id(session_id) {
            return Err(JoinError::InvalidSessionId);
        }

        let Some(mut session) = self.store.get(session_id).await else {
            return Err(JoinError::SessionNotFound);
        };

        let sanitized = validate_player(raw).map_err(JoinError::InvalidPlayer)?;

        let player = Player::new(connection_id.to_string(), sanitized.name, sanitized.avatar);
        session.add_player(player.clone());
        self.store.set(session_id, &session).await;

        Ok((player, session.players))
    }

    /// Remove a departed connection from every session containing it.
    ///
    /// A connection present in no session is a normal case and yields an
    /// empty list.
    pub async fn remove_connection(&self, connection_id: &str) -> Vec<Departure> {
        let mut affected = Vec::new();
        self.store
            .for_each(&mut |session, id| {
                if session.has_player(connection_id) {
                    affected.push(id.to_string());
                }
            })
            .await;

        let mut departures = Vec::new();
        for session_id in affected {
            let Some(mut session) = self.store.get(&session_id).await else {
                continue;
            };
            let Some(player) = session.remove_player(connection_id) else {
                continue;
            };
            self.store.set(&session_id, &session).await;
            departures.push(Departure {
                session_id,
                player,
                remaining: session.players,
            });
        }
        departures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::validation::validate_session_id;
    use pretty_assertions::assert_eq;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryStore::new()))
    }

    fn raw(name: &str) -> RawPlayer {
        RawPlayer {
            name: Some(name.to_string()),
            avatar: None,
        }
    }

    #[test]
    fn test_generated_ids_are_valid() {
        for _ in 0..100 {
            assert!(validate_session_id(&generate_session_id()));
        }
    }

    #[test]
    fn test_session_roster() {
        let mut session = Session::new("a1b2c3d4".to_string(), None);
        session.add_player(Player::new("c1".to_string(), "Ann".to_string(), None));
        session.add_player(Player::new("c2".to_string(), "Bo".to_string(), None));

        assert_eq!(session.player_count(), 2);
        assert!(session.has_player("c1"));
        assert_eq!(session.player("c2").unwrap().name, "Bo");

        let removed = session.remove_player("c1").unwrap();
        assert_eq!(removed.name, "Ann");
        assert_eq!(session.player_count(), 1);
        assert!(!session.has_player("c1"));
    }

    #[test]
    fn test_is_host() {
        let mut session = Session::new("a1b2c3d4".to_string(), None);
        assert!(!session.is_host("c1"));

        session.host_connection_id = Some("c1".to_string());
        assert!(session.is_host("c1"));
        assert!(!session.is_host("c2"));
    }

    #[test]
    fn test_summary_json() {
        let mut session = Session::new("a1b2c3d4".to_string(), None);
        session.add_player(Player::new("c1".to_string(), "Ann".to_string(), None));

        let summary = session.to_summary_json();
        assert_eq!(summary["id"], "a1b2c3d4");
        assert_eq!(summary["playerCount"], 1);
        assert_eq!(summary["gameType"], serde_json::Value::Null);
        assert_eq!(summary["gameState"], serde_json::Value::Null);
        assert_eq!(summary["players"][0]["name"], "Ann");
    }

    #[tokio::test]
    async fn test_create_session_persists_empty_session() {
        let manager = manager();
        let session = manager.create_session(Some(GameType::Trivia)).await;

        assert!(validate_session_id(&session.id));
        assert!(session.players.is_empty());
        assert_eq!(session.host_connection_id, None);
        assert_eq!(session.game_type, Some(GameType::Trivia));
        assert_eq!(session.game, None);

        let stored = manager.store().get(&session.id).await.unwrap();
        assert_eq!(stored, session);
    }

    #[tokio::test]
    async fn test_attach_host_sets_authority() {
        let manager = manager();
        let session = manager.create_session(None).await;

        manager.attach_host(&session.id, "host-conn").await;

        let stored = manager.store().get(&session.id).await.unwrap();
        assert_eq!(stored.host_connection_id, Some("host-conn".to_string()));
    }

    #[tokio::test]
    async fn test_attach_host_missing_session_is_noop() {
        let manager = manager();
        manager.attach_host("deadbeef", "host-conn").await;
        assert!(!manager.store().has("deadbeef").await);
    }

    #[tokio::test]
    async fn test_join_validation_order() {
        let manager = manager();

        // Bad format short-circuits before existence
        assert_eq!(
            manager.join_session("NOPE", &raw("Ann"), "c1").await,
            Err(JoinError::InvalidSessionId)
        );

        // Well-formed but unknown
        assert_eq!(
            manager.join_session("deadbeef", &raw("Ann"), "c1").await,
            Err(JoinError::SessionNotFound)
        );

        // Known session, bad player
        let session = manager.create_session(None).await;
        let result = manager
            .join_session(&session.id, &RawPlayer::default(), "c1")
            .await;
        assert!(matches!(result, Err(JoinError::InvalidPlayer(_))));
    }

    #[tokio::test]
    async fn test_join_appends_and_persists() {
        let manager = manager();
        let session = manager.create_session(None).await;

        let (ann, roster) = manager
            .join_session(&session.id, &raw("  Ann "), "c1")
            .await
            .unwrap();
        assert_eq!(ann.name, "Ann");
        assert_eq!(roster.len(), 1);

        let (_, roster) = manager
            .join_session(&session.id, &raw("Bo"), "c2")
            .await
            .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].name, "Ann");
        assert_eq!(roster[1].name, "Bo");

        let stored = manager.store().get(&session.id).await.unwrap();
        assert_eq!(stored.player_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_connection_across_sessions() {
        let manager = manager();
        let a = manager.create_session(None).await;
        let b = manager.create_session(None).await;

        manager.join_session(&a.id, &raw("Ann"), "c1").await.unwrap();
        manager.join_session(&a.id, &raw("Bo"), "c2").await.unwrap();
        manager.join_session(&b.id, &raw("Ann"), "c1").await.unwrap();

        let departures = manager.remove_connection("c1").await;
        assert_eq!(departures.len(), 2);
        for departure in &departures {
            assert_eq!(departure.player.id, "c1");
        }

        let stored_a = manager.store().get(&a.id).await.unwrap();
        assert_eq!(stored_a.player_count(), 1);
        assert_eq!(stored_a.players[0].name, "Bo");

        let stored_b = manager.store().get(&b.id).await.unwrap();
        assert_eq!(stored_b.player_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_unknown_connection_is_normal() {
        let manager = manager();
        manager.create_session(None).await;
        assert!(manager.remove_connection("ghost").await.is_empty());
    }
}
