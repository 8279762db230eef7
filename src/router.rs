//! Real-time event router.
//!
//! Maps each typed inbound connection event to a manager or engine call,
//! then emits zero, one, or many outbound events: a private reply to the
//! sender, or a broadcast to every connection joined to the session's
//! channel. On every session-scoped event the sending connection is added
//! to that session's channel (idempotent), so later broadcasts reach it.
//!
//! # Concurrency
//!
//! Event handling is single-task and cooperative: each inbound event runs
//! to completion as one unit of application logic, but store calls await,
//! so a read-mutate-write bracket against a shared backend is not atomic.
//! Two events for the same session arriving on different connections in
//! the same window resolve last-write-wins.
//!
//! # Failure behavior
//!
//! A malformed payload never reaches a handler (it fails to deserialize
//! into [`ClientEvent`] at the transport boundary), an unknown session
//! yields a sender-only error notice, and a non-host attempting a
//! host-only action is ignored without any reply. Nothing here panics or
//! propagates an error; one bad event never stalls the loop for other
//! connections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::games::bingo;
use crate::games::trivia::{self, FinalScore, Question};
use crate::games::{self, GameState, GameType};
use crate::session::{ConnectionId, Player, SessionManager};
use crate::store::SessionStore;
use crate::validation::{validate_session_id, RawPlayer};

/// Inbound connection events. The closed set of shapes the transport may
/// deliver; anything else is rejected by deserialization before it
/// reaches business logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    CreateSession {
        #[serde(default)]
        game_type: Option<GameType>,
    },
    HostAttach(String),
    #[serde(rename_all = "camelCase")]
    JoinSession {
        session_id: String,
        player: RawPlayer,
    },
    #[serde(rename_all = "camelCase")]
    StartGame {
        session_id: String,
        game_type: GameType,
    },
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        session_id: String,
        answer: String,
    },
    AdvanceQuestion(String),
    #[serde(rename_all = "camelCase")]
    MarkNumber { session_id: String, number: u8 },
    CallNumber(String),
    /// `pattern` stays a free string so an unknown name flows to the
    /// engine's defined "not complete" result instead of a parse error.
    #[serde(rename_all = "camelCase")]
    ClaimPattern { session_id: String, pattern: String },
    Disconnect,
}

impl ClientEvent {
    /// Stable wire name of this event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateSession { .. } => "create-session",
            Self::HostAttach(_) => "host-attach",
            Self::JoinSession { .. } => "join-session",
            Self::StartGame { .. } => "start-game",
            Self::SubmitAnswer { .. } => "submit-answer",
            Self::AdvanceQuestion(_) => "advance-question",
            Self::MarkNumber { .. } => "mark-number",
            Self::CallNumber(_) => "call-number",
            Self::ClaimPattern { .. } => "claim-pattern",
            Self::Disconnect => "disconnect",
        }
    }

    /// Whether only the session host may drive this event.
    pub fn requires_host_authority(&self) -> bool {
        games::is_authority_action(self.kind())
    }
}

/// Outbound events. Wire names and payload fields are the stable
/// contract consumed by clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    SessionCreated { session_id: String },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player: Player,
        players: Vec<Player>,
    },
    #[serde(rename_all = "camelCase")]
    GameStarted {
        game_type: GameType,
        game_state: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    AnswerResult {
        player_id: ConnectionId,
        player_name: String,
        is_correct: bool,
        correct_answer: String,
    },
    #[serde(rename_all = "camelCase")]
    NextQuestion {
        question_index: usize,
        question: Question,
    },
    #[serde(rename_all = "camelCase")]
    GameEnded { players: Vec<FinalScore> },
    #[serde(rename_all = "camelCase")]
    NumberMarked { number: u8 },
    #[serde(rename_all = "camelCase")]
    NumberCalled {
        number: u8,
        called_numbers: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    BingoWinner {
        player_id: ConnectionId,
        player_name: String,
        pattern: String,
    },
    InvalidBingo,
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: ConnectionId,
        player_name: String,
        players: Vec<Player>,
    },
    Error { message: String },
}

/// Routes inbound events to the manager and engines, and fans resulting
/// events out to session channels.
pub struct EventRouter {
    manager: SessionManager,
    questions: Vec<Question>,
    /// Outbound sender per registered connection
    connections: HashMap<ConnectionId, UnboundedSender<ServerEvent>>,
    /// Broadcast channel membership, keyed by session ID
    channels: HashMap<String, HashSet<ConnectionId>>,
}

impl EventRouter {
    /// Router over the given store, with the built-in question bank.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_question_bank(store, trivia::default_question_bank())
    }

    /// Router with an injected trivia question bank.
    pub fn with_question_bank(store: Arc<dyn SessionStore>, questions: Vec<Question>) -> Self {
        Self {
            manager: SessionManager::new(store),
            questions,
            connections: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Register a connection's outbound sender. Called by the transport
    /// when a connection is accepted.
    pub fn register(&mut self, connection_id: &str, sender: UnboundedSender<ServerEvent>) {
        self.connections.insert(connection_id.to_string(), sender);
    }

    /// Connections currently joined to a session's channel.
    pub fn channel_members(&self, session_id: &str) -> usize {
        self.channels.get(session_id).map_or(0, |c| c.len())
    }

    /// Handle one inbound event from a connection.
    pub async fn handle(&mut self, connection_id: &str, event: ClientEvent) {
        tracing::debug!(connection_id, kind = event.kind(), "handling event");
        match event {
            ClientEvent::CreateSession { game_type } => {
                self.handle_create_session(connection_id, game_type).await;
            }
            ClientEvent::HostAttach(session_id) => {
                self.handle_host_attach(connection_id, &session_id).await;
            }
            ClientEvent::JoinSession { session_id, player } => {
                self.handle_join_session(connection_id, &session_id, &player)
                    .await;
            }
            ClientEvent::StartGame {
                session_id,
                game_type,
            } => {
                self.handle_start_game(connection_id, &session_id, game_type)
                    .await;
            }
            ClientEvent::SubmitAnswer { session_id, answer } => {
                self.handle_submit_answer(connection_id, &session_id, &answer)
                    .await;
            }
            ClientEvent::AdvanceQuestion(session_id) => {
                self.handle_advance_question(connection_id, &session_id)
                    .await;
            }
            ClientEvent::MarkNumber { session_id, number } => {
                self.handle_mark_number(connection_id, &session_id, number)
                    .await;
            }
            ClientEvent::CallNumber(session_id) => {
                self.handle_call_number(connection_id, &session_id).await;
            }
            ClientEvent::ClaimPattern {
                session_id,
                pattern,
            } => {
                self.handle_claim_pattern(connection_id, &session_id, &pattern)
                    .await;
            }
            ClientEvent::Disconnect => {
                self.handle_disconnect(connection_id).await;
            }
        }
    }

    async fn handle_create_session(&mut self, connection_id: &str, game_type: Option<GameType>) {
        let session = self.manager.create_session(game_type).await;
        self.send_to(
            connection_id,
            ServerEvent::SessionCreated {
                session_id: session.id,
            },
        );
    }

    async fn handle_host_attach(&mut self, connection_id: &str, session_id: &str) {
        if !validate_session_id(session_id) {
            self.notify_error(connection_id, "Invalid session ID");
            return;
        }
        // Missing session: silent, so a stale attach never surfaces in
        // the host UI.
        if self.manager.attach_host(session_id, connection_id).await {
            self.join_channel(session_id, connection_id);
        }
    }

    async fn handle_join_session(
        &mut self,
        connection_id: &str,
        session_id: &str,
        raw: &RawPlayer,
    ) {
        match self.manager.join_session(session_id, raw, connection_id).await {
            Ok((player, players)) => {
                self.join_channel(session_id, connection_id);
                self.broadcast(session_id, ServerEvent::PlayerJoined { player, players });
            }
            Err(e) => self.notify_error(connection_id, &e.to_string()),
        }
    }

    async fn handle_start_game(
        &mut self,
        connection_id: &str,
        session_id: &str,
        game_type: GameType,
    ) {
        let store = Arc::clone(self.manager.store());
        let Some(mut session) = store.get(session_id).await else {
            return;
        };
        if !session.is_host(connection_id) {
            tracing::debug!(connection_id, session_id, "start-game from non-host ignored");
            return;
        }

        games::initialize(&mut session, game_type, self.questions.clone());
        store.set(session_id, &session).await;

        self.join_channel(session_id, connection_id);
        self.broadcast(
            session_id,
            ServerEvent::GameStarted {
                game_type,
                game_state: session.game_state_json(),
            },
        );
    }

    async fn handle_submit_answer(&mut self, connection_id: &str, session_id: &str, answer: &str) {
        let store = Arc::clone(self.manager.store());
        let Some(mut session) = store.get(session_id).await else {
            return;
        };

        let Some(result) = trivia::submit_answer(&mut session, connection_id, answer) else {
            // No trivia game running, or sender is not a player.
            return;
        };
        let Some(player) = session.player(connection_id) else {
            return;
        };
        let player_name = player.name.clone();
        store.set(session_id, &session).await;

        self.join_channel(session_id, connection_id);
        self.broadcast(
            session_id,
            ServerEvent::AnswerResult {
                player_id: connection_id.to_string(),
                player_name,
                is_correct: result.is_correct,
                correct_answer: result.correct_answer,
            },
        );
    }

    async fn handle_advance_question(&mut self, connection_id: &str, session_id: &str) {
        let store = Arc::clone(self.manager.store());
        let Some(mut session) = store.get(session_id).await else {
            return;
        };
        if !session.is_host(connection_id) {
            tracing::debug!(
                connection_id,
                session_id,
                "advance-question from non-host ignored"
            );
            return;
        }
        if !matches!(session.game, Some(GameState::Trivia(_))) {
            return;
        }

        let result = trivia::advance(&mut session);
        store.set(session_id, &session).await;
        self.join_channel(session_id, connection_id);

        if result.is_game_over {
            self.broadcast(
                session_id,
                ServerEvent::GameEnded {
                    players: trivia::final_scores(&session),
                },
            );
            return;
        }

        if let Some(GameState::Trivia(state)) = &session.game {
            if let Some(question) = state.current_question() {
                self.broadcast(
                    session_id,
                    ServerEvent::NextQuestion {
                        question_index: state.current_question_index,
                        question: question.clone(),
                    },
                );
            }
        }
    }

    async fn handle_mark_number(&mut self, connection_id: &str, session_id: &str, number: u8) {
        let store = Arc::clone(self.manager.store());
        let Some(mut session) = store.get(session_id).await else {
            return;
        };
        if !matches!(session.game, Some(GameState::Bingo(_))) {
            return;
        }
        let has_card = session
            .player(connection_id)
            .is_some_and(|p| p.bingo_card.is_some());
        if !has_card {
            return;
        }

        bingo::mark_number(&mut session, connection_id, number);
        store.set(session_id, &session).await;

        self.join_channel(session_id, connection_id);
        self.send_to(connection_id, ServerEvent::NumberMarked { number });
    }

    async fn handle_call_number(&mut self, connection_id: &str, session_id: &str) {
        let store = Arc::clone(self.manager.store());
        let Some(mut session) = store.get(session_id).await else {
            return;
        };
        if !session.is_host(connection_id) {
            tracing::debug!(connection_id, session_id, "call-number from non-host ignored");
            return;
        }

        let result = bingo::call_number(&mut session);
        let Some(number) = result.number else {
            // All 75 called, or bingo is not the active game.
            return;
        };
        store.set(session_id, &session).await;

        self.join_channel(session_id, connection_id);
        self.broadcast(
            session_id,
            ServerEvent::NumberCalled {
                number,
                called_numbers: result.called_numbers,
            },
        );
    }

    async fn handle_claim_pattern(&mut self, connection_id: &str, session_id: &str, pattern: &str) {
        let store = Arc::clone(self.manager.store());
        let Some(session) = store.get(session_id).await else {
            return;
        };
        if !matches!(session.game, Some(GameState::Bingo(_))) {
            return;
        }
        let Some(player) = session.player(connection_id) else {
            return;
        };
        let Some(card) = &player.bingo_card else {
            return;
        };

        self.join_channel(session_id, connection_id);
        if bingo::check_pattern(card, pattern) {
            self.broadcast(
                session_id,
                ServerEvent::BingoWinner {
                    player_id: player.id.clone(),
                    player_name: player.name.clone(),
                    pattern: pattern.to_string(),
                },
            );
        } else {
            self.send_to(connection_id, ServerEvent::InvalidBingo);
        }
    }

    async fn handle_disconnect(&mut self, connection_id: &str) {
        for departure in self.manager.remove_connection(connection_id).await {
            self.broadcast(
                &departure.session_id,
                ServerEvent::PlayerLeft {
                    player_id: connection_id.to_string(),
                    player_name: departure.player.name,
                    players: departure.remaining,
                },
            );
        }

        for members in self.channels.values_mut() {
            members.remove(connection_id);
        }
        self.channels.retain(|_, members| !members.is_empty());
        self.connections.remove(connection_id);
    }

    /// Add a connection to a session's channel. Idempotent.
    fn join_channel(&mut self, session_id: &str, connection_id: &str) {
        self.channels
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    /// Send to one connection. A closed or unregistered connection is
    /// skipped; delivery is best-effort.
    fn send_to(&self, connection_id: &str, event: ServerEvent) {
        if let Some(sender) = self.connections.get(connection_id) {
            let _ = sender.send(event);
        }
    }

    /// Send to every connection in a session's channel.
    fn broadcast(&self, session_id: &str, event: ServerEvent) {
        let Some(members) = self.channels.get(session_id) else {
            return;
        };
        for connection_id in members {
            self.send_to(connection_id, event.clone());
        }
    }

    fn notify_error(&self, connection_id: &str, message: &str) {
        self.send_to(
            connection_id,
            ServerEvent::Error {
                message: message.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn router() -> EventRouter {
        EventRouter::new(Arc::new(MemoryStore::new()))
    }

    fn connect(router: &mut EventRouter, id: &str) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = unbounded_channel();
        router.register(id, tx);
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_client_event_wire_shapes() {
        let event: ClientEvent = serde_json::from_value(serde_json::json!({
            "event": "join-session",
            "data": {
                "sessionId": "a1b2c3d4",
                "player": { "name": "Ann" }
            }
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSession {
                session_id: "a1b2c3d4".to_string(),
                player: RawPlayer {
                    name: Some("Ann".to_string()),
                    avatar: None,
                },
            }
        );

        // Bare-string payloads
        let event: ClientEvent = serde_json::from_value(serde_json::json!({
            "event": "advance-question",
            "data": "a1b2c3d4"
        }))
        .unwrap();
        assert_eq!(event, ClientEvent::AdvanceQuestion("a1b2c3d4".to_string()));

        // Unknown kinds are rejected at the boundary
        let result: Result<ClientEvent, _> = serde_json::from_value(serde_json::json!({
            "event": "drop-table",
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_wire_shapes() {
        let event = ServerEvent::SessionCreated {
            session_id: "a1b2c3d4".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "event": "session-created",
                "data": { "sessionId": "a1b2c3d4" }
            })
        );

        let event = ServerEvent::NumberCalled {
            number: 42,
            called_numbers: vec![7, 42],
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({
                "event": "number-called",
                "data": { "number": 42, "calledNumbers": [7, 42] }
            })
        );
    }

    #[test]
    fn test_authority_classification() {
        let start = ClientEvent::StartGame {
            session_id: "a1b2c3d4".to_string(),
            game_type: GameType::Trivia,
        };
        assert!(start.requires_host_authority());
        assert!(ClientEvent::AdvanceQuestion("a1b2c3d4".into()).requires_host_authority());
        assert!(ClientEvent::CallNumber("a1b2c3d4".into()).requires_host_authority());
        assert!(!ClientEvent::Disconnect.requires_host_authority());
    }

    #[tokio::test]
    async fn test_create_session_replies_to_sender_only() {
        let mut router = router();
        let mut host = connect(&mut router, "host");
        let mut other = connect(&mut router, "other");

        router
            .handle("host", ClientEvent::CreateSession { game_type: None })
            .await;

        let events = drain(&mut host);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ServerEvent::SessionCreated { .. }));
        assert!(drain(&mut other).is_empty());
    }

    #[tokio::test]
    async fn test_join_unknown_session_notifies_sender() {
        let mut router = router();
        let mut rx = connect(&mut router, "c1");

        router
            .handle(
                "c1",
                ClientEvent::JoinSession {
                    session_id: "deadbeef".to_string(),
                    player: RawPlayer {
                        name: Some("Ann".to_string()),
                        avatar: None,
                    },
                },
            )
            .await;

        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::Error {
                message: "Session not found".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_host_attach_invalid_id_notifies_sender() {
        let mut router = router();
        let mut rx = connect(&mut router, "host");

        router
            .handle("host", ClientEvent::HostAttach("NOPE".to_string()))
            .await;

        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::Error {
                message: "Invalid session ID".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_host_attach_missing_session_is_silent() {
        let mut router = router();
        let mut rx = connect(&mut router, "host");

        router
            .handle("host", ClientEvent::HostAttach("deadbeef".to_string()))
            .await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(router.channel_members("deadbeef"), 0);
    }

    #[tokio::test]
    async fn test_join_broadcasts_to_channel() {
        let mut router = router();
        let mut host = connect(&mut router, "host");
        let mut ann = connect(&mut router, "ann");

        let session = router.manager().create_session(None).await;
        router
            .handle("host", ClientEvent::HostAttach(session.id.clone()))
            .await;
        router
            .handle(
                "ann",
                ClientEvent::JoinSession {
                    session_id: session.id.clone(),
                    player: RawPlayer {
                        name: Some("Ann".to_string()),
                        avatar: None,
                    },
                },
            )
            .await;

        // Host and the joiner both see the join.
        let host_events = drain(&mut host);
        let ann_events = drain(&mut ann);
        assert_eq!(host_events, ann_events);
        assert!(matches!(host_events[0], ServerEvent::PlayerJoined { .. }));
        assert_eq!(router.channel_members(&session.id), 2);
    }

    #[tokio::test]
    async fn test_mark_number_replies_to_sender_only() {
        let mut router = router();
        let mut host = connect(&mut router, "host");
        let mut ann = connect(&mut router, "ann");

        let session = router.manager().create_session(None).await;
        router
            .handle("host", ClientEvent::HostAttach(session.id.clone()))
            .await;
        router
            .handle(
                "ann",
                ClientEvent::JoinSession {
                    session_id: session.id.clone(),
                    player: RawPlayer {
                        name: Some("Ann".to_string()),
                        avatar: None,
                    },
                },
            )
            .await;
        router
            .handle(
                "host",
                ClientEvent::StartGame {
                    session_id: session.id.clone(),
                    game_type: GameType::Bingo,
                },
            )
            .await;
        drain(&mut host);
        drain(&mut ann);

        let stored = router.manager().store().get(&session.id).await.unwrap();
        let number = match stored.players[0].bingo_card.as_ref().unwrap()[0][0].value {
            crate::games::bingo::CellValue::Number(n) => n,
            _ => unreachable!(),
        };

        router
            .handle(
                "ann",
                ClientEvent::MarkNumber {
                    session_id: session.id.clone(),
                    number,
                },
            )
            .await;

        assert_eq!(drain(&mut ann), vec![ServerEvent::NumberMarked { number }]);
        assert!(drain(&mut host).is_empty());
    }
}
