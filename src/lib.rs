//! Partycast State Library
//!
//! This crate provides session, game, and broadcast state management for
//! Partycast party lobbies.
//!
//! # Overview
//!
//! One device (the host) creates a session and displays it as a scannable
//! join target; other devices join and play turn-synchronized party games
//! with state fanned out to every participant. This crate is the core of
//! that server:
//!
//! - **Validation** - Pure checks for session-id shape, player names, and
//!   avatar payloads.
//! - **Session Store** - Async key-value persistence for sessions with
//!   interchangeable in-memory and Redis backends.
//! - **Game Engines** - Trivia and 75-ball bingo state machines, each
//!   owning its slice of session state.
//! - **Session Manager** - Session lifecycle, membership, and host
//!   authority checks.
//! - **Event Router** - Maps typed inbound connection events to manager
//!   and engine calls, then fans resulting events out to every connection
//!   subscribed to the session's channel.
//!
//! # Design Principles
//!
//! 1. **Typed event boundary** - Inbound events are a closed enum; a
//!    payload that does not deserialize never reaches business logic.
//!
//! 2. **Host authority is silent** - Game-progression events from a
//!    non-host connection are ignored without a reply, so probing clients
//!    learn nothing about who the host is.
//!
//! 3. **Storage degrades, never raises** - A backend or serialization
//!    failure is logged and treated as "value absent"; no inbound event
//!    can take down the event loop.
//!
//! 4. **No networking** - This crate is pure state and routing logic; the
//!    WebSocket transport, HTTP routes, and QR rendering live outside.
//!
//! # Example
//!
//! ```rust,ignore
//! use partycast_state::{
//!     config::StoreConfig,
//!     router::{ClientEvent, EventRouter},
//!     store::create_store,
//! };
//!
//! let store = create_store(&StoreConfig::default()).await;
//! let mut router = EventRouter::new(store);
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! router.register("conn-1", tx);
//! router.handle("conn-1", ClientEvent::CreateSession { game_type: None }).await;
//! ```

pub mod config;
pub mod games;
pub mod router;
pub mod session;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::{StoreBackend, StoreConfig};
pub use games::{bingo::BingoState, trivia::TriviaState, GameState, GameType};
pub use router::{ClientEvent, EventRouter, ServerEvent};
pub use session::{ConnectionId, Departure, JoinError, Player, Session, SessionManager};
pub use store::{create_store, MemoryStore, RedisStore, SessionStore};
pub use validation::{RawPlayer, SanitizedPlayer};
