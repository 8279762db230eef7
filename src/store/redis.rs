//! Redis-backed session store.
//!
//! Each session is one JSON text value under its session-id key, no
//! secondary indices. Every operation degrades on failure: reads that
//! hit a transport or decode error report the value as absent, writes
//! report `false`, and the error is logged rather than raised.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::session::Session;
use crate::store::SessionStore;

/// Bound on establishing the initial connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on each command; a slow backend degrades to absent/failed
/// instead of stalling the event loop.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared store over a Redis endpoint.
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the given Redis URL.
    ///
    /// Errors here are for the constructor caller only
    /// ([`create_store`](crate::store::create_store) falls back to the
    /// in-memory backend); once connected, no method raises.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client
            .get_multiplexed_async_connection_with_timeouts(RESPONSE_TIMEOUT, CONNECT_TIMEOUT)
            .await?;
        Ok(Self { conn })
    }

    fn encode(session: &Session) -> Option<String> {
        match serde_json::to_string(session) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "session encode failed");
                None
            }
        }
    }

    fn decode(id: &str, text: &str) -> Option<Session> {
        match serde_json::from_str(text) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "session decode failed, treating as absent");
                None
            }
        }
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, id: &str) -> Option<Session> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(id).await {
            Ok(Some(text)) => Self::decode(id, &text),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "redis get failed");
                None
            }
        }
    }

    async fn set(&self, id: &str, session: &Session) -> bool {
        let Some(text) = Self::encode(session) else {
            return false;
        };
        let mut conn = self.conn.clone();
        match conn.set::<_, _, ()>(id, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "redis set failed");
                false
            }
        }
    }

    async fn delete(&self, id: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.del::<_, i64>(id).await {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "redis del failed");
                false
            }
        }
    }

    async fn has(&self, id: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.exists::<_, bool>(id).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "redis exists failed");
                false
            }
        }
    }

    async fn keys(&self) -> Vec<String> {
        let mut conn = self.conn.clone();
        match conn.keys::<_, Vec<String>>("*").await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "redis keys failed");
                Vec::new()
            }
        }
    }

    async fn for_each(&self, f: &mut (dyn for<'a> FnMut(&'a Session, &'a str) + Send)) {
        for id in self.keys().await {
            if let Some(session) = self.get(&id).await {
                f(&session, &id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{bingo, trivia};
    use crate::session::Player;
    use pretty_assertions::assert_eq;

    // The transport side needs a live server; the encoding that travels
    // over it is covered here.

    fn full_session(game: &str) -> Session {
        let mut session = Session::new("a1b2c3d4".to_string(), None);
        session.host_connection_id = Some("host".to_string());
        session.add_player(Player::new(
            "c1".to_string(),
            "Ann".to_string(),
            Some("data:image/png;base64,AAAA".to_string()),
        ));
        session.add_player(Player::new("c2".to_string(), "Bo".to_string(), None));
        match game {
            "trivia" => trivia::initialize(&mut session, trivia::default_question_bank()),
            "bingo" => bingo::initialize(&mut session),
            _ => {}
        }
        session
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for game in ["none", "trivia", "bingo"] {
            let session = full_session(game);
            let text = RedisStore::encode(&session).unwrap();
            let back = RedisStore::decode(&session.id, &text).unwrap();
            assert_eq!(back, session);
        }
    }

    #[test]
    fn test_encoding_is_self_describing() {
        let session = full_session("trivia");
        let text = RedisStore::encode(&session).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["id"], "a1b2c3d4");
        assert_eq!(value["gameType"], "trivia");
        assert_eq!(value["players"][0]["name"], "Ann");
        assert!(value["game"]["trivia"]["questions"].is_array());
    }

    #[test]
    fn test_decode_garbage_is_absent() {
        assert_eq!(RedisStore::decode("a1b2c3d4", "not json"), None);
        assert_eq!(RedisStore::decode("a1b2c3d4", "{\"id\":42}"), None);
    }
}
