//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::session::Session;
use crate::store::SessionStore;

/// Local map-backed store. State lives for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: &str) -> Option<Session> {
        self.data.lock().get(id).cloned()
    }

    async fn set(&self, id: &str, session: &Session) -> bool {
        self.data.lock().insert(id.to_string(), session.clone());
        true
    }

    async fn delete(&self, id: &str) -> bool {
        self.data.lock().remove(id).is_some()
    }

    async fn has(&self, id: &str) -> bool {
        self.data.lock().contains_key(id)
    }

    async fn keys(&self) -> Vec<String> {
        self.data.lock().keys().cloned().collect()
    }

    async fn for_each(&self, f: &mut (dyn for<'a> FnMut(&'a Session, &'a str) + Send)) {
        for (id, session) in self.data.lock().iter() {
            f(session, id);
        }
    }
}
