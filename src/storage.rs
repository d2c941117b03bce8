//! Local identity bookkeeping: anonymous user id, voted polls, admin flag.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::warn;
use uuid::Uuid;

const USER_ID_KEY: &str = "poll_user_id";
const VOTED_POLLS_KEY: &str = "votedPolls";
const ADMIN_SESSION_KEY: &str = "isAdminLoggedIn";

/// String key-value storage. Writes never fail from the caller's side.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Survives browser restarts.
    Local,
    /// Cleared when the tab closes.
    Session,
}

/// Browser `localStorage`/`sessionStorage`.
///
/// Fails open: when the storage area is missing (server render, privacy
/// mode) or a write throws, values live in memory for the page lifetime.
#[derive(Debug, Clone)]
pub struct BrowserStore {
    kind: StorageKind,
    fallback: MemoryStore,
}

impl BrowserStore {
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            fallback: MemoryStore::default(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn area(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let area = match self.kind {
            StorageKind::Local => window.local_storage(),
            StorageKind::Session => window.session_storage(),
        };
        match area {
            Ok(area) => area,
            Err(e) => {
                warn!("{:?} storage unavailable: {e:?}", self.kind);
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn area(&self) -> Option<web_sys::Storage> {
        None
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        self.area()
            .and_then(|area| area.get_item(key).ok().flatten())
            .or_else(|| self.fallback.get(key))
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(area) = self.area() {
            match area.set_item(key, value) {
                Ok(()) => return,
                Err(e) => warn!("Failed to persist {key}: {e:?}"),
            }
        }
        self.fallback.set(key, value);
    }

    fn remove(&self, key: &str) {
        if let Some(area) = self.area() {
            if let Err(e) = area.remove_item(key) {
                warn!("Failed to remove {key}: {e:?}");
            }
        }
        self.fallback.remove(key);
    }
}

/// Identity entries over a durable and a tab-scoped store.
pub struct IdentityStore<D, S> {
    durable: D,
    session: S,
}

impl<D: KeyValueStore, S: KeyValueStore> IdentityStore<D, S> {
    pub fn new(durable: D, session: S) -> Self {
        Self { durable, session }
    }

    /// Generated on first call, then reused.
    pub fn get_or_create_user_id(&self) -> String {
        if let Some(id) = self.durable.get(USER_ID_KEY).filter(|id| !id.is_empty()) {
            return id;
        }
        let id = Uuid::new_v4().to_string();
        self.durable.set(USER_ID_KEY, &id);
        id
    }

    pub fn has_voted(&self, poll_id: &str) -> bool {
        self.voted_polls().get(poll_id).copied().unwrap_or(false)
    }

    pub fn mark_voted(&self, poll_id: &str) {
        let mut voted = self.voted_polls();
        if voted.insert(poll_id.to_string(), true) == Some(true) {
            return;
        }
        match serde_json::to_string(&voted) {
            Ok(doc) => self.durable.set(VOTED_POLLS_KEY, &doc),
            Err(e) => warn!("Failed to encode voted polls: {e}"),
        }
    }

    pub fn is_admin_session(&self) -> bool {
        self.session.get(ADMIN_SESSION_KEY).as_deref() == Some("true")
    }

    pub fn set_admin_session(&self, active: bool) {
        if active {
            self.session.set(ADMIN_SESSION_KEY, "true");
        } else {
            self.session.remove(ADMIN_SESSION_KEY);
        }
    }

    // A corrupted document reads as "nothing voted".
    fn voted_polls(&self) -> HashMap<String, bool> {
        let Some(doc) = self.durable.get(VOTED_POLLS_KEY) else {
            return HashMap::new();
        };
        serde_json::from_str(&doc).unwrap_or_else(|e| {
            warn!("Ignoring unreadable {VOTED_POLLS_KEY}: {e}");
            HashMap::new()
        })
    }
}
