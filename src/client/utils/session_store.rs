use crate::client::config::{ClientConfig, SessionStoreKind};
use crate::client::models::session::Session;
use keyring::Entry;
use log::{debug, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

const SERVICE: &str = "bobple_app";
const USER: &str = "bobple_session";

/// Durable backing for the session. Every implementation stores the whole
/// session as one JSON document.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

/// OS keyring, with an opt-in file fallback (`KEYRING_FALLBACK=true`).
pub struct KeyringStore {
    fallback: Option<FileStore>,
}

impl KeyringStore {
    pub fn new(fallback_path: PathBuf) -> Self {
        let allow_fallback = std::env::var("KEYRING_FALLBACK").unwrap_or_default() == "true";
        Self { fallback: allow_fallback.then(|| FileStore::new(fallback_path)) }
    }
}

impl SessionStore for KeyringStore {
    fn load(&self) -> Option<Session> {
        let entry = Entry::new(SERVICE, USER);
        match entry.get_password() {
            Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).ok(),
            Ok(_) => None,
            Err(_) => self.fallback.as_ref().and_then(|f| f.load()),
        }
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        let raw = serde_json::to_string(session)?;
        let entry = Entry::new(SERVICE, USER);
        match entry.set_password(&raw) {
            Ok(()) => Ok(()),
            Err(e) => match &self.fallback {
                Some(file) => {
                    warn!("[SESSION_STORE] Keyring unavailable ({}), persisting session to {}", e, file.path().display());
                    file.save(session)
                }
                None => Err(anyhow::anyhow!("keyring unavailable and file fallback disabled: {}", e)),
            },
        }
    }

    fn clear(&self) -> anyhow::Result<()> {
        let entry = Entry::new(SERVICE, USER);
        let _ = entry.delete_password();
        if let Some(file) = &self.fallback {
            file.clear()?;
        }
        Ok(())
    }
}

/// Session as a JSON file on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("[SESSION_STORE] Ignoring unreadable session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Option<Session> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *slot = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *slot = None;
        Ok(())
    }
}

pub fn open_store(config: &ClientConfig) -> Arc<dyn SessionStore> {
    match config.session_store {
        SessionStoreKind::Keyring => Arc::new(KeyringStore::new(config.session_file.clone())),
        SessionStoreKind::File => Arc::new(FileStore::new(config.session_file.clone())),
        SessionStoreKind::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Shared, explicitly passed session. Cloning shares the same state.
///
/// The generation counter increases on every change so that callers can
/// tell whether the session moved on while they were waiting.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<RwLock<Session>>,
    generation: Arc<AtomicU64>,
    store: Arc<dyn SessionStore>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let initial = store.load().unwrap_or_default();
        debug!("[SESSION_STORE] Loaded session (logged_in={})", initial.logged_in);
        Self {
            state: Arc::new(RwLock::new(initial)),
            generation: Arc::new(AtomicU64::new(0)),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn snapshot(&self) -> Session {
        match self.state.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token.filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<Value> {
        self.snapshot().user
    }

    pub fn user_id(&self) -> Option<i64> {
        self.snapshot().user_id()
    }

    pub fn is_logged_in(&self) -> bool {
        self.snapshot().logged_in
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Applies `change`, persists the result and bumps the generation.
    pub fn update<F>(&self, change: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Session),
    {
        let updated = {
            let mut guard = match self.state.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            change(&mut guard);
            guard.clone()
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.save(&updated)
    }

    pub fn set_token(&self, token: String) -> anyhow::Result<()> {
        self.update(|s| s.token = Some(token))
    }

    /// Stores the user and raises the login flag.
    pub fn set_user(&self, user: Value) -> anyhow::Result<()> {
        self.update(|s| {
            s.user = Some(user);
            s.logged_in = true;
        })
    }

    pub fn mark_logged_in(&self) -> anyhow::Result<()> {
        self.update(|s| s.logged_in = true)
    }

    /// Drops token, user and login flag, in memory and in the store.
    pub fn clear(&self) -> anyhow::Result<()> {
        {
            let mut guard = match self.state.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = Session::default();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.clear()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.snapshot();
        f.debug_struct("SessionHandle")
            .field("has_token", &s.token.is_some())
            .field("logged_in", &s.logged_in)
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileStore::new(&path);
        assert_eq!(store.path(), path.as_path());
        assert!(store.load().is_none());

        let session = Session { token: Some("abc".into()), user: Some(json!({ "id": 1 })), logged_in: true };
        store.save(&session).unwrap();
        assert_eq!(store.load(), Some(session));

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn handle_persists_updates_and_bumps_generation() {
        let store = Arc::new(MemoryStore::new());
        let handle = SessionHandle::new(store.clone());
        let before = handle.generation();

        handle.set_token("tok".into()).unwrap();
        handle.set_user(json!({ "id": 3 })).unwrap();
        assert!(handle.generation() > before);
        assert!(handle.is_logged_in());
        assert_eq!(store.load().and_then(|s| s.token).as_deref(), Some("tok"));

        handle.clear().unwrap();
        assert!(handle.snapshot().is_empty());
        assert!(store.load().is_none());
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let handle = SessionHandle::in_memory();
        handle.set_token(String::new()).unwrap();
        assert_eq!(handle.token(), None);
    }
}
