// common/src/store.rs
//! Key-value persistence for wallets, sessions and profiles.
//!
//! Records are JSON strings under well-known keys (see [`keys`]). Every
//! mutation goes through [`KeyValueStore::write_batch`], which either
//! applies all of its operations or none of them.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Result, VanguardError};

/// Logical storage keys shared by every context
pub mod keys {
    pub const WALLET_COLLECTION: &str = "wallet-collection";
    pub const CURRENT_USER_SESSION: &str = "current-user-session";
    pub const CURRENT_WALLET_POINTER: &str = "current-wallet-pointer";

    pub fn wallet_recovery(wallet_id: &str) -> String {
        format!("wallet-{}-recovery", wallet_id)
    }

    pub fn wallet_metadata(wallet_id: &str) -> String {
        format!("wallet-{}-metadata", wallet_id)
    }

    pub fn profile(wallet_address: &str) -> String {
        format!("profile-{}", wallet_address)
    }
}

/// A single mutation inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: String },
    Delete { key: String },
}

impl WriteOp {
    pub fn put_json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::Put {
            key: key.into(),
            value: serde_json::to_string(value)?,
        })
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    fn apply<M: KeyMap>(self, map: &mut M) {
        match self {
            WriteOp::Put { key, value } => map.put(key, value),
            WriteOp::Delete { key } => map.delete(&key),
        }
    }
}

trait KeyMap {
    fn put(&mut self, key: String, value: String);
    fn delete(&mut self, key: &str);
}

impl KeyMap for HashMap<String, String> {
    fn put(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
    fn delete(&mut self, key: &str) {
        self.remove(key);
    }
}

impl KeyMap for BTreeMap<String, String> {
    fn put(&mut self, key: String, value: String) {
        self.insert(key, value);
    }
    fn delete(&mut self, key: &str) {
        self.remove(key);
    }
}

/// Storage backend abstraction.
///
/// Implementations must make `write_batch` all-or-nothing: a failed batch
/// leaves every key untouched.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()>;

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.write_batch(vec![WriteOp::Put { key: key.to_string(), value }])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write_batch(vec![WriteOp::delete(key)])
    }
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Volatile store, used in tests and for throwaway deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for op in ops {
            op.apply(&mut *entries);
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Each batch rewrites the file through a temporary sibling and a rename,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    // Keep the unreadable file around for inspection
                    let backup = path.with_extension("corrupt");
                    tracing::warn!(
                        "Store file {} is corrupt ({}); moving it to {} and starting empty",
                        path.display(), e, backup.display()
                    );
                    fs::rename(&path, &backup)?;
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::info!("Opened file store at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        let body = serde_json::to_vec_pretty(entries)?;
        fs::write(&tmp, body)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.clone();
        for op in ops {
            op.apply(&mut next);
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Build the backend selected in configuration
pub fn open_store(config: &StorageConfig) -> Result<SharedStore> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::File => Ok(Arc::new(FileStore::open(&config.path)?)),
    }
}

/// Read and parse a JSON record, reporting unparsable data as corruption
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| VanguardError::PersistenceCorruption {
                key: key.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Read a JSON record; a corrupt record is deleted and treated as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match read_json(store, key) {
        Err(VanguardError::PersistenceCorruption { key, reason }) => {
            tracing::warn!("Discarding corrupt record '{}': {}", key, reason);
            store.remove(&key)?;
            Ok(None)
        }
        other => other,
    }
}

/// Which browser context the `current-*` keys belong to.
///
/// The library's default scope uses the literal keys, like a single
/// browser profile. The web server gives each client cookie its own scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextScope {
    #[default]
    Local,
    Client(Uuid),
}

impl ContextScope {
    pub fn prefix(&self) -> String {
        match self {
            ContextScope::Local => String::new(),
            ContextScope::Client(id) => format!("client-{}/", id),
        }
    }

    pub fn current_session_key(&self) -> String {
        format!("{}{}", self.prefix(), keys::CURRENT_USER_SESSION)
    }

    pub fn current_wallet_key(&self) -> String {
        format!("{}{}", self.prefix(), keys::CURRENT_WALLET_POINTER)
    }
}

/// Named mutexes serializing read-modify-write cycles on shared records.
///
/// Several client contexts share one store; the wallet collection and
/// per-wallet profiles are rewritten whole, so writers take the record's
/// lock first.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock<R>(&self, name: &str, f: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
    }

    #[test]
    fn test_memory_store_batch() {
        let store = MemoryStore::new();
        store.set("a", "1".into()).unwrap();
        store
            .write_batch(vec![
                WriteOp::Put { key: "b".into(), value: "2".into() },
                WriteOp::delete("a"),
            ])
            .unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_load_json_discards_corrupt_record() {
        let store = MemoryStore::new();
        store.set("broken", "{not json".into()).unwrap();

        let err = read_json::<Sample>(&store, "broken").unwrap_err();
        assert!(matches!(err, VanguardError::PersistenceCorruption { .. }));

        let loaded = load_json::<Sample>(&store, "broken").unwrap();
        assert!(loaded.is_none());
        assert_eq!(store.get("broken").unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            let op = WriteOp::put_json("sample", &Sample { name: "w1".into() }).unwrap();
            store.write_batch(vec![op]).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        let sample: Option<Sample> = read_json(&store, "sample").unwrap();
        assert_eq!(sample, Some(Sample { name: "w1".into() }));
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "garbage").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.keys_with_prefix("").unwrap().is_empty());
        assert!(path.with_extension("corrupt").exists());
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        let scope = ContextScope::Client(Uuid::new_v4());
        store.set(&scope.current_session_key(), "{}".into()).unwrap();
        store.set(&scope.current_wallet_key(), "{}".into()).unwrap();
        store.set(keys::WALLET_COLLECTION, "[]".into()).unwrap();

        let mut scoped = store.keys_with_prefix(&scope.prefix()).unwrap();
        scoped.sort();
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|k| k.starts_with("client-")));
    }

    #[test]
    fn test_local_scope_uses_literal_keys() {
        let scope = ContextScope::Local;
        assert_eq!(scope.current_session_key(), "current-user-session");
        assert_eq!(scope.current_wallet_key(), "current-wallet-pointer");
    }
}
