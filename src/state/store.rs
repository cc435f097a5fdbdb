//! State persistence backends
//!
//! Stores hand back raw JSON records; decoding and invariant checks happen in
//! the manager so one bad record never poisons the whole load.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StateStoreError;
use crate::models::state::{SignalState, StoredSignalState};

/// Mapping from instrument identifier to its persisted state record.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, Value>, StateStoreError>;

    async fn save(&self, instrument: &str, state: &SignalState) -> Result<(), StateStoreError>;

    async fn remove(&self, instrument: &str) -> Result<(), StateStoreError>;

    async fn clear(&self) -> Result<(), StateStoreError>;
}

fn encode(state: &SignalState) -> Result<Value, StateStoreError> {
    Ok(serde_json::to_value(StoredSignalState::from(state))?)
}

/// Whole mapping kept in one pretty-printed JSON file, rewritten on every save.
pub struct JsonFileStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateStoreError {
        StateStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, Value>, StateStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet, starting fresh");
                Ok(BTreeMap::new())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, Value>) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), records = map.len(), "Saved signal states");
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load_all(&self) -> Result<HashMap<String, Value>, StateStoreError> {
        Ok(self.read_map().await?.into_iter().collect())
    }

    async fn save(&self, instrument: &str, state: &SignalState) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(instrument.to_string(), encode(state)?);
        self.write_map(&map).await
    }

    async fn remove(&self, instrument: &str) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(instrument).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StateStoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_map(&BTreeMap::new()).await
    }
}

/// One JSON value per instrument in a single Redis hash.
pub struct RedisStateStore {
    conn: ConnectionManager,
    key: String,
}

impl RedisStateStore {
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, StateStoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key: key.into(),
        })
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn load_all(&self) -> Result<HashMap<String, Value>, StateStoreError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(&self.key).await?;

        // Unparseable entries are passed through as strings and rejected on decode.
        Ok(raw
            .into_iter()
            .map(|(instrument, json)| {
                let value = serde_json::from_str(&json).unwrap_or(Value::String(json));
                (instrument, value)
            })
            .collect())
    }

    async fn save(&self, instrument: &str, state: &SignalState) -> Result<(), StateStoreError> {
        let json = serde_json::to_string(&encode(state)?)?;
        let mut conn = self.conn.clone();
        let _: () = conn.hset(&self.key, instrument, json).await?;
        Ok(())
    }

    async fn remove(&self, instrument: &str) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(&self.key, instrument).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(&self.key).await?;
        Ok(())
    }
}

/// Process-local store for dry runs and tests.
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: HashMap<String, Value>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_all(&self) -> Result<HashMap<String, Value>, StateStoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn save(&self, instrument: &str, state: &SignalState) -> Result<(), StateStoreError> {
        let value = encode(state)?;
        self.records
            .lock()
            .await
            .insert(instrument.to_string(), value);
        Ok(())
    }

    async fn remove(&self, instrument: &str) -> Result<(), StateStoreError> {
        self.records.lock().await.remove(instrument);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StateStoreError> {
        self.records.lock().await.clear();
        Ok(())
    }
}
