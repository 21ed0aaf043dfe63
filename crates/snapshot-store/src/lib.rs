//! Holders for the current live snapshot and the current configuration
//! records. Both are swapped whole: readers see either the old or the new
//! value, never a mix.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use config_schema::{load, ConfigEntity};
use live_schema::{LiveDataParser, LiveDataSnapshot};
use types::SchemaError;

pub type SharedSnapshot = Option<Arc<LiveDataSnapshot>>;

/// The most recent live-data document.
pub struct LiveDataStore {
    tx: watch::Sender<SharedSnapshot>,
    parser: LiveDataParser,
}

impl Default for LiveDataStore {
    fn default() -> Self {
        Self::new(LiveDataParser::default())
    }
}

impl LiveDataStore {
    pub fn new(parser: LiveDataParser) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, parser }
    }

    pub fn current(&self) -> SharedSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.tx.subscribe()
    }

    /// Publishes a complete snapshot in place of the previous one.
    pub fn replace(&self, snapshot: LiveDataSnapshot) -> Arc<LiveDataSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        debug!(
            inverters = snapshot.inverters.len(),
            subscribers = self.tx.receiver_count(),
            "live snapshot replaced"
        );
        snapshot
    }

    /// Parses a document and publishes it. An unreadable document leaves the current snapshot in place.
    pub fn ingest(&self, bytes: &[u8]) -> Result<Arc<LiveDataSnapshot>, SchemaError> {
        match self.parser.parse(bytes) {
            Ok(snapshot) => Ok(self.replace(snapshot)),
            Err(err) => {
                warn!(error = %err, "live document rejected");
                Err(err)
            }
        }
    }
}

/// The current, validated record of one configuration entity.
pub struct ConfigStore<E> {
    tx: watch::Sender<Option<Arc<E>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: ConfigEntity + Send + Sync + 'static> Default for ConfigStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ConfigEntity + Send + Sync + 'static> ConfigStore<E> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            _entity: PhantomData,
        }
    }

    pub fn with_record(record: E) -> Self {
        let (tx, _rx) = watch::channel(Some(Arc::new(record)));
        Self {
            tx,
            _entity: PhantomData,
        }
    }

    pub fn current(&self) -> Option<Arc<E>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<E>>> {
        self.tx.subscribe()
    }

    /// Migrates and validates a submitted record, then swaps it in.
    ///
    /// On any error the stored record is left untouched.
    pub fn apply(&self, bytes: &[u8]) -> Result<Arc<E>, SchemaError> {
        let entity = E::KIND.name();
        match load::<E>(bytes) {
            Ok(record) => {
                let record = Arc::new(record);
                self.tx.send_replace(Some(Arc::clone(&record)));
                metrics::counter!("config_writes_applied", "entity" => entity).increment(1);
                info!(entity, "configuration record applied");
                Ok(record)
            }
            Err(err) => {
                metrics::counter!("config_writes_rejected", "entity" => entity).increment(1);
                warn!(entity, error = %err, "configuration record rejected");
                Err(err)
            }
        }
    }

    /// The stored record in its wire form.
    pub fn document(&self) -> Result<Option<Value>, SchemaError> {
        self.current()
            .map(|record| record.to_document())
            .transpose()
    }
}
