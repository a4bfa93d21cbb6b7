//! Self-healing connection manager
//!
//! Owns the single live [`Handle`] to the store and replaces it when it is
//! lost. State machine:
//!
//! ```text
//! DISCONNECTED --acquire/start--> CONNECTING --ok--> READY
//!                                  |  ^                 |
//!                                  +--+ fail, sleep     | connection lost
//!                                     retry_delay       v
//!                                                   CONNECTING
//! ```
//!
//! Callers never wait on a reconnect: while CONNECTING, [`ConnectionManager::acquire`]
//! fails fast with [`ConnectionError::NotReady`]. Establishment runs in one
//! spawned task at a time, retrying forever at a fixed delay until the store
//! answers or the manager is shut down.

use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::store::{ContactStore, StoreError};
use crate::config::{ConfigError, ConfigSource, DatabaseConfig};
use crate::supervisor::{FatalError, FatalSender};

/// Delay between failed establishment attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Interval of the background liveness check
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(10);

/// Opens a new store handle.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, config: &DatabaseConfig) -> Result<Arc<dyn ContactStore>, StoreError>;
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("configuration unavailable: {0}")]
    Config(#[from] ConfigError),

    #[error("could not connect: {0}")]
    Connect(#[from] StoreError),

    #[error("database connection is not ready")]
    NotReady,

    #[error("connection manager has been shut down")]
    ShutDown,
}

/// Observable manager state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u32 },
    Ready { generation: u64 },
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting { .. } => "connecting",
            Self::Ready { .. } => "ready",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Fixed delay between establishment attempts
    pub retry_delay: Duration,
    /// Liveness check interval; `None` disables the check
    pub liveness_interval: Option<Duration>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            liveness_interval: Some(DEFAULT_LIVENESS_INTERVAL),
        }
    }
}

/// A ready-to-use store handle tagged with the connection generation it
/// belongs to.
#[derive(Clone)]
pub struct Handle {
    store: Arc<dyn ContactStore>,
    generation: u64,
}

impl Handle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Deref for Handle {
    type Target = dyn ContactStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Owns the live handle and its reconnect loop. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    config: Arc<dyn ConfigSource>,
    options: ManagerOptions,
    fatal: FatalSender,
    state_tx: watch::Sender<ConnectionState>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    handle: Option<Handle>,
    generation: u64,
    establishing: Option<JoinHandle<()>>,
    liveness: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        config: Arc<dyn ConfigSource>,
        options: ManagerOptions,
        fatal: FatalSender,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                options,
                fatal,
                state_tx,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Begin connecting in the background and start the liveness check.
    pub async fn start(&self) {
        let mut slot = self.shared.slot.lock().await;
        if slot.shut_down {
            return;
        }
        if slot.handle.is_none() {
            begin_establish(&self.shared, &mut slot);
        }
        if slot.liveness.is_none() {
            if let Some(interval) = self.shared.options.liveness_interval {
                let weak = Arc::downgrade(&self.shared);
                slot.liveness = Some(tokio::spawn(liveness_loop(weak, interval)));
            }
        }
    }

    /// Return the live handle.
    ///
    /// With no handle, starts establishment (unless one is already in
    /// flight) and fails with `NotReady`.
    pub async fn acquire(&self) -> Result<Handle, ConnectionError> {
        let mut slot = self.shared.slot.lock().await;
        if slot.shut_down {
            return Err(ConnectionError::ShutDown);
        }
        if let Some(handle) = &slot.handle {
            return Ok(handle.clone());
        }
        begin_establish(&self.shared, &mut slot);
        Err(ConnectionError::NotReady)
    }

    /// Wait until a handle is available.
    pub async fn wait_ready(&self) -> Result<Handle, ConnectionError> {
        let mut rx = self.subscribe();
        loop {
            match self.acquire().await {
                Err(ConnectionError::NotReady) => {}
                other => return other,
            }
            // Disconnected only follows CONNECTING after shutdown; the next
            // acquire() reports it
            let woke = rx
                .wait_for(|s| s.is_ready() || *s == ConnectionState::Disconnected)
                .await
                .is_ok();
            if !woke {
                return Err(ConnectionError::ShutDown);
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Report an error raised by the handle of `generation`.
    ///
    /// A connection loss discards the handle and reconnects from scratch,
    /// re-reading configuration. Anything else is escalated to the
    /// supervisor as fatal. Reports about a replaced generation are ignored.
    pub async fn report_failure(&self, generation: u64, err: &StoreError) {
        let mut slot = self.shared.slot.lock().await;
        if slot.shut_down {
            return;
        }
        let current = slot.handle.as_ref().map(Handle::generation);
        if current != Some(generation) {
            tracing::debug!(generation, ?current, error = %err, "ignoring failure from stale handle");
            return;
        }

        if !err.is_connection_lost() {
            drop(slot);
            self.shared.fatal.signal(FatalError {
                generation,
                reason: err.to_string(),
            });
            return;
        }

        tracing::warn!(generation, error = %err, "database connection lost, reconnecting");
        let broken = slot.handle.take();
        begin_establish(&self.shared, &mut slot);
        drop(slot);

        if let Some(broken) = broken {
            tokio::spawn(async move { broken.store.close().await });
        }
    }

    /// Stop retrying and probing, and close the live handle.
    pub async fn shutdown(&self) {
        let handle = {
            let mut slot = self.shared.slot.lock().await;
            slot.shut_down = true;
            if let Some(task) = slot.establishing.take() {
                task.abort();
            }
            if let Some(task) = slot.liveness.take() {
                task.abort();
            }
            // Published under the lock so an establishment task cannot
            // overwrite it afterwards
            self.shared
                .state_tx
                .send_replace(ConnectionState::Disconnected);
            slot.handle.take()
        };

        if let Some(handle) = handle {
            handle.store.close().await;
        }
        tracing::info!("connection manager shut down");
    }

    /// Current handle, without starting establishment.
    async fn current(&self) -> Option<Handle> {
        self.shared.slot.lock().await.handle.clone()
    }
}

/// Spawn the establishment task unless one is already running.
/// Must be called with the slot locked.
fn begin_establish(shared: &Arc<Shared>, slot: &mut Slot) {
    if slot.establishing.as_ref().is_some_and(|t| !t.is_finished()) {
        return;
    }
    shared
        .state_tx
        .send_replace(ConnectionState::Connecting { attempt: 1 });
    slot.establishing = Some(tokio::spawn(establish_loop(Arc::downgrade(shared))));
}

async fn establish_loop(weak: Weak<Shared>) {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        {
            let slot = shared.slot.lock().await;
            if slot.shut_down {
                return;
            }
            shared
                .state_tx
                .send_replace(ConnectionState::Connecting { attempt });
        }

        match shared.try_connect().await {
            Ok(store) => {
                let mut slot = shared.slot.lock().await;
                if slot.shut_down {
                    drop(slot);
                    store.close().await;
                    return;
                }
                slot.generation += 1;
                let generation = slot.generation;
                slot.handle = Some(Handle { store, generation });
                slot.establishing = None;
                shared
                    .state_tx
                    .send_replace(ConnectionState::Ready { generation });
                tracing::info!(generation, attempt, "database connection ready");
                return;
            }
            Err(err) => {
                let delay = shared.options.retry_delay;
                tracing::warn!(
                    attempt,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "database connection failed"
                );
                drop(shared);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Shared {
    async fn try_connect(&self) -> Result<Arc<dyn ContactStore>, ConnectionError> {
        let config = self.config.load()?;
        tracing::debug!(database = %config.redacted(), ssl = config.ssl, "connecting to database");
        Ok(self.connector.connect(&config).await?)
    }
}

async fn liveness_loop(weak: Weak<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let manager = ConnectionManager { shared };
        let Some(handle) = manager.current().await else {
            continue;
        };
        if let Err(err) = handle.ping().await {
            manager.report_failure(handle.generation(), &err).await;
        }
    }
}
