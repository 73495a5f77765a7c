//! A single AMQP session, modeled as a small state machine.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

use crate::manager::ManagerInner;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Waiting = 0,
    Connecting = 1,
    Connected = 2,
    Retiring = 3,
    Finished = 4,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnectionState::Waiting,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Retiring,
            _ => ConnectionState::Finished,
        }
    }
}

/// A single AMQP session in the state machine described below.
/// Owned exclusively by its creating [`crate::manager::ConnectionManager`];
/// consumers only ever see a [`Weak`] reference, handed to them through
/// the manager's `connected` broadcast.
pub struct Connection {
    id: u64,
    manager: Weak<ManagerInner>,
    state: AtomicU8,
    amqp: Mutex<Option<lapin::Connection>>,
    retirement_delay: Duration,
    connected_tx: broadcast::Sender<()>,
    retiring_tx: broadcast::Sender<()>,
    finished_tx: broadcast::Sender<()>,
}

impl Connection {
    pub(crate) fn new(id: u64, manager: Weak<ManagerInner>, retirement_delay: Duration) -> Arc<Self> {
        Arc::new(Connection {
            id,
            manager,
            state: AtomicU8::new(ConnectionState::Waiting as u8),
            amqp: Mutex::new(None),
            retirement_delay,
            connected_tx: broadcast::channel(EVENT_CAPACITY).0,
            retiring_tx: broadcast::channel(EVENT_CAPACITY).0,
            finished_tx: broadcast::channel(EVENT_CAPACITY).0,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn subscribe_connected(&self) -> broadcast::Receiver<()> {
        self.connected_tx.subscribe()
    }

    pub fn subscribe_retiring(&self) -> broadcast::Receiver<()> {
        self.retiring_tx.subscribe()
    }

    pub fn subscribe_finished(&self) -> broadcast::Receiver<()> {
        self.finished_tx.subscribe()
    }

    /// The live handle, cloned (lapin's `Connection` is a cheap, shareable
    /// handle) when this connection is `connected`. `None` otherwise.
    pub async fn amqp(&self) -> Option<lapin::Connection> {
        if self.state() != ConnectionState::Connected {
            return None;
        }
        self.amqp.lock().await.clone()
    }

    fn compare_and_set(&self, expected: ConnectionState, new: ConnectionState) -> bool {
        self.state
            .compare_exchange(
                expected as u8,
                new as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Callable only from `waiting`; a no-op otherwise. Dials the broker
    /// with a 30s timeout, heartbeat 120s and TCP no-delay.
    ///
    /// Takes `self` by owned `Arc` (rather than `&Arc<Self>`, which isn't
    /// a stable method receiver) so it can hand a [`Weak`] clone of itself
    /// to the handle's error callback.
    pub async fn connect(self: Arc<Self>) {
        if !self.compare_and_set(ConnectionState::Waiting, ConnectionState::Connecting) {
            return;
        }

        let Some(manager) = self.manager.upgrade() else {
            return;
        };

        let credential = match manager.credentials.fetch().await {
            Ok(c) => c,
            Err(e) => {
                log::warn!("connection {}: credential fetch failed: {e}", self.id);
                self.failed().await;
                return;
            }
        };

        let uri = tuned_uri(&credential.connection_string);
        let dial = lapin::Connection::connect(&uri, lapin::ConnectionProperties::default());

        match tokio::time::timeout(Duration::from_secs(30), dial).await {
            Ok(Ok(amqp_conn)) => {
                if !self.compare_and_set(ConnectionState::Connecting, ConnectionState::Connected) {
                    // Retired while the dial was in flight — discard the handle.
                    let _ = amqp_conn.close(0, "retired before dial completed").await;
                    return;
                }

                let weak_self = Arc::downgrade(&self);
                amqp_conn.on_error(move |_err| {
                    if let Some(this) = weak_self.upgrade() {
                        tokio::spawn(async move { this.failed().await });
                    }
                });

                *self.amqp.lock().await = Some(amqp_conn);
                log::info!("connection {} connected", self.id);
                let _ = self.connected_tx.send(());

                // `recycle_after` is a hint from the credential
                // itself (e.g. an expiring claim); when present, recycle no
                // later than `min(recycleInterval, recycleAfter)` after
                // connecting rather than waiting for the next scheduled tick.
                if let Some(recycle_after) = credential.recycle_after {
                    let delay = recycle_after.min(manager.config.recycle_interval);
                    let weak_self = Arc::downgrade(&self);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let Some(this) = weak_self.upgrade() else {
                            return;
                        };
                        if this.state() != ConnectionState::Connected {
                            return;
                        }
                        if let Some(manager) = this.manager.upgrade() {
                            manager.recycle().await;
                        }
                    });
                }
            }
            Ok(Err(e)) => {
                log::warn!("connection {}: dial failed: {e}", self.id);
                self.failed().await;
            }
            Err(_) => {
                log::warn!("connection {}: dial timed out after 30s", self.id);
                self.failed().await;
            }
        }
    }

    /// No-op outside `connected`; otherwise asks the manager to recycle.
    /// Never mutates this connection's own state — the manager's
    /// subsequent `retire()` call does that.
    pub async fn failed(self: Arc<Self>) {
        if matches!(self.state(), ConnectionState::Retiring | ConnectionState::Finished) {
            return;
        }
        if let Some(manager) = self.manager.upgrade() {
            manager.recycle().await;
        }
    }

    /// Idempotent against `retiring`/`finished`. Emits `retiring`
    /// immediately, waits the retirement delay, closes the handle
    /// ignoring errors, then emits `finished`.
    pub async fn retire(self: Arc<Self>) {
        loop {
            let current = self.state();
            if matches!(current, ConnectionState::Retiring | ConnectionState::Finished) {
                return;
            }
            if self.compare_and_set(current, ConnectionState::Retiring) {
                break;
            }
        }

        log::info!("connection {} retiring", self.id);
        let _ = self.retiring_tx.send(());

        tokio::time::sleep(self.retirement_delay).await;

        if let Some(handle) = self.amqp.lock().await.take() {
            if let Err(e) = handle.close(0, "retiring").await {
                log::debug!("connection {}: error closing handle on retire: {e}", self.id);
            }
        }

        self.state.store(ConnectionState::Finished as u8, Ordering::SeqCst);
        log::info!("connection {} finished", self.id);
        let _ = self.finished_tx.send(());
    }
}

/// Requests the dial-level tuning this crate needs by folding extra
/// query parameters into the AMQP URI, the same way `lapin` surfaces
/// connection-level AMQPUri parameters.
fn tuned_uri(base: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}heartbeat=120&connection_timeout=30000&tcp_nodelay=true")
}
