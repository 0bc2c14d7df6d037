//! One inbound SUB socket fanned out to many subscribers.
//!
//! A [`SubscriptionMux`] owns a single background receive loop. Every
//! message is decoded once and the same `Arc<M>` is handed to each
//! registered callback in registration order. A callback that returns an
//! error or panics is removed after the round; the others keep receiving.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};

use amiga_transport::{Address, Protocol};
use bytes::Bytes;
use futures_util::FutureExt;
use prost::Message;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::{ConnectionEvent, ConnectionState};
use crate::config::SubscriptionConfig;
use crate::connection::{connect_with_backoff, Connection};
use crate::error::{PeerError, Result};

/// Error type callbacks report failure with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a subscriber callback.
pub type CallbackFuture = Pin<Box<dyn Future<Output = std::result::Result<(), BoxError>> + Send>>;

type Callback<M> = Arc<dyn Fn(Arc<M>) -> CallbackFuture + Send + Sync>;
type Decoder<M> = Arc<dyn Fn(Bytes) -> Result<M> + Send + Sync>;

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Fan-out of one subscription socket. Cheap to clone; clones share the loop.
pub struct SubscriptionMux<M> {
    inner: Arc<MuxInner<M>>,
}

impl<M> Clone for SubscriptionMux<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MuxInner<M> {
    core: Arc<Core<M>>,
    task: tokio::sync::Mutex<Option<LoopHandle>>,
}

impl<M> Drop for MuxInner<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.cancel.cancel();
        }
    }
}

struct LoopHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct Core<M> {
    address: Address,
    config: SubscriptionConfig,
    decode: Decoder<M>,
    registry: Mutex<Registry<M>>,
    wake: Notify,
    state: Mutex<ConnectionState>,
    running: AtomicBool,
    // Bumped per started loop; only the current loop may clear `running`.
    generation: AtomicU64,
}

struct Registry<M> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback<M>)>,
}

impl<M> SubscriptionMux<M>
where
    M: Send + Sync + 'static,
{
    /// A multiplexer whose messages are produced by `decode`.
    pub fn new<D>(address: Address, config: SubscriptionConfig, decode: D) -> Self
    where
        D: Fn(Bytes) -> Result<M> + Send + Sync + 'static,
    {
        let core = Core {
            address,
            config,
            decode: Arc::new(decode),
            registry: Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            }),
            wake: Notify::new(),
            state: Mutex::new(ConnectionState::Unconnected),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        };
        Self {
            inner: Arc::new(MuxInner {
                core: Arc::new(core),
                task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn address(&self) -> &Address {
        &self.inner.core.address
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.core.state()
    }

    /// Whether the background receive loop is alive.
    pub fn is_running(&self) -> bool {
        self.inner.core.running.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.core.registry().entries.len()
    }

    /// Dial the publisher and start the receive loop.
    ///
    /// While the loop runs this returns `true` without dialing; the loop
    /// owns reconnection from then on.
    pub async fn connect(&self, max_retries: u32) -> bool {
        let core = &self.inner.core;
        let mut task = self.inner.task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.join.is_finished() {
                return true;
            }
        }

        core.transition(ConnectionEvent::Dial);
        match connect_with_backoff(
            &core.address,
            Protocol::Sub0,
            max_retries,
            &core.config.backoff,
            core.config.connect_timeout,
            core.config.max_message_size,
        )
        .await
        {
            Ok(conn) => {
                core.transition(ConnectionEvent::Established);
                let generation = core.generation.fetch_add(1, Ordering::AcqRel) + 1;
                core.running.store(true, Ordering::Release);
                let cancel = CancellationToken::new();
                let join = tokio::spawn(receive_loop(
                    Arc::clone(core),
                    conn,
                    cancel.clone(),
                    generation,
                ));
                *task = Some(LoopHandle { cancel, join });
                info!(address = %core.address, "subscription loop started");
                true
            }
            Err(err) => {
                warn!(address = %core.address, error = %err, "giving up on subscription");
                core.transition(ConnectionEvent::GaveUp);
                false
            }
        }
    }

    /// Add a callback. Delivery starts once the loop is connected.
    pub fn register<F, Fut>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        let callback: Callback<M> =
            Arc::new(move |message: Arc<M>| -> CallbackFuture { Box::pin(callback(message)) });
        let core = &self.inner.core;
        let id = {
            let mut registry = core.registry();
            let id = SubscriptionId(registry.next_id);
            registry.next_id += 1;
            registry.entries.push((id, callback));
            id
        };
        core.wake.notify_one();
        debug!(subscription = %id, "registered");
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        self.inner.core.unregister(id)
    }

    /// Connect, then register `callback` for as long as the guard lives.
    pub async fn subscribe<F, Fut>(&self, callback: F) -> Result<SubscriptionGuard>
    where
        F: Fn(Arc<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.ensure_connected().await?;
        let id = self.register(callback);
        Ok(SubscriptionGuard::new(id, &self.inner.core))
    }

    /// Connect, then receive messages through a pull handle.
    ///
    /// The handle buffers without bound. Dropping it unregisters.
    pub async fn subscribe_stream(&self) -> Result<Subscription<M>> {
        self.ensure_connected().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.register(move |message: Arc<M>| {
            let sent = tx.send(message);
            async move { sent.map_err(|_| BoxError::from("subscription handle dropped")) }
        });
        Ok(Subscription {
            rx,
            guard: SubscriptionGuard::new(id, &self.inner.core),
        })
    }

    /// Cancel the receive loop, wait for it and drop its socket.
    ///
    /// Registrations survive; a later [`connect`](Self::connect) resumes delivery.
    /// A `connect` issued while the loop winds down waits for it to finish.
    pub async fn stop(&self) {
        let core = &self.inner.core;
        // Held until the old loop is gone so no second loop can start meanwhile.
        let mut task = self.inner.task.lock().await;
        if let Some(handle) = task.take() {
            handle.cancel.cancel();
            if let Err(err) = handle.join.await {
                error!(address = %core.address, error = %err, "receive loop aborted");
            }
        }
        core.running.store(false, Ordering::Release);
        core.transition(ConnectionEvent::Close);
    }

    async fn ensure_connected(&self) -> Result<()> {
        let max_retries = self.inner.core.config.max_retries;
        if self.connect(max_retries).await {
            Ok(())
        } else {
            Err(PeerError::Connection {
                address: self.inner.core.address.to_string(),
                attempts: max_retries,
            })
        }
    }
}

impl<M> SubscriptionMux<M>
where
    M: Message + Default + Send + Sync + 'static,
{
    /// A multiplexer decoding each message body as protobuf `M`.
    pub fn protobuf(address: Address, config: SubscriptionConfig) -> Self {
        Self::new(address, config, |body: Bytes| Ok(M::decode(body)?))
    }
}

impl<M> std::fmt::Debug for SubscriptionMux<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = &self.inner.core;
        f.debug_struct("SubscriptionMux")
            .field("address", &core.address.to_string())
            .field("state", &core.state())
            .field("subscribers", &core.registry().entries.len())
            .finish()
    }
}

impl<M> Core<M> {
    fn registry(&self) -> std::sync::MutexGuard<'_, Registry<M>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, event: ConnectionEvent) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.next(event);
    }

    fn unregister(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| *entry != id);
        let removed = registry.entries.len() != before;
        if removed {
            debug!(subscription = %id, "unregistered");
        }
        removed
    }

    fn is_registered(&self, id: SubscriptionId) -> bool {
        self.registry().entries.iter().any(|(entry, _)| *entry == id)
    }

    /// One delivery round over a snapshot of the registry.
    async fn deliver(&self, message: Arc<M>) {
        let snapshot: Vec<(SubscriptionId, Callback<M>)> = self.registry().entries.clone();
        let mut failed = Vec::new();

        for (id, callback) in snapshot {
            // Unregistered earlier in this round.
            if !self.is_registered(id) {
                continue;
            }
            let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| {
                callback(Arc::clone(&message))
            })) {
                Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
                Err(panic) => Err(panic),
            };
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(subscription = %id, error = %err, "subscriber failed, removing it");
                    failed.push(id);
                }
                Err(panic) => {
                    error!(
                        subscription = %id,
                        panic = panic_message(panic.as_ref()),
                        "subscriber panicked, removing it"
                    );
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            self.registry()
                .entries
                .retain(|(entry, _)| !failed.contains(entry));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Sleep for `duration` unless cancelled first. Returns `false` on cancel.
async fn pause(cancel: &CancellationToken, duration: std::time::Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

async fn receive_loop<M>(
    core: Arc<Core<M>>,
    conn: Connection,
    cancel: CancellationToken,
    generation: u64,
) where
    M: Send + Sync + 'static,
{
    let config = &core.config;
    let mut conn = Some(conn);

    while !cancel.is_cancelled() {
        if core.registry().entries.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = core.wake.notified() => {}
                _ = tokio::time::sleep(config.idle_interval) => {}
            }
            continue;
        }

        if conn.is_none() {
            core.transition(ConnectionEvent::Dial);
            let dialed = tokio::select! {
                _ = cancel.cancelled() => break,
                dialed = Connection::dial(
                    &core.address,
                    Protocol::Sub0,
                    config.connect_timeout,
                    config.max_message_size,
                ) => dialed,
            };
            match dialed {
                Ok(fresh) => {
                    core.transition(ConnectionEvent::Established);
                    info!(address = %core.address, "subscription reconnected");
                    conn = Some(fresh);
                }
                Err(err) => {
                    core.transition(ConnectionEvent::GaveUp);
                    warn!(address = %core.address, error = %err, "subscription redial failed");
                    if !pause(&cancel, config.error_backoff).await {
                        break;
                    }
                }
            }
            continue;
        }
        let Some(active) = conn.as_mut() else {
            continue;
        };

        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = active.recv_timeout(config.timeout) => received,
        };
        match received {
            Ok(body) => {
                if !body.starts_with(&config.topic) {
                    continue;
                }
                match (core.decode)(body) {
                    Ok(message) => core.deliver(Arc::new(message)).await,
                    Err(err) => {
                        warn!(address = %core.address, error = %err, "dropping undecodable message")
                    }
                }
            }
            Err(PeerError::Timeout(_)) => {}
            Err(err) => {
                error!(address = %core.address, error = %err, "subscription receive failed");
                conn = None;
                core.transition(ConnectionEvent::Failed);
                if !pause(&cancel, config.error_backoff).await {
                    break;
                }
            }
        }
    }

    if core.generation.load(Ordering::Acquire) == generation {
        core.running.store(false, Ordering::Release);
        core.transition(ConnectionEvent::Close);
    }
    debug!(address = %core.address, generation, "subscription loop stopped");
}

/// Keeps a registration alive. Dropping it unregisters.
#[must_use = "dropping the guard unregisters the subscription"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce(SubscriptionId) + Send + Sync>>,
}

impl SubscriptionGuard {
    fn new<M>(id: SubscriptionId, core: &Arc<Core<M>>) -> Self
    where
        M: Send + Sync + 'static,
    {
        let core: Weak<Core<M>> = Arc::downgrade(core);
        Self {
            id,
            release: Some(Box::new(move |id| {
                if let Some(core) = core.upgrade() {
                    core.unregister(id);
                }
            })),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .finish()
    }
}

/// Pull handle over a registration.
pub struct Subscription<M> {
    rx: mpsc::UnboundedReceiver<Arc<M>>,
    guard: SubscriptionGuard,
}

impl<M> Subscription<M> {
    pub fn id(&self) -> SubscriptionId {
        self.guard.id()
    }

    /// Next message. `None` once the multiplexer is gone.
    pub async fn next(&mut self) -> Option<Arc<M>> {
        self.rx.recv().await
    }
}

impl<M> futures_core::Stream for Subscription<M> {
    type Item = Arc<M>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl<M> std::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.guard.id)
            .finish()
    }
}
