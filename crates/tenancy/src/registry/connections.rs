//! Per-tenant connection registry.
//!
//! One live connection per tenant, created lazily on first use and shared by
//! every request for that tenant. Concurrent first-time callers share a single
//! in-flight dial. Failed dials are discarded so the next call retries, and
//! idle connections are closed by a sweep once nothing holds a lease on them.
//!
//! # Generations
//!
//! Every successful dial is tagged with a generation number drawn from a
//! registry-wide counter. Evicting a tenant retires its entry; the next access
//! dials again under a fresh generation, which invalidates every model bound to
//! the old one.
//!
//! # Locking
//!
//! The slot map and each entry's usage counters sit behind `parking_lot`
//! mutexes that are never held across an `.await`. Lock order is slot map
//! first, then entry.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cipher::CredentialCipher;
use crate::connector::Connector;
use crate::error::{ConnectionError, RegistryError, RegistryResult};
use crate::tenant::{ConnectionTarget, TenantDatabaseConfig, TenantId};

use super::RegistryConfig;

type DialOutcome<C> = Result<Arc<ConnectionEntry<C>>, RegistryError>;
type PendingDial<C> = Shared<BoxFuture<'static, DialOutcome<C>>>;

/// Observable state of a tenant's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A dial is in flight.
    Connecting,
    /// A live connection is cached.
    Ready,
}

/// Counters describing registry activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Dial attempts started.
    pub dials: u64,
    /// Dial attempts that failed.
    pub dial_failures: u64,
    /// Connections closed by eviction.
    pub evictions: u64,
    /// Connections currently cached.
    pub open_connections: usize,
}

enum Slot<C: Connector> {
    Connecting {
        generation: u64,
        pending: PendingDial<C>,
    },
    Ready(Arc<ConnectionEntry<C>>),
}

struct Usage {
    active: usize,
    last_used: Instant,
    retired: bool,
}

/// A live connection owned by the registry.
pub struct ConnectionEntry<C: Connector> {
    tenant_id: TenantId,
    generation: u64,
    handle: C::Connection,
    usage: Mutex<Usage>,
}

impl<C: Connector> ConnectionEntry<C> {
    fn new(tenant_id: TenantId, generation: u64, handle: C::Connection) -> Self {
        Self {
            tenant_id,
            generation,
            handle,
            usage: Mutex::new(Usage {
                active: 0,
                last_used: Instant::now(),
                retired: false,
            }),
        }
    }

    /// Returns the owning tenant.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the connection generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of live leases.
    pub fn active(&self) -> usize {
        self.usage.lock().active
    }

    /// Returns `true` once the entry has been evicted or shut down.
    pub fn is_retired(&self) -> bool {
        self.usage.lock().retired
    }

    /// Retires the entry if it has no leases and has been idle for `ttl`.
    fn try_retire(&self, now: Instant, ttl: Duration) -> bool {
        let mut usage = self.usage.lock();
        if usage.retired || usage.active > 0 {
            return false;
        }
        if now.saturating_duration_since(usage.last_used) < ttl {
            return false;
        }
        usage.retired = true;
        true
    }

    fn retire(&self) {
        self.usage.lock().retired = true;
    }
}

impl<C: Connector> fmt::Debug for ConnectionEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = self.usage.lock();
        f.debug_struct("ConnectionEntry")
            .field("tenant_id", &self.tenant_id)
            .field("generation", &self.generation)
            .field("active", &usage.active)
            .field("retired", &usage.retired)
            .finish()
    }
}

/// An active use of a tenant connection.
///
/// While a lease is alive the connection cannot be evicted. Dropping the
/// lease marks the connection as used now.
pub struct ConnectionLease<C: Connector> {
    entry: Arc<ConnectionEntry<C>>,
}

impl<C: Connector> ConnectionLease<C> {
    pub(crate) fn acquire(entry: Arc<ConnectionEntry<C>>) -> Result<Self, ConnectionError> {
        {
            let mut usage = entry.usage.lock();
            if usage.retired {
                return Err(ConnectionError::Retired {
                    tenant_id: entry.tenant_id.clone(),
                    generation: entry.generation,
                });
            }
            usage.active += 1;
        }
        Ok(Self { entry })
    }

    /// Returns the connection handle.
    pub fn handle(&self) -> &C::Connection {
        &self.entry.handle
    }

    /// Returns the connection generation.
    pub fn generation(&self) -> u64 {
        self.entry.generation
    }

    /// Returns the tenant the connection belongs to.
    pub fn tenant_id(&self) -> &TenantId {
        &self.entry.tenant_id
    }

    pub(crate) fn entry(&self) -> &Arc<ConnectionEntry<C>> {
        &self.entry
    }
}

impl<C: Connector> Deref for ConnectionLease<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        &self.entry.handle
    }
}

impl<C: Connector> Drop for ConnectionLease<C> {
    fn drop(&mut self) {
        let mut usage = self.entry.usage.lock();
        usage.active = usage.active.saturating_sub(1);
        usage.last_used = Instant::now();
    }
}

impl<C: Connector> fmt::Debug for ConnectionLease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionLease")
            .field("tenant_id", &self.entry.tenant_id)
            .field("generation", &self.entry.generation)
            .finish()
    }
}

struct Inner<C: Connector> {
    connector: C,
    cipher: CredentialCipher,
    config: RegistryConfig,
    slots: Mutex<HashMap<TenantId, Slot<C>>>,
    next_generation: AtomicU64,
    closed: AtomicBool,
    sweeper: Mutex<Option<mpsc::Sender<()>>>,
    dials: AtomicU64,
    dial_failures: AtomicU64,
    evictions: AtomicU64,
}

/// Registry of one live connection per tenant.
///
/// Cloning yields another handle to the same registry.
///
/// # Example
///
/// ```ignore
/// let registry = ConnectionRegistry::new(connector, cipher, RegistryConfig::default());
/// let conn = registry.get_connection(&tenant, &config).await?;
/// println!("generation {}", conn.generation());
/// ```
pub struct ConnectionRegistry<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> fmt::Debug for ConnectionRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connector", &self.inner.connector)
            .field("tenants", &self.len())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

impl<C: Connector> ConnectionRegistry<C> {
    /// Creates an empty registry.
    pub fn new(connector: C, cipher: CredentialCipher, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                cipher,
                config,
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                sweeper: Mutex::new(None),
                dials: AtomicU64::new(0),
                dial_failures: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the connector.
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Returns the registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Returns a lease on the tenant's connection, dialing if needed.
    ///
    /// Concurrent callers for a tenant without a cached connection all await
    /// the same dial. A failed dial is not cached: the next call dials again.
    /// If an acquire timeout is configured and elapses, the caller gets
    /// [`ConnectionError::Timeout`] while the dial keeps running and populates
    /// the cache for later callers.
    pub async fn get_connection(
        &self,
        tenant_id: &TenantId,
        config: &TenantDatabaseConfig,
    ) -> RegistryResult<ConnectionLease<C>> {
        self.ensure_open()?;

        let target = config.resolve(
            &self.inner.cipher,
            self.inner.config.decryption_policy,
            self.inner.connector.scheme(),
        )?;

        loop {
            let pending = {
                let mut slots = self.inner.slots.lock();
                match slots.get(tenant_id) {
                    Some(Slot::Ready(entry)) => {
                        if let Ok(lease) = ConnectionLease::acquire(Arc::clone(entry)) {
                            return Ok(lease);
                        }
                        slots.remove(tenant_id);
                        self.start_dial(&mut slots, tenant_id, target.clone())
                    }
                    Some(Slot::Connecting { pending, .. }) => pending.clone(),
                    None => self.start_dial(&mut slots, tenant_id, target.clone()),
                }
            };

            let entry = match self.inner.config.acquire_timeout {
                Some(limit) => tokio::time::timeout(limit, pending).await.map_err(|_| {
                    debug!(tenant_id = %tenant_id, "gave up waiting for tenant connection");
                    ConnectionError::Timeout {
                        tenant_id: tenant_id.clone(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }
                })??,
                None => pending.await?,
            };

            // An eviction may retire the entry between the dial finishing and
            // this lease; go around and use whatever the slot holds now.
            match ConnectionLease::acquire(entry) {
                Ok(lease) => return Ok(lease),
                Err(_) => self.ensure_open()?,
            }
        }
    }

    /// Spawns a dial for `tenant_id` and records it as in flight.
    ///
    /// Must be called with the slot map locked.
    fn start_dial(
        &self,
        slots: &mut HashMap<TenantId, Slot<C>>,
        tenant_id: &TenantId,
        target: ConnectionTarget,
    ) -> PendingDial<C> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let task = tokio::spawn(dial(
            Arc::clone(&self.inner),
            tenant_id.clone(),
            generation,
            target,
        ));

        let kind = self.inner.connector.kind();
        let tenant = tenant_id.clone();
        let pending = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(ConnectionError::Failed {
                    tenant_id: tenant,
                    backend: kind.to_string(),
                    message: join_error.to_string(),
                }
                .into()),
            }
        }
        .boxed()
        .shared();

        slots.insert(
            tenant_id.clone(),
            Slot::Connecting {
                generation,
                pending: pending.clone(),
            },
        );
        pending
    }

    /// Closes every idle connection whose idle time has reached the TTL.
    ///
    /// Connections with live leases are left for a later sweep. Returns the
    /// tenants whose connections were closed.
    pub async fn evict_idle(&self) -> Vec<TenantId> {
        let ttl = self.inner.config.idle_ttl;
        let now = Instant::now();

        let evicted = {
            let mut slots = self.inner.slots.lock();
            let mut evicted = Vec::new();
            slots.retain(|_, slot| match slot {
                Slot::Ready(entry) if entry.try_retire(now, ttl) => {
                    evicted.push(Arc::clone(entry));
                    false
                }
                _ => true,
            });
            evicted
        };

        let mut tenants = Vec::with_capacity(evicted.len());
        for entry in evicted {
            tenants.push(entry.tenant_id.clone());
            self.close_entry(entry, "idle").await;
        }
        tenants
    }

    /// Evicts one tenant's connection if it has no live leases.
    ///
    /// Returns `false` when there is no ready connection or it is in use.
    pub async fn evict(&self, tenant_id: &TenantId) -> bool {
        let entry = {
            let mut slots = self.inner.slots.lock();
            match slots.get(tenant_id) {
                Some(Slot::Ready(entry)) if entry.try_retire(Instant::now(), Duration::ZERO) => {
                    let entry = Arc::clone(entry);
                    slots.remove(tenant_id);
                    entry
                }
                _ => return false,
            }
        };

        self.close_entry(entry, "forced").await;
        true
    }

    async fn close_entry(&self, entry: Arc<ConnectionEntry<C>>, reason: &'static str) {
        self.inner.evictions.fetch_add(1, Ordering::Relaxed);
        info!(
            tenant_id = %entry.tenant_id,
            generation = entry.generation,
            reason,
            "closing tenant connection"
        );
        self.inner.connector.close(entry.handle.clone()).await;
    }

    /// Starts the background idle sweeper.
    ///
    /// Runs [`evict_idle`](Self::evict_idle) every `sweep_interval` until
    /// [`shutdown`](Self::shutdown) or until the registry is dropped. Starting
    /// a new sweeper stops the previous one.
    pub fn start_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let (tx, rx) = mpsc::channel(1);
        *self.inner.sweeper.lock() = Some(tx);

        let interval = self.inner.config.sweep_interval;
        let registry = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            Self::sweep_loop(rx, registry, interval).await;
        })
    }

    async fn sweep_loop(mut shutdown_rx: mpsc::Receiver<()>, registry: Weak<Inner<C>>, interval: Duration) {
        let mut interval = tokio::time::interval(interval);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("connection sweeper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let Some(inner) = registry.upgrade() else {
                        break;
                    };
                    let evicted = ConnectionRegistry { inner }.evict_idle().await;
                    if !evicted.is_empty() {
                        debug!(count = evicted.len(), "idle sweep evicted connections");
                    }
                }
            }
        }
    }

    /// Closes every connection and refuses further requests.
    ///
    /// In-flight dials are abandoned; a dial that completes afterwards closes
    /// its own connection. Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let sweeper = self.inner.sweeper.lock().take();
        if let Some(tx) = sweeper {
            let _ = tx.send(()).await;
        }

        let drained: Vec<Slot<C>> = self.inner.slots.lock().drain().map(|(_, slot)| slot).collect();
        let mut closed = 0usize;
        for slot in drained {
            if let Slot::Ready(entry) = slot {
                entry.retire();
                self.inner.connector.close(entry.handle.clone()).await;
                closed += 1;
            }
        }

        info!(closed, "connection registry shut down");
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.is_shut_down() {
            Err(RegistryError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Returns the state of a tenant's slot, if any.
    pub fn state(&self, tenant_id: &TenantId) -> Option<ConnectionState> {
        self.inner.slots.lock().get(tenant_id).map(|slot| match slot {
            Slot::Connecting { .. } => ConnectionState::Connecting,
            Slot::Ready(_) => ConnectionState::Ready,
        })
    }

    /// Returns the generation of a tenant's slot, in flight or ready.
    pub fn generation(&self, tenant_id: &TenantId) -> Option<u64> {
        self.inner.slots.lock().get(tenant_id).map(|slot| match slot {
            Slot::Connecting { generation, .. } => *generation,
            Slot::Ready(entry) => entry.generation,
        })
    }

    /// Returns the number of tenants with a slot.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// Returns `true` if no tenant has a slot.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns activity counters.
    pub fn stats(&self) -> RegistryStats {
        let open_connections = self
            .inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count();

        RegistryStats {
            dials: self.inner.dials.load(Ordering::Relaxed),
            dial_failures: self.inner.dial_failures.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            open_connections,
        }
    }
}

/// Clears a dial's `Connecting` slot, and counts the failure, when the dial
/// ends without installing a connection. Also runs if the dial panics or its
/// task is aborted.
struct PendingSlot<C: Connector> {
    inner: Arc<Inner<C>>,
    tenant_id: TenantId,
    generation: u64,
}

impl<C: Connector> Drop for PendingSlot<C> {
    fn drop(&mut self) {
        let mut slots = self.inner.slots.lock();
        let pending = matches!(
            slots.get(&self.tenant_id),
            Some(Slot::Connecting { generation, .. }) if *generation == self.generation
        );
        if pending {
            slots.remove(&self.tenant_id);
            self.inner.dial_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Dials a tenant database and installs the result.
///
/// Runs detached from any caller so a caller giving up does not cancel it.
async fn dial<C: Connector>(
    inner: Arc<Inner<C>>,
    tenant_id: TenantId,
    generation: u64,
    target: ConnectionTarget,
) -> DialOutcome<C> {
    inner.dials.fetch_add(1, Ordering::Relaxed);
    debug!(tenant_id = %tenant_id, generation, uri = %target, "dialing tenant database");

    let _slot = PendingSlot {
        inner: Arc::clone(&inner),
        tenant_id: tenant_id.clone(),
        generation,
    };

    let limit = inner.config.connect_timeout;
    let result = match tokio::time::timeout(limit, inner.connector.connect(&target)).await {
        Ok(Ok(handle)) => Ok(handle),
        Ok(Err(error)) => Err(error.to_string()),
        Err(_) => Err(format!(
            "no connection within {}",
            humantime::format_duration(limit)
        )),
    };

    let handle = match result {
        Ok(handle) => handle,
        Err(message) => {
            warn!(tenant_id = %tenant_id, generation, error = %message, "tenant connection failed");
            return Err(ConnectionError::Failed {
                tenant_id,
                backend: inner.connector.kind().to_string(),
                message,
            }
            .into());
        }
    };

    let entry = Arc::new(ConnectionEntry::new(tenant_id.clone(), generation, handle));
    let installed = {
        let mut slots = inner.slots.lock();
        let current = matches!(
            slots.get(&tenant_id),
            Some(Slot::Connecting { generation: g, .. }) if *g == generation
        );
        if current {
            slots.insert(tenant_id.clone(), Slot::Ready(Arc::clone(&entry)));
        }
        current
    };

    if !installed {
        // The registry was shut down while dialing.
        entry.retire();
        inner.connector.close(entry.handle.clone()).await;
        return Err(RegistryError::ShutDown);
    }

    info!(tenant_id = %tenant_id, generation, "tenant connection ready");
    Ok(entry)
}
