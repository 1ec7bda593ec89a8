//! The price hub handle shared by every consumer under one provider.

use crate::config::HubConfig;
use crate::error::{PriceSyncError, Result};
use crate::hub::dispatch::dispatch_worker_loop;
use crate::hub::protocol::{DispatchCommand, PriceChange};
use crate::hub::registry::{callback, PriceCallback, SubscriberRegistry, Subscription};
use crate::hub::store::{Price, PriceMap, PriceStore, PriceUpdate, ResourceId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

/// Cloneable handle to one provider's store, registry and dispatcher.
///
/// All clones share the same state. Writes are synchronous; subscriber notification is
/// posted to the dispatch worker, which shares the writer's single runtime thread and so
/// only runs once the writer yields. Writes must be issued from that runtime's thread.
#[derive(Clone)]
pub struct PriceHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    store: Mutex<PriceStore>,
    registry: Arc<Mutex<SubscriberRegistry>>,
    dispatch_tx: UnboundedSender<DispatchCommand>,
    /// Whole-map view for consumers that refresh on any change
    prices_tx: watch::Sender<Arc<PriceMap>>,
}

impl PriceHub {
    /// Create a hub and spawn its dispatch worker on the current tokio runtime.
    ///
    /// # Errors
    /// `UnsupportedRuntime` outside a tokio runtime or on a multi-threaded one: there the
    /// worker would be picked up by another thread while the writer is still running.
    pub fn spawn(config: HubConfig) -> Result<(Self, JoinHandle<()>)> {
        ensure_current_thread_runtime()?;

        let registry = Arc::new(Mutex::new(SubscriberRegistry::new()));
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (prices_tx, _) = watch::channel(Arc::new(PriceMap::new()));

        let worker = tokio::spawn(dispatch_worker_loop(dispatch_rx, Arc::clone(&registry)));

        let hub = Self {
            inner: Arc::new(HubInner {
                store: Mutex::new(PriceStore::new(config.epsilon)),
                registry,
                dispatch_tx,
                prices_tx,
            }),
        };
        Ok((hub, worker))
    }

    /// Write a price. Invalid and near-equal writes are silent no-ops.
    pub fn set_price(&self, resource_id: impl Into<ResourceId>, price: Price) -> PriceUpdate {
        let resource_id = resource_id.into();

        // Commit and schedule under the store lock so notifications keep write order.
        let mut store = self.inner.store.lock();
        let update = store.set(&resource_id, price);
        match update {
            PriceUpdate::Changed { previous } => {
                self.inner.prices_tx.send_modify(|prices| {
                    Arc::make_mut(prices).insert(resource_id.clone(), price);
                });
                self.schedule(PriceChange {
                    resource_id,
                    price,
                    previous,
                });
            }
            PriceUpdate::Unchanged => {
                log::trace!("price for {} within epsilon, ignored", resource_id);
            }
            PriceUpdate::Rejected => {
                log::debug!("rejected price {} for resource '{}'", price, resource_id);
            }
        }
        update
    }

    /// Apply `set_price` to every pair; returns how many prices actually changed.
    pub fn seed_prices<I, K>(&self, prices: I) -> usize
    where
        I: IntoIterator<Item = (K, Price)>,
        K: Into<ResourceId>,
    {
        let mut changed = 0;
        for (resource_id, price) in prices {
            if self.set_price(resource_id, price).is_changed() {
                changed += 1;
            }
        }
        changed
    }

    pub fn get_price(&self, resource_id: &str) -> Option<Price> {
        self.inner.store.lock().get(resource_id)
    }

    /// Snapshot of every known price. Cheap: the map is shared until the next change.
    pub fn prices(&self) -> Arc<PriceMap> {
        Arc::clone(&self.inner.prices_tx.borrow())
    }

    /// Receiver that is marked changed on every committed price change.
    pub fn watch_prices(&self) -> watch::Receiver<Arc<PriceMap>> {
        self.inner.prices_tx.subscribe()
    }

    /// Stream of whole-map snapshots, starting with the current one.
    pub fn price_stream(&self) -> WatchStream<Arc<PriceMap>> {
        WatchStream::new(self.watch_prices())
    }

    /// Register `f` for changes of `resource_id`.
    pub fn subscribe<F>(&self, resource_id: impl Into<ResourceId>, f: F) -> Subscription
    where
        F: Fn(&PriceChange) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_callback(resource_id, callback(f))
    }

    /// Register a shared callback. Registering the same callback twice for one resource
    /// keeps a single entry, and unsubscribing through either handle removes it; the
    /// other handle then reports `is_active() == false`.
    pub fn subscribe_callback(
        &self,
        resource_id: impl Into<ResourceId>,
        callback: PriceCallback,
    ) -> Subscription {
        let resource_id = resource_id.into();
        if !self
            .inner
            .registry
            .lock()
            .insert(resource_id.clone(), Arc::clone(&callback))
        {
            log::debug!("callback already subscribed to {}", resource_id);
        }
        Subscription::new(&self.inner.registry, resource_id, callback)
    }

    pub fn subscriber_count(&self, resource_id: &str) -> usize {
        self.inner.registry.lock().subscriber_count(resource_id)
    }

    /// Number of resources that currently have at least one subscriber.
    pub fn tracked_resources(&self) -> usize {
        self.inner.registry.lock().tracked_resources()
    }

    pub fn epsilon(&self) -> f64 {
        self.inner.store.lock().epsilon()
    }

    /// False once the dispatch worker has stopped.
    pub fn is_active(&self) -> bool {
        !self.inner.dispatch_tx.is_closed()
    }

    /// Wait until every notification scheduled before this call has been delivered.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .inner
            .dispatch_tx
            .send(DispatchCommand::Flush(ack_tx))
            .is_err()
        {
            return;
        }
        let _ = ack_rx.await;
    }

    /// Ask the worker to stop after the batches already queued.
    pub(crate) fn request_shutdown(&self) {
        let _ = self.inner.dispatch_tx.send(DispatchCommand::Shutdown);
    }

    /// Drop every subscriber entry at teardown.
    pub(crate) fn clear_subscribers(&self) {
        self.inner.registry.lock().clear();
    }

    fn schedule(&self, change: PriceChange) {
        let resource_id = change.resource_id.clone();
        if self
            .inner
            .dispatch_tx
            .send(DispatchCommand::Notify(change))
            .is_err()
        {
            log::debug!("hub torn down, change to {} not broadcast", resource_id);
        }
    }
}

fn ensure_current_thread_runtime() -> Result<()> {
    let handle = Handle::try_current()
        .map_err(|_| PriceSyncError::unsupported_runtime("no tokio runtime running"))?;
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => Ok(()),
        flavor => Err(PriceSyncError::unsupported_runtime(format!(
            "price hub needs a current-thread runtime, found {flavor:?}"
        ))),
    }
}

impl fmt::Debug for PriceHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceHub")
            .field("prices", &self.inner.store.lock().len())
            .field("subscribers", &*self.inner.registry.lock())
            .field("active", &self.is_active())
            .finish()
    }
}
