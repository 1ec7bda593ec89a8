//! Provider scope for the price hub.
//!
//! A [`PriceSyncProvider`] owns one hub for the lifetime of a consumer tree. Code running
//! inside [`PriceSyncProvider::scope`] can reach the hub through [`use_price_sync`] without
//! threading it through every constructor; code outside any scope gets
//! [`PriceSyncError::NoProviderInScope`].
//!
//! The scope is task-local: futures handed to `tokio::spawn` from inside a scope do not
//! inherit it and should receive a cloned [`PriceHub`] instead.

use crate::config::HubConfig;
use crate::error::{PriceSyncError, Result};
use crate::hub::PriceHub;
use std::future::Future;
use tokio::task::JoinHandle;

tokio::task_local! {
    static CURRENT_HUB: PriceHub;
}

/// Owner of one hub instance and its dispatch worker.
pub struct PriceSyncProvider {
    hub: PriceHub,
    worker: Option<JoinHandle<()>>,
}

impl PriceSyncProvider {
    /// Create the hub and start its dispatch worker.
    ///
    /// Must be called from a current-thread tokio runtime (`#[tokio::main(flavor =
    /// "current_thread")]`, `#[tokio::test]`); anything else is `UnsupportedRuntime`.
    pub fn mount(config: HubConfig) -> Result<Self> {
        let (hub, worker) = PriceHub::spawn(config)?;
        log::debug!("price provider mounted (epsilon {})", config.epsilon);
        Ok(Self {
            hub,
            worker: Some(worker),
        })
    }

    pub fn hub(&self) -> &PriceHub {
        &self.hub
    }

    /// Run `fut` with this provider's hub in scope.
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_HUB.scope(self.hub.clone(), fut).await
    }

    /// Run `f` with this provider's hub in scope.
    pub fn scope_sync<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT_HUB.sync_scope(self.hub.clone(), f)
    }

    /// Tear down: deliver what is already queued, stop the worker, drop all subscribers.
    pub async fn unmount(mut self) -> Result<()> {
        self.hub.request_shutdown();
        if let Some(worker) = self.worker.take() {
            worker
                .await
                .map_err(|e| PriceSyncError::other(format!("dispatch worker failed: {e}")))?;
        }
        self.hub.clear_subscribers();
        log::debug!("price provider unmounted");
        Ok(())
    }
}

impl Drop for PriceSyncProvider {
    fn drop(&mut self) {
        if self.worker.take().is_some() {
            // Worker drains its queue and exits on its own.
            self.hub.request_shutdown();
        }
    }
}

/// The hub of the innermost enclosing provider scope.
pub fn use_price_sync() -> Result<PriceHub> {
    CURRENT_HUB
        .try_with(PriceHub::clone)
        .map_err(|_| PriceSyncError::NoProviderInScope)
}
