//! Resource rows: the consumers kept in sync by the hub.
//!
//! Each row inside a unit-price breakdown shows the price of one resource and lets the
//! user edit it. Several rows (possibly in different analyses) may show the same
//! resource; an edit in one shows up in the others once the dispatcher has run.

use crate::error::Result;
use crate::hub::{Price, PriceHub, PriceUpdate, ResourceId, Subscription};
use crate::provider::use_price_sync;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct ResourceRow {
    hub: PriceHub,
    resource_id: ResourceId,
    local: Arc<Mutex<Option<Price>>>,
    _subscription: Subscription,
}

impl ResourceRow {
    /// Subscribe a row to `resource_id`.
    ///
    /// When the hub has no price yet, `initial` (typically the value loaded with the
    /// analysis) is published so other rows pick it up.
    pub fn mount(hub: &PriceHub, resource_id: impl Into<ResourceId>, initial: Option<Price>) -> Self {
        let resource_id = resource_id.into();
        let known = hub.get_price(resource_id.as_str());
        let local = Arc::new(Mutex::new(known.or(initial)));

        let sink = Arc::clone(&local);
        let subscription = hub.subscribe(resource_id.clone(), move |change| {
            *sink.lock() = Some(change.price);
            Ok(())
        });

        if known.is_none() {
            if let Some(price) = initial {
                hub.set_price(resource_id.clone(), price);
            }
        }

        Self {
            hub: hub.clone(),
            resource_id,
            local,
            _subscription: subscription,
        }
    }

    /// Same as [`ResourceRow::mount`] using the hub of the enclosing provider scope.
    pub fn mount_in_scope(resource_id: impl Into<ResourceId>, initial: Option<Price>) -> Result<Self> {
        let hub = use_price_sync()?;
        Ok(Self::mount(&hub, resource_id, initial))
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// The price this row currently displays.
    pub fn price(&self) -> Option<Price> {
        *self.local.lock()
    }

    /// User edit: publish the value and display whatever the hub now holds.
    ///
    /// An edit within epsilon of the stored price snaps back to the stored price, so this
    /// row never disagrees with its siblings.
    pub fn edit_price(&self, price: Price) -> PriceUpdate {
        let update = self.hub.set_price(self.resource_id.clone(), price);
        match update {
            PriceUpdate::Changed { .. } => *self.local.lock() = Some(price),
            PriceUpdate::Unchanged => {
                *self.local.lock() = self.hub.get_price(self.resource_id.as_str());
            }
            PriceUpdate::Rejected => {}
        }
        update
    }
}

impl std::fmt::Debug for ResourceRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRow")
            .field("resource_id", &self.resource_id)
            .field("price", &self.price())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::provider::PriceSyncProvider;

    #[tokio::test]
    async fn test_edit_propagates_to_sibling_rows() {
        let provider = PriceSyncProvider::mount(HubConfig::default()).unwrap();
        let hub = provider.hub();

        let a = ResourceRow::mount(hub, "cement", Some(25.0));
        let b = ResourceRow::mount(hub, "cement", Some(99.0));
        hub.flush().await;

        // First loaded value wins; the second row adopts it.
        assert_eq!(a.price(), Some(25.0));
        assert_eq!(b.price(), Some(25.0));

        assert!(a.edit_price(27.5).is_changed());
        assert_eq!(a.price(), Some(27.5));
        hub.flush().await;
        assert_eq!(b.price(), Some(27.5));

        provider.unmount().await.unwrap();
    }

    #[tokio::test]
    async fn test_edit_within_epsilon_shows_stored_price() {
        let provider = PriceSyncProvider::mount(HubConfig::default()).unwrap();
        let hub = provider.hub();

        let a = ResourceRow::mount(hub, "rebar", Some(10.0));
        let b = ResourceRow::mount(hub, "rebar", None);
        hub.flush().await;

        assert_eq!(a.edit_price(10.0005), PriceUpdate::Unchanged);
        hub.flush().await;

        assert_eq!(hub.get_price("rebar"), Some(10.0));
        assert_eq!(a.price(), Some(10.0));
        assert_eq!(b.price(), Some(10.0));

        provider.unmount().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_edit_keeps_display() {
        let provider = PriceSyncProvider::mount(HubConfig::default()).unwrap();
        let row = ResourceRow::mount(provider.hub(), "sand", Some(10.0));

        assert_eq!(row.edit_price(-1.0), PriceUpdate::Rejected);
        assert_eq!(row.price(), Some(10.0));

        provider.unmount().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let provider = PriceSyncProvider::mount(HubConfig::default()).unwrap();
        let hub = provider.hub();
        {
            let _row = ResourceRow::mount(hub, "labor-1", None);
            assert_eq!(hub.subscriber_count("labor-1"), 1);
        }
        assert_eq!(hub.subscriber_count("labor-1"), 0);
        assert_eq!(hub.tracked_resources(), 0);

        provider.unmount().await.unwrap();
    }

    #[tokio::test]
    async fn test_mount_in_scope_requires_provider() {
        assert!(ResourceRow::mount_in_scope("x", None).is_err());

        let provider = PriceSyncProvider::mount(HubConfig::default()).unwrap();
        let row = provider
            .scope(async { ResourceRow::mount_in_scope("x", Some(1.0)) })
            .await
            .unwrap();
        assert_eq!(row.price(), Some(1.0));
        drop(row);
        provider.unmount().await.unwrap();
    }
}
