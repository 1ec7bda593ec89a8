//! Subscription registry.
//!
//! Maps each resource to the callbacks interested in it. A callback is identified by its
//! shared allocation, so registering the same [`PriceCallback`] twice for a resource keeps
//! a single entry. Empty entries are removed as soon as their last subscriber leaves.

use crate::hub::protocol::PriceChange;
use crate::hub::store::ResourceId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Subscriber callback. Errors are logged by the dispatcher and go no further.
pub type PriceCallback = Arc<dyn Fn(&PriceChange) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a [`PriceCallback`].
pub fn callback<F>(f: F) -> PriceCallback
where
    F: Fn(&PriceChange) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_callback(a: &PriceCallback, b: &PriceCallback) -> bool {
    // Compare data addresses only; vtable pointers are not guaranteed unique.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: HashMap<ResourceId, Vec<PriceCallback>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the callback was already registered for this resource.
    pub fn insert(&mut self, resource_id: ResourceId, callback: PriceCallback) -> bool {
        let set = self.subscribers.entry(resource_id).or_default();
        if set.iter().any(|existing| same_callback(existing, &callback)) {
            return false;
        }
        set.push(callback);
        true
    }

    /// Returns true when the callback was present.
    pub fn remove(&mut self, resource_id: &str, callback: &PriceCallback) -> bool {
        let Some(set) = self.subscribers.get_mut(resource_id) else {
            return false;
        };

        let before = set.len();
        set.retain(|existing| !same_callback(existing, callback));
        let removed = set.len() != before;

        if set.is_empty() {
            self.subscribers.remove(resource_id);
        }
        removed
    }

    /// Clone of the current subscribers, so callbacks can run without the registry locked.
    pub fn snapshot(&self, resource_id: &str) -> Vec<PriceCallback> {
        self.subscribers
            .get(resource_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, resource_id: &str, callback: &PriceCallback) -> bool {
        self.subscribers
            .get(resource_id)
            .is_some_and(|set| set.iter().any(|existing| same_callback(existing, callback)))
    }

    pub fn subscriber_count(&self, resource_id: &str) -> usize {
        self.subscribers.get(resource_id).map_or(0, Vec::len)
    }

    pub fn tracked_resources(&self) -> usize {
        self.subscribers.len()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (id, set) in &self.subscribers {
            map.entry(&id.as_str(), &set.len());
        }
        map.finish()
    }
}

/// Handle returned by `subscribe`. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<SubscriberRegistry>>,
    resource_id: ResourceId,
    callback: Option<PriceCallback>,
}

impl Subscription {
    pub(crate) fn new(
        registry: &Arc<Mutex<SubscriberRegistry>>,
        resource_id: ResourceId,
        callback: PriceCallback,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            resource_id,
            callback: Some(callback),
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Whether the callback is still registered. A handle whose callback was removed
    /// through another handle for the same callback reports false.
    pub fn is_active(&self) -> bool {
        let (Some(callback), Some(registry)) = (&self.callback, self.registry.upgrade()) else {
            return false;
        };
        let active = registry.lock().contains(self.resource_id.as_str(), callback);
        active
    }

    /// Remove the callback now. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(self.resource_id.as_str(), &callback);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("resource_id", &self.resource_id)
            .field("active", &self.is_active())
            .finish()
    }
}
