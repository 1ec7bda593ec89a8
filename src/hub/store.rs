//! In-memory price store.
//!
//! Holds the last-known price of every resource seen during one provider session.
//! Writes that would not move a price by more than the configured epsilon are dropped,
//! which keeps two rows that both read and write the same resource from echoing each
//! other forever.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Non-negative, currency-agnostic price.
pub type Price = f64;

/// Snapshot of every known price.
pub type PriceMap = HashMap<ResourceId, Price>;

/// Opaque identifier of a purchasable resource (material, labor, equipment, subcontract).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Result of a write against the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceUpdate {
    /// Empty id or invalid price; nothing happened
    Rejected,
    /// Within epsilon of the stored price; nothing happened
    Unchanged,
    /// Stored, and subscribers must be told
    Changed { previous: Option<Price> },
}

impl PriceUpdate {
    pub fn is_changed(&self) -> bool {
        matches!(self, PriceUpdate::Changed { .. })
    }
}

/// Last-write-wins mapping from resource to price.
#[derive(Debug, Clone)]
pub struct PriceStore {
    prices: PriceMap,
    epsilon: f64,
}

impl PriceStore {
    pub fn new(epsilon: f64) -> Self {
        Self {
            prices: HashMap::new(),
            epsilon,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Store `price` for `resource_id` unless it is invalid or too close to the current value.
    pub fn set(&mut self, resource_id: &ResourceId, price: Price) -> PriceUpdate {
        // NaN fails this comparison too
        if resource_id.is_empty() || !(price >= 0.0) || price.is_infinite() {
            return PriceUpdate::Rejected;
        }

        let previous = self.prices.get(resource_id.as_str()).copied();
        if let Some(current) = previous {
            if (current - price).abs() <= self.epsilon {
                return PriceUpdate::Unchanged;
            }
        }

        self.prices.insert(resource_id.clone(), price);
        PriceUpdate::Changed { previous }
    }

    pub fn get(&self, resource_id: &str) -> Option<Price> {
        self.prices.get(resource_id).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn snapshot(&self) -> PriceMap {
        self.prices.clone()
    }
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s)
    }

    #[test]
    fn test_set_then_get() {
        let mut store = PriceStore::default();
        assert_eq!(store.get("R1"), None);

        let update = store.set(&id("R1"), 10.0);
        assert_eq!(update, PriceUpdate::Changed { previous: None });
        assert_eq!(store.get("R1"), Some(10.0));
    }

    #[test]
    fn test_rejects_invalid_writes() {
        let mut store = PriceStore::default();
        store.set(&id("R1"), 5.0);

        assert_eq!(store.set(&id(""), 1.0), PriceUpdate::Rejected);
        assert_eq!(store.set(&id("R1"), -0.5), PriceUpdate::Rejected);
        assert_eq!(store.set(&id("R1"), f64::NAN), PriceUpdate::Rejected);
        assert_eq!(store.set(&id("R1"), f64::INFINITY), PriceUpdate::Rejected);

        assert_eq!(store.get("R1"), Some(5.0));
        assert_eq!(store.get(""), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_epsilon_boundary() {
        let mut store = PriceStore::default();
        store.set(&id("R1"), 10.0);

        assert_eq!(store.set(&id("R1"), 10.0005), PriceUpdate::Unchanged);
        assert_eq!(store.set(&id("R1"), 10.0), PriceUpdate::Unchanged);
        assert_eq!(store.get("R1"), Some(10.0));

        assert_eq!(
            store.set(&id("R1"), 12.0),
            PriceUpdate::Changed {
                previous: Some(10.0)
            }
        );
    }

    #[test]
    fn test_zero_is_a_valid_price() {
        let mut store = PriceStore::default();
        assert!(store.set(&id("free"), 0.0).is_changed());
        assert_eq!(store.get("free"), Some(0.0));
    }

    #[test]
    fn test_last_write_wins_downwards() {
        let mut store = PriceStore::default();
        store.set(&id("R1"), 50.0);
        store.set(&id("R1"), 20.0);
        assert_eq!(store.get("R1"), Some(20.0));
    }

    proptest! {
        #[test]
        fn prop_get_returns_written_price(name in "[A-Za-z0-9_-]{1,12}", price in 0.0f64..1.0e9) {
            let mut store = PriceStore::default();
            store.set(&id(&name), price);
            prop_assert_eq!(store.get(&name), Some(price));
        }

        #[test]
        fn prop_negative_price_leaves_store_unchanged(start in 0.0f64..1.0e6, bad in -1.0e6f64..-1.0e-9) {
            let mut store = PriceStore::default();
            store.set(&id("R"), start);
            prop_assert_eq!(store.set(&id("R"), bad), PriceUpdate::Rejected);
            prop_assert_eq!(store.get("R"), Some(start));
        }

        #[test]
        fn prop_near_equal_second_write_is_noop(start in 0.0f64..1.0e6, delta in -0.001f64..0.001) {
            let mut store = PriceStore::default();
            store.set(&id("R"), start);
            let next = start + delta;
            prop_assume!(next >= 0.0 && (next - start).abs() <= 0.001);
            prop_assert_eq!(store.set(&id("R"), next), PriceUpdate::Unchanged);
        }
    }
}
