//! Protocol definitions shared between the price hub and its dispatch worker.

use crate::hub::store::{Price, ResourceId};
use tokio::sync::oneshot;

/// Delivered to every subscriber of `resource_id` after a committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub resource_id: ResourceId,
    pub price: Price,
    /// Price before the write, `None` on the first write for this resource
    pub previous: Option<Price>,
}

/// Commands sent from the hub to the dispatch worker.
#[derive(Debug)]
pub enum DispatchCommand {
    /// Deliver one change to the resource's current subscribers
    Notify(PriceChange),
    /// Acknowledge once every earlier command has been handled
    Flush(oneshot::Sender<()>),
    /// Stop after every earlier command has been handled
    Shutdown,
}
