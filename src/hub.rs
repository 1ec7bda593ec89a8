//! Price broadcast hub: store, subscription registry and deferred dispatcher.
//!
//! ```text
//! set_price ──► PriceStore ──(changed)──► DispatchCommand::Notify ──► dispatch worker
//!                                                                      │
//!                                   SubscriberRegistry snapshot ◄──────┘──► callbacks
//! ```

pub mod dispatch;
pub mod facade;
pub mod protocol;
pub mod registry;
pub mod store;

pub use dispatch::{deliver, dispatch_worker_loop, DeliveryReport};
pub use facade::PriceHub;
pub use protocol::{DispatchCommand, PriceChange};
pub use registry::{callback, PriceCallback, SubscriberRegistry, Subscription};
pub use store::{Price, PriceMap, PriceStore, PriceUpdate, ResourceId};
