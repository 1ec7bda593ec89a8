//! # price-sync - Provider-Scoped Price Broadcast Hub
//!
//! Keeps independent consumers of a construction budget (the resource rows inside
//! unit-price analyses) synchronized on the current price of shared resources, without a
//! parent-to-child cascade.
//!
//! ## Features
//!
//! - **Price Store**: last-write-wins prices with an epsilon guard against echo loops
//! - **Subscriptions**: per-resource callbacks, removed on drop
//! - **Deferred Dispatch**: writers return before any subscriber runs; a failing
//!   subscriber never blocks the others
//! - **Provider Scope**: one hub per consumer tree, reachable through [`use_price_sync`]
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Hub settings, optionally loaded from TOML
//! - [`hub`] - Store, registry, dispatcher and the [`PriceHub`] handle
//! - [`provider`] - Mount/unmount lifecycle and scope lookup
//! - [`widget`] / [`analysis`] - Resource rows and unit-price analyses built on the hub
//! - [`feed`] / [`app`] - Feed script parsing and the replay application

pub mod config;
pub mod error;

pub mod hub;
pub mod provider;

pub mod analysis;
pub mod widget;

pub mod app;
pub mod feed;

// Re-export commonly used types for convenience
pub use error::{PriceSyncError, Result};

pub use analysis::{ResourceKind, ResourceLine, UnitPriceAnalysis};
pub use app::{FeedReplay, ReplayEvent, ReplaySummary};
pub use config::{HubConfig, DEFAULT_EPSILON};
pub use hub::{Price, PriceChange, PriceHub, PriceUpdate, ResourceId, Subscription};
pub use provider::{use_price_sync, PriceSyncProvider};
pub use widget::ResourceRow;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
