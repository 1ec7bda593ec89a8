//! Feed replay application
//!
//! Replays a feed script against one provider session, reporting every read, ignored
//! write and delivered notification to an output sink.

use crate::error::Result;
use crate::feed::{FeedCommand, FeedSource};
use crate::hub::{Price, PriceChange, PriceUpdate, ResourceId, Subscription};
use crate::provider::{use_price_sync, PriceSyncProvider};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Something worth printing during a replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// A watched resource changed
    Changed(PriceChange),
    /// Result of a `get`
    Read {
        resource_id: ResourceId,
        price: Option<Price>,
    },
    /// A `set` that did not change the store
    Ignored {
        resource_id: ResourceId,
        price: Price,
        update: PriceUpdate,
    },
    /// Result of a `dump`, sorted by resource
    Snapshot(Vec<(ResourceId, Price)>),
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayEvent::Changed(change) => match change.previous {
                Some(previous) => write!(
                    f,
                    "changed {} {} (was {})",
                    change.resource_id, change.price, previous
                ),
                None => write!(f, "changed {} {}", change.resource_id, change.price),
            },
            ReplayEvent::Read {
                resource_id,
                price: Some(price),
            } => write!(f, "price {} {}", resource_id, price),
            ReplayEvent::Read {
                resource_id,
                price: None,
            } => write!(f, "price {} absent", resource_id),
            ReplayEvent::Ignored {
                resource_id,
                price,
                update,
            } => {
                let reason = if *update == PriceUpdate::Rejected {
                    "rejected"
                } else {
                    "unchanged"
                };
                write!(f, "{} {} {}", reason, resource_id, price)
            }
            ReplayEvent::Snapshot(prices) => {
                write!(f, "prices")?;
                for (resource_id, price) in prices {
                    write!(f, " {}={}", resource_id, price)?;
                }
                Ok(())
            }
        }
    }
}

/// Counters reported at the end of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub commands: usize,
    pub changes: usize,
    pub ignored: usize,
    pub notifications: usize,
}

/// Replay state: the watches opened by the script and the event channel they report on.
pub struct FeedReplay {
    watches: HashMap<ResourceId, Subscription>,
    events_tx: UnboundedSender<ReplayEvent>,
    events_rx: UnboundedReceiver<ReplayEvent>,
    summary: ReplaySummary,
}

impl FeedReplay {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            watches: HashMap::new(),
            events_tx,
            events_rx,
            summary: ReplaySummary::default(),
        }
    }

    /// Run every command of `source` inside `provider`'s scope, writing events to `out`.
    pub async fn run<S, W>(
        &mut self,
        provider: &PriceSyncProvider,
        source: &mut S,
        out: &mut W,
    ) -> Result<ReplaySummary>
    where
        S: FeedSource + ?Sized,
        W: Write,
    {
        while let Some(command) = source.next_command().await? {
            self.summary.commands += 1;
            provider.scope(self.execute(command)).await?;
            self.drain(out)?;
        }

        // Deliver whatever the last writes scheduled before reporting.
        provider.hub().flush().await;
        self.drain(out)?;
        self.watches.clear();

        Ok(self.summary)
    }

    async fn execute(&mut self, command: FeedCommand) -> Result<()> {
        let hub = use_price_sync()?;

        match command {
            FeedCommand::Set { resource_id, price } => {
                let update = hub.set_price(resource_id.clone(), price);
                if update.is_changed() {
                    self.summary.changes += 1;
                } else {
                    self.summary.ignored += 1;
                    self.emit(ReplayEvent::Ignored {
                        resource_id,
                        price,
                        update,
                    });
                }
            }
            FeedCommand::Get { resource_id } => {
                let price = hub.get_price(resource_id.as_str());
                self.emit(ReplayEvent::Read { resource_id, price });
            }
            FeedCommand::Watch { resource_id } => {
                if !self.watches.contains_key(&resource_id) {
                    let tx = self.events_tx.clone();
                    let subscription = hub.subscribe(resource_id.clone(), move |change| {
                        tx.send(ReplayEvent::Changed(change.clone()))
                            .map_err(|_| anyhow::anyhow!("replay output closed"))
                    });
                    self.watches.insert(resource_id, subscription);
                }
            }
            FeedCommand::Unwatch { resource_id } => {
                // Dropping the subscription unsubscribes.
                self.watches.remove(&resource_id);
            }
            FeedCommand::Flush => hub.flush().await,
            FeedCommand::Dump => {
                let mut prices: Vec<_> = hub
                    .prices()
                    .iter()
                    .map(|(resource_id, price)| (resource_id.clone(), *price))
                    .collect();
                prices.sort_by(|a, b| a.0.cmp(&b.0));
                self.emit(ReplayEvent::Snapshot(prices));
            }
        }
        Ok(())
    }

    fn emit(&self, event: ReplayEvent) {
        // The receiver lives as long as self.
        let _ = self.events_tx.send(event);
    }

    fn drain<W: Write>(&mut self, out: &mut W) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, ReplayEvent::Changed(_)) {
                self.summary.notifications += 1;
            }
            writeln!(out, "{}", event)?;
        }
        Ok(())
    }
}

impl Default for FeedReplay {
    fn default() -> Self {
        Self::new()
    }
}
