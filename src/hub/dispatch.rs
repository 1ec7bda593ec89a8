//! Dispatch worker: delivers queued price changes to subscribers outside the writer.

use crate::hub::protocol::{DispatchCommand, PriceChange};
use crate::hub::registry::SubscriberRegistry;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Run the dispatch worker, delivering price changes posted by the hub.
///
/// Commands are handled strictly in arrival order, so a `Flush` or `Shutdown` only takes
/// effect after every earlier notification batch has been delivered.
pub async fn dispatch_worker_loop(
    mut rx: UnboundedReceiver<DispatchCommand>,
    registry: Arc<Mutex<SubscriberRegistry>>,
) {
    while let Some(cmd) = rx.recv().await {
        if handle_command(cmd, &registry).done {
            break;
        }
    }
    log::debug!("price dispatch worker stopped");
}

fn handle_command(cmd: DispatchCommand, registry: &Mutex<SubscriberRegistry>) -> HandlerOutcome {
    match cmd {
        DispatchCommand::Notify(change) => {
            let report = deliver(&change, registry);
            log::trace!(
                "delivered {} to {} subscriber(s), {} failed",
                change.resource_id,
                report.delivered,
                report.failed
            );
            HandlerOutcome::proceed()
        }
        DispatchCommand::Flush(ack) => {
            // The waiter may have given up; nothing to do then.
            let _ = ack.send(());
            HandlerOutcome::proceed()
        }
        DispatchCommand::Shutdown => HandlerOutcome::exit(),
    }
}

/// Counts from one notification batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Invoke every subscriber of `change.resource_id`, isolating failures.
///
/// The registry lock is released before any callback runs, so callbacks may subscribe,
/// unsubscribe or write prices themselves.
pub fn deliver(change: &PriceChange, registry: &Mutex<SubscriberRegistry>) -> DeliveryReport {
    let subscribers = registry.lock().snapshot(change.resource_id.as_str());
    let mut report = DeliveryReport::default();

    for subscriber in subscribers {
        match catch_unwind(AssertUnwindSafe(|| subscriber(change))) {
            Ok(Ok(())) => report.delivered += 1,
            Ok(Err(err)) => {
                report.failed += 1;
                log::warn!(
                    "price subscriber for {} failed: {:#}",
                    change.resource_id,
                    err
                );
            }
            Err(panic) => {
                report.failed += 1;
                log::warn!(
                    "price subscriber for {} panicked: {}",
                    change.resource_id,
                    panic_message(&*panic)
                );
            }
        }
    }

    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

struct HandlerOutcome {
    done: bool,
}

impl HandlerOutcome {
    fn proceed() -> Self {
        Self { done: false }
    }

    fn exit() -> Self {
        Self { done: true }
    }
}
