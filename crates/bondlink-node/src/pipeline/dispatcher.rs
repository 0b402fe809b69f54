// ============================================
// File: crates/bondlink-node/src/pipeline/dispatcher.rs
// ============================================
//! # Dispatch Worker
//!
//! Delivers queued events to the application handler in FIFO order.
//! Handler failures are counted as `HandlingError` and logged. On
//! shutdown whatever is still queued is released undelivered.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bondlink_core::FailureKind;

use crate::events::{EventHandler, LinkEvent, TicketEvent};
use crate::stats::ConnectionStats;

/// Spawns the dispatch task.
pub(crate) fn spawn(
    mut queue: mpsc::Receiver<LinkEvent>,
    handler: Arc<dyn EventHandler>,
    stats: Arc<ConnectionStats>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("Dispatcher task received shutdown signal");
                    break;
                }
                event = queue.recv() => match event {
                    Some(event) => dispatch(handler.as_ref(), &stats, &event).await,
                    None => break,
                },
            }
        }

        queue.close();
        let mut released = 0usize;
        while queue.try_recv().is_ok() {
            released += 1;
        }
        debug!(released, "Dispatcher task exiting");
    })
}

async fn dispatch(handler: &dyn EventHandler, stats: &ConnectionStats, event: &LinkEvent) {
    if let Err(e) = handler.on_event(event).await {
        stats.record_failure(FailureKind::HandlingError);
        warn!(error = %e, "Event handler failed");
    }

    if let LinkEvent::Message(message) = event {
        if let Some(ticket) = TicketEvent::for_message(message) {
            if let Err(e) = handler.on_ticket(&ticket).await {
                stats.record_failure(FailureKind::HandlingError);
                warn!(error = %e, "Ticket handler failed");
            }
        }
    }

    stats.record_dispatched();
}
