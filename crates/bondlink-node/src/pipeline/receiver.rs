// ============================================
// File: crates/bondlink-node/src/pipeline/receiver.rs
// ============================================
//! # Receiver Worker
//!
//! ## Main Functionality
//! - Waits on the transport with a bounded timeout
//! - Runs every frame through the controller under the connection lock
//! - Sends protocol answers (pairing, status check, stop ack) itself
//! - Classifies and counts failures, resynchronizes after truncation
//! - Expires transaction and status-check timers after every poll
//!
//! ## ⚠️ Important Note for Next Developer
//! - Nothing here may abort the loop; every failure becomes a counter
//!   and, optionally, a failure event
//!
//! ## Last Modified
//! v0.1.0 - Initial receiver

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use bondlink_core::{CoreError, FailureKind, LinkController};
use bondlink_transport::{RawFrame, TransportError};

use crate::connection::Shared;
use crate::events::{InboundMessage, LinkEvent};
use crate::pipeline::EventQueue;

/// Spawns the receiver task.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    queue: EventQueue,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let timeout = shared.settings.receive_timeout;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Receiver task received shutdown signal");
                    break;
                }
                result = shared.transport.receive(timeout) => {
                    match result {
                        Ok(Some(frame)) => handle_frame(&shared, &queue, frame).await,
                        Ok(None) => {}
                        Err(e) => {
                            on_transport_error(&shared, &queue, &e);
                            if e.is_link_down() {
                                tokio::time::sleep(timeout).await;
                            }
                        }
                    }
                    poll_timeouts(&shared, &queue).await;
                }
            }
        }

        debug!("Receiver task exiting");
    })
}

/// Runs one frame through the controller and routes the outcome.
async fn handle_frame(shared: &Shared, queue: &EventQueue, frame: RawFrame) {
    shared.stats.record_rx(frame.len());
    let mut controller = shared.controller.lock().await;
    let result = controller.accept(&frame.bytes, Some(frame.source), frame.received_at);

    match result {
        Ok(accepted) => {
            if let Some(reply) = &accepted.reply {
                if let Err(e) = shared
                    .send_locked(&mut controller, reply.message_type, &reply.payload, None)
                    .await
                {
                    warn!(
                        message_type = %reply.message_type,
                        error = %e,
                        "Failed to answer peer"
                    );
                }
            }
            shared.sync_paired(&controller);
            drop(controller);

            if accepted.pairing_confirmed {
                queue
                    .push(LinkEvent::Paired {
                        device_id: accepted.device_id,
                    })
                    .await;
            }
            if queue.accepts(accepted.message_type) {
                queue
                    .push(LinkEvent::Message(InboundMessage::from_accepted(
                        accepted,
                        frame.received_at,
                    )))
                    .await;
            }
        }
        Err(e) => {
            if let Some(skip) = e.skip_hint() {
                shared.transport.skip_receive(skip);
            }
            if matches!(e, CoreError::Pairing { .. }) {
                notify_peer(shared, &mut controller, e.kind()).await;
            }
            shared.sync_paired(&controller);
            drop(controller);
            on_rejected(shared, queue, &e);
        }
    }
}

/// Tells a bound peer why its frame was refused so it re-pairs.
async fn notify_peer(shared: &Shared, controller: &mut LinkController, kind: FailureKind) {
    if controller.remote_device().is_none() {
        return;
    }
    let sent = match controller.prepare_error(kind) {
        Ok(frame) => shared.transmit_locked(controller, &frame).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = sent {
        debug!(error = %e, "Could not report failure to peer");
    }
}

fn on_rejected(shared: &Shared, queue: &EventQueue, error: &CoreError) {
    let kind = error.kind();
    shared.stats.record_failure(kind);
    if error.is_suspicious() {
        warn!(kind = %kind, error = %error, "Frame rejected");
    } else {
        debug!(kind = %kind, error = %error, "Frame rejected");
    }
    queue.report(kind, error.to_string());
}

fn on_transport_error(shared: &Shared, queue: &EventQueue, error: &TransportError) {
    shared.stats.record_failure(FailureKind::ReceiverError);
    if error.is_link_down() {
        debug!(error = %error, "Link down");
    } else {
        warn!(error = %error, "Transport receive error");
    }
    queue.report(FailureKind::ReceiverError, error.to_string());
}

async fn poll_timeouts(shared: &Shared, queue: &EventQueue) {
    let expired = shared
        .controller
        .lock()
        .await
        .poll_timeouts(Instant::now());
    for error in expired {
        let kind = error.kind();
        shared.stats.record_failure(kind);
        warn!(kind = %kind, error = %error, "Timer expired");
        queue.report(kind, error.to_string());
    }
}
