// ============================================
// File: crates/bondlink-node/src/connection.rs
// ============================================
//! # Connection
//!
//! ## Creation Reason
//! Owns everything one peer link needs at runtime and manages its
//! lifecycle: the controller behind a lock, the transport, the two
//! pipeline tasks and the shutdown signal.
//!
//! ## Main Functionality
//! - `Connection::start`: build the controller, spawn receiver and
//!   dispatcher
//! - Outbound operations: pairing, data, tickets, transactions, status
//!   check, error reports
//! - `Connection::shutdown`: ordered teardown
//!
//! ## Lifecycle
//! ```text
//! start ──► pair ──► send / transaction / status_check ... ──► shutdown
//!                                                              │
//!   stop signal ─► join tasks ─► drain queue ─► zero keys ◄────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The controller lock is held across transmit so the sequence number
//!   and history advance together with the send
//! - Send failures are returned to the caller and never retried
//!
//! ## Last Modified
//! v0.1.0 - Initial connection runtime

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bondlink_common::DeviceId;
use bondlink_core::{
    FailureKind, Footer, LinkController, MessageType, PairingStatus, PreparedFrame,
    TransactionStatus,
};
use bondlink_transport::LinkTransport;

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::events::EventHandler;
use crate::pipeline::{dispatcher, receiver, EventQueue, PipelineSettings};
use crate::stats::{ConnectionStats, StatsSnapshot};

/// How long shutdown waits for each task.
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================
// Shared
// ============================================

/// State shared by the connection handle and its tasks.
pub(crate) struct Shared {
    pub(crate) controller: Mutex<LinkController>,
    pub(crate) transport: Arc<dyn LinkTransport>,
    pub(crate) stats: Arc<ConnectionStats>,
    pub(crate) settings: Arc<PipelineSettings>,
    paired: watch::Sender<bool>,
}

impl Shared {
    /// Builds, transmits and commits one frame. Caller holds the lock.
    pub(crate) async fn send_locked(
        &self,
        controller: &mut LinkController,
        message_type: MessageType,
        payload: &[u8],
        footer: Option<&Footer>,
    ) -> Result<PreparedFrame> {
        let frame = controller.prepare(message_type, payload, footer)?;
        self.transmit_locked(controller, &frame).await?;
        Ok(frame)
    }

    /// Transmits a prepared frame and commits it once the transport took it.
    pub(crate) async fn transmit_locked(
        &self,
        controller: &mut LinkController,
        frame: &PreparedFrame,
    ) -> Result<()> {
        if let Err(e) = self.transport.transmit(&frame.bytes).await {
            self.stats.record_transmit_failure();
            return Err(e.into());
        }
        controller.commit_sent(frame, Instant::now());
        self.stats.record_tx(frame.bytes.len());
        Ok(())
    }

    /// Publishes the current pairing state to waiters.
    pub(crate) fn sync_paired(&self, controller: &LinkController) {
        let mutual = controller.pairing_status().is_mutual();
        self.paired.send_if_modified(|paired| {
            let changed = *paired != mutual;
            *paired = mutual;
            changed
        });
    }
}

// ============================================
// Connection
// ============================================

/// One running peer link.
///
/// # Lifecycle
/// 1. Create with `Connection::start(&config, transport, handler)`
/// 2. Pair (client) with `connection.pair().await`
/// 3. Exchange data
/// 4. Stop with `connection.shutdown().await`
pub struct Connection {
    shared: Arc<Shared>,
    local_device: DeviceId,
    shutdown_tx: broadcast::Sender<()>,
    closed: AtomicBool,
    tasks: SyncMutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl Connection {
    /// Validates `config`, builds the controller and spawns the pipeline.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid.
    pub fn start(
        config: &NodeConfig,
        transport: Arc<dyn LinkTransport>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self> {
        config.validate()?;
        let controller_config = config.controller_config();
        let local_device = controller_config.device_id;
        let controller = LinkController::new(controller_config)?;
        let settings = config.pipeline_settings()?;
        let stats = Arc::new(ConnectionStats::default());
        let (paired, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            controller: Mutex::new(controller),
            transport,
            stats: Arc::clone(&stats),
            settings: Arc::clone(&settings),
            paired,
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let (queue, queue_rx) = EventQueue::new(settings, Arc::clone(&stats));

        let receiver_task =
            receiver::spawn(Arc::clone(&shared), queue, shutdown_tx.subscribe());
        let dispatcher_task =
            dispatcher::spawn(queue_rx, handler, stats, shutdown_tx.subscribe());

        info!(
            device_id = %local_device,
            mode = ?config.node.mode,
            interface = %shared.transport.interface_handle(),
            "Connection started"
        );

        Ok(Self {
            shared,
            local_device,
            shutdown_tx,
            closed: AtomicBool::new(false),
            tasks: SyncMutex::new(vec![
                ("receiver", receiver_task),
                ("dispatcher", dispatcher_task),
            ]),
        })
    }

    // ========================================
    // Outbound
    // ========================================

    /// Starts the pairing handshake (client mode).
    ///
    /// # Errors
    /// `Pairing` on a server, or a transport error.
    pub async fn pair(&self) -> Result<()> {
        self.ensure_open()?;
        let mut controller = self.shared.controller.lock().await;
        let frame = controller.begin_pairing()?;
        self.shared.sync_paired(&controller);
        self.shared.transmit_locked(&mut controller, &frame).await?;
        debug!(device_id = %self.local_device, "Pairing started");
        Ok(())
    }

    /// Waits until pairing is mutually confirmed.
    ///
    /// # Errors
    /// `WaitTimeout` if pairing does not complete within `timeout`.
    pub async fn wait_paired(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.shared.paired.subscribe();
        let result = match tokio::time::timeout(timeout, rx.wait_for(|paired| *paired)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(NodeError::ShutDown),
            Err(_) => Err(NodeError::WaitTimeout { what: "pairing" }),
        };
        result
    }

    /// Sends one frame of `message_type`; returns its sequence number.
    ///
    /// # Errors
    /// Any controller check that refuses the frame, or a transport error.
    pub async fn send(
        &self,
        message_type: MessageType,
        payload: &[u8],
        footer: Option<&Footer>,
    ) -> Result<u32> {
        self.ensure_open()?;
        let mut controller = self.shared.controller.lock().await;
        let frame = self
            .shared
            .send_locked(&mut controller, message_type, payload, footer)
            .await?;
        Ok(frame.sequence)
    }

    /// Sends an encrypted Data frame.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_data(&self, payload: &[u8]) -> Result<u32> {
        self.send(MessageType::Data, payload, None).await
    }

    /// Sends an authentication ticket.
    ///
    /// # Errors
    /// See [`Connection::send`].
    pub async fn send_ticket(&self, ticket: &[u8]) -> Result<u32> {
        self.send(MessageType::Ticket, ticket, None).await
    }

    /// Opens a transaction.
    ///
    /// # Errors
    /// `Transaction` if one is already active, or see [`Connection::send`].
    pub async fn start_transaction(&self, payload: &[u8]) -> Result<u32> {
        self.send(MessageType::TransactionStart, payload, None).await
    }

    /// Sends one transaction chunk.
    ///
    /// # Errors
    /// `Transaction` if no transaction is active, or see [`Connection::send`].
    pub async fn send_transaction_data(&self, payload: &[u8], footer: &Footer) -> Result<u32> {
        self.send(MessageType::TransactionData, payload, Some(footer))
            .await
    }

    /// Asks the peer to close the transaction.
    ///
    /// # Errors
    /// `Transaction` if no transaction is active, or see [`Connection::send`].
    pub async fn stop_transaction(&self) -> Result<u32> {
        self.send(MessageType::TransactionStop, &[], None).await
    }

    /// Sends a status-check challenge.
    ///
    /// # Errors
    /// `StatusCheck` if the feature is disabled, or a transport error.
    pub async fn status_check(&self) -> Result<()> {
        self.ensure_open()?;
        let mut controller = self.shared.controller.lock().await;
        let frame = controller.begin_status_check(Instant::now())?;
        self.shared.transmit_locked(&mut controller, &frame).await
    }

    /// Reports `kind` to the peer in an Error frame.
    ///
    /// # Errors
    /// A transport error.
    pub async fn report_error(&self, kind: FailureKind) -> Result<()> {
        self.ensure_open()?;
        let mut controller = self.shared.controller.lock().await;
        let frame = controller.prepare_error(kind)?;
        self.shared.transmit_locked(&mut controller, &frame).await
    }

    // ========================================
    // State
    // ========================================

    /// Local device identifier.
    #[must_use]
    pub const fn local_device(&self) -> DeviceId {
        self.local_device
    }

    /// Bound peer, if any.
    pub async fn remote_device(&self) -> Option<DeviceId> {
        self.shared.controller.lock().await.remote_device()
    }

    /// Current pairing facets.
    pub async fn pairing_status(&self) -> PairingStatus {
        self.shared.controller.lock().await.pairing_status()
    }

    /// Current transaction status.
    pub async fn transaction_status(&self) -> TransactionStatus {
        self.shared.controller.lock().await.transaction_status()
    }

    /// Last ticket the peer sent.
    pub async fn ticket(&self) -> Option<Vec<u8>> {
        self.shared
            .controller
            .lock()
            .await
            .ticket()
            .map(<[u8]>::to_vec)
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    // ========================================
    // Shutdown
    // ========================================

    /// Stops both tasks, drains the queue and zeroes key material.
    ///
    /// Calling it again is a no-op.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for transports that close.
    pub async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(device_id = %self.local_device, "Shutting down connection...");
        let _ = self.shutdown_tx.send(());

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for (name, task) in tasks {
            match tokio::time::timeout(TASK_JOIN_TIMEOUT, task).await {
                Ok(Ok(())) => debug!("Task '{}' completed", name),
                Ok(Err(e)) => warn!("Task '{}' failed: {}", name, e),
                Err(_) => warn!("Task '{}' timed out during shutdown", name),
            }
        }

        {
            let mut controller = self.shared.controller.lock().await;
            controller.teardown();
            self.shared.sync_paired(&controller);
        }
        self.shared.transport.clear_receive_queue();

        let stats = self.shared.stats.snapshot();
        info!(
            device_id = %self.local_device,
            frames_rx = stats.frames_rx,
            frames_tx = stats.frames_tx,
            failures = stats.total_failures(),
            queue_drops = stats.queue_drops,
            "Connection closed"
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(NodeError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("local_device", &self.local_device)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
