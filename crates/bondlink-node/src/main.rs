// ============================================
// File: crates/bondlink-node/src/main.rs
// ============================================
//! # BondLink Node Entry Point
//!
//! ## Creation Reason
//! Operator binary: checks configuration files and demonstrates a full
//! link (pairing, data, transaction, status check) between two in-memory
//! endpoints.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Loopback demo over `MockLink`
//!
//! ## Usage
//! ```bash
//! bondlink-node validate --config config/bondlink.toml
//! bondlink-node loopback --config config/bondlink.toml --messages 5
//! bondlink-node print-config > bondlink.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides the configured log level
//! - Loopback treats the loaded file as the client side and mirrors it
//!   for the server side
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bondlink_common::LinkAddress;
use bondlink_core::{Footer, OperatingMode};
use bondlink_node::{Connection, LoggingEventHandler, NodeConfig};
use bondlink_transport::MockLink;

/// How long the demo waits for pairing to complete.
const PAIRING_WAIT: Duration = Duration::from_secs(2);

/// Grace period for the last answers to cross the link.
const SETTLE_TIME: Duration = Duration::from_millis(200);

// ============================================
// CLI Definition
// ============================================

/// BondLink secure point-to-point messaging node
#[derive(Parser, Debug)]
#[command(name = "bondlink-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/bondlink.toml")]
        config: PathBuf,
    },

    /// Pair two in-memory endpoints and exchange traffic
    Loopback {
        /// Path to configuration file (defaults are used if missing)
        #[arg(short, long, default_value = "config/bondlink.toml")]
        config: PathBuf,

        /// Number of Data frames the client sends
        #[arg(short, long, default_value_t = 3)]
        messages: u32,
    },

    /// Print the default configuration as TOML
    PrintConfig,
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Loopback installs its own subscriber once the configured level is known.
    if !matches!(cli.command, Commands::Loopback { .. }) {
        init_logging("info");
    }

    let result = match cli.command {
        Commands::Validate { config } => cmd_validate(&config).await,
        Commands::Loopback { config, messages } => cmd_loopback(&config, messages).await,
        Commands::PrintConfig => {
            print!("{}", NodeConfig::default().to_toml());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Validates configuration file.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    let config = NodeConfig::load(config_path).await?;
    let pipeline = config.pipeline_settings()?;

    println!("✅ Configuration is valid");
    println!();
    println!("Node:");
    println!("   Mode:             {:?}", config.node.mode);
    println!("   Device ID:        {}", config.node.device_id);
    if let Some(peer) = config.node.peer_device_id {
        println!("   Peer Device ID:   {peer}");
    }
    println!("   Max Message:      {} bytes", config.node.max_message_size);
    println!("   Pairing Required: {}", config.node.pairing_required);
    println!("   Status Check:     {}", config.node.status_check);
    println!();
    println!("Pipeline:");
    println!("   Queue:            {} ({:?})", pipeline.queue_capacity, pipeline.overflow);
    println!("   Enqueue:          {}", pipeline.enqueue.names().join(", "));
    println!("   Receive Timeout:  {:?}", pipeline.receive_timeout);
    println!();
    println!("Timeouts:");
    println!("   Transaction:      {}ms", config.timeouts.transaction_ms);
    println!("   Status Check:     {}ms", config.timeouts.status_check_ms);
    println!();

    Ok(())
}

/// Runs a client and a server over an in-memory link.
async fn cmd_loopback(config_path: &Path, messages: u32) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;
    init_logging(&config.logging.level);

    let client_config = match config.node.mode {
        OperatingMode::Client => config,
        OperatingMode::Server => config.mirrored(),
        OperatingMode::Uninitialized => bail!("node.mode must be client or server"),
    };
    let server_config = client_config.mirrored();

    let (client_link, server_link) = MockLink::pair(
        link_address(client_config.node.device_id),
        link_address(server_config.node.device_id),
    );

    let client = Connection::start(
        &client_config,
        Arc::new(client_link),
        Arc::new(LoggingEventHandler::new("client")),
    )?;
    let server = Connection::start(
        &server_config,
        Arc::new(server_link),
        Arc::new(LoggingEventHandler::new("server")),
    )?;

    client.pair().await?;
    client.wait_paired(PAIRING_WAIT).await?;
    server.wait_paired(PAIRING_WAIT).await?;
    info!("Link paired");

    for i in 1..=messages {
        let seq = client.send_data(format!("hello #{i}").as_bytes()).await?;
        info!(seq, "Data sent");
    }
    server.send_ticket(b"demo-ticket").await?;

    if client_config.node.status_check {
        client.status_check().await?;
    }

    let chunk = b"transaction payload";
    client.start_transaction(b"begin").await?;
    client
        .send_transaction_data(chunk, &Footer::last(0, u32::try_from(chunk.len())?))
        .await?;
    client.stop_transaction().await?;

    tokio::time::sleep(SETTLE_TIME).await;
    info!(status = ?client.transaction_status().await, "Transaction finished");

    client.shutdown().await?;
    server.shutdown().await?;

    let report = serde_json::json!({
        "client": client.stats(),
        "server": server.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config or returns default when the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<NodeConfig> {
    if path.exists() {
        Ok(NodeConfig::load(path).await?)
    } else {
        info!("Config file not found, using defaults");
        Ok(NodeConfig::default())
    }
}

/// Locally administered link address derived from a device id.
fn link_address(device_id: u64) -> LinkAddress {
    let id = device_id.to_le_bytes();
    LinkAddress::new([0x02, 0x00, id[3], id[2], id[1], id[0]])
}
