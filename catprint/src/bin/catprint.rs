//! # catprint CLI
//!
//! ## Usage
//!
//! ```bash
//! # List printers in range
//! catprint scan
//!
//! # Feed 120 blank lines on the first GB01/GB02/GB03/GT01 found
//! catprint feed 120
//!
//! # Only accept a GB02, wait up to 5 seconds
//! catprint feed 120 --name GB02 --timeout 5
//!
//! # Show the frames without touching the radio
//! catprint feed 300 --dry-run
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use catprint::{DeviceFilter, Error, SessionConfig, SessionManager, Transport};
use catprint_core::constants::{DEFAULT_SCAN_TIMEOUT, MAX_WRITE_LEN, PRINTER_NAMES};
use catprint_core::{blank_feed, build_uuid, encode_all};

/// catprint - Bluetooth LE thermal printer utility
#[derive(Parser, Debug)]
#[command(name = "catprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log lifecycle details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct DiscoveryArgs {
    /// Accept printers advertising this name (repeatable)
    #[arg(long = "name", value_name = "NAME", env = "CATPRINT_NAMES", value_delimiter = ',')]
    names: Vec<String>,

    /// Accept printers advertising this service, e.g. af30 (repeatable)
    #[arg(long = "service", value_name = "ID")]
    services: Vec<String>,

    /// Seconds to wait for a matching printer
    #[arg(long, value_name = "SECS", env = "CATPRINT_TIMEOUT", default_value_t = DEFAULT_SCAN_TIMEOUT)]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Advance blank paper
    Feed {
        /// Number of lines
        lines: u32,

        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Connection attempts before giving up
        #[arg(long, default_value_t = 1)]
        connect_attempts: u32,

        /// Pause between frames in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 0)]
        write_delay_ms: u64,

        /// Largest single Bluetooth write in bytes
        #[arg(long, value_name = "BYTES", default_value_t = MAX_WRITE_LEN)]
        max_write_len: usize,

        /// Print the encoded frames instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// List printers in range
    Scan {
        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
}

impl DiscoveryArgs {
    fn config(&self) -> anyhow::Result<SessionConfig> {
        let services = self
            .services
            .iter()
            .map(|s| build_uuid(s).with_context(|| format!("invalid service id '{}'", s)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut filter = DeviceFilter::by_names(self.names.iter().map(|n| n.trim().to_string()));
        filter.services = services;
        if filter.names.is_empty() && filter.services.is_empty() {
            filter = DeviceFilter::by_names(PRINTER_NAMES);
        }

        Ok(SessionConfig::default()
            .with_filter(filter)
            .with_scan_timeout(Duration::from_secs(self.timeout)))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<Error>() {
        Some(Error::DiscoveryTimeout { .. } | Error::ScanEnded) => 2,
        Some(Error::ConnectFailed { .. }) => 3,
        Some(Error::EndpointNotFound { .. }) => 4,
        Some(Error::TransmitFailed { .. }) => 5,
        _ => 1,
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Feed {
            lines,
            discovery,
            connect_attempts,
            write_delay_ms,
            max_write_len,
            dry_run,
        } => {
            if dry_run {
                return dump_frames(lines);
            }

            let config = discovery
                .config()?
                .with_connect_attempts(connect_attempts)
                .with_write_delay(Duration::from_millis(write_delay_ms))
                .with_max_write_len(max_write_len);
            let manager = SessionManager::new(open_transport().await?).with_config(config);

            let outcome = manager.feed(lines).await;
            if let Some(e) = &outcome.disconnect {
                warn!(error = %e, "Printer did not disconnect cleanly");
            }

            let device = outcome.device.clone();
            let report = outcome.result?;
            println!(
                "Fed {} lines on {} ({} frames, {} bytes)",
                lines,
                device.map(|d| d.to_string()).unwrap_or_default(),
                report.frames_written,
                report.bytes_written
            );
            Ok(())
        }
        Commands::Scan { discovery } => {
            let manager = SessionManager::new(open_transport().await?).with_config(discovery.config()?);

            let found = manager.survey().await?;
            if found.is_empty() {
                println!("No printers found");
            }
            for device in found {
                println!("{}", device);
            }
            Ok(())
        }
    }
}

fn dump_frames(lines: u32) -> anyhow::Result<()> {
    for frame in encode_all(&blank_feed(lines))? {
        println!("{}", hex::encode(frame.as_bytes()));
    }
    Ok(())
}

#[cfg(feature = "ble")]
async fn open_transport() -> anyhow::Result<Arc<dyn Transport>> {
    let transport = catprint::BleTransport::new()
        .await
        .context("failed to open Bluetooth adapter")?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "ble"))]
async fn open_transport() -> anyhow::Result<Arc<dyn Transport>> {
    anyhow::bail!("built without Bluetooth support; rebuild with `--features ble` or use --dry-run")
}
