//! # catprint
//!
//! Driver for GB01/GB02/GB03 Bluetooth LE thermal "cat" printers.
//!
//! ## Features
//!
//! - Frame codec for the printer's command set
//! - Session lifecycle with validated state transitions
//! - Async/await API using Tokio
//! - Pluggable transport (in-memory, or Bluetooth LE with the `ble` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use catprint::{MemoryTransport, SessionManager, VirtualPeripheral};
//!
//! #[tokio::main]
//! async fn main() -> catprint::Result<()> {
//!     let transport = MemoryTransport::new()
//!         .with_peripheral(VirtualPeripheral::printer("AA:BB:CC:DD:EE:01", "GB01"));
//!     let manager = SessionManager::new(Arc::new(transport));
//!
//!     // Scan, connect, feed 120 blank lines, disconnect
//!     let outcome = manager.feed(120).await;
//!     println!("final state: {}", outcome.state);
//!
//!     outcome.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod session;

// Re-exports
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use manager::{SessionManager, SessionOutcome};
pub use session::{Endpoints, Session, TransmitReport};

// Re-export types
pub use catprint_core::{Frame, LogicalCommand, Opcode, SessionState, SessionStatus};
pub use catprint_transport::{MemoryTransport, Transport, VirtualPeripheral};
pub use catprint_types::{DeviceFilter, DeviceIdentity};

#[cfg(feature = "ble")]
pub use catprint_transport::BleTransport;
