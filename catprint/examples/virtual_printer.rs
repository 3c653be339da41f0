//! Feed paper on a virtual printer and watch the session lifecycle

use std::sync::Arc;
use std::time::Duration;

use catprint::{
    LogicalCommand, MemoryTransport, SessionConfig, SessionManager, SessionStatus,
    VirtualPeripheral,
};
use catprint_core::constants::{energy, FeedRate, Lattice};

#[tokio::main]
async fn main() -> catprint::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // A GB02 that shows up two seconds into the scan
    let transport = Arc::new(MemoryTransport::new().with_peripheral(
        VirtualPeripheral::printer("AA:BB:CC:DD:EE:02", "GB02")
            .advertising_after(Duration::from_secs(2)),
    ));

    let manager = SessionManager::new(Arc::clone(&transport)).with_config(
        SessionConfig::default().with_write_delay(Duration::from_millis(10)),
    );

    let status = SessionStatus::new();
    let mut session = manager.open_with(status.clone()).await?;
    println!("✓ Connected to {}", session.identity());

    let report = session
        .send(&[
            LogicalCommand::SetEnergy(energy::MEDIUM),
            LogicalCommand::Lattice(Lattice::Start),
            LogicalCommand::SetFeedRate(FeedRate::Blank),
            LogicalCommand::FeedLines(300),
            LogicalCommand::Lattice(Lattice::Finish),
        ])
        .await?;
    println!(
        "✓ Sent {} frames ({} bytes)",
        report.frames_written, report.bytes_written
    );

    session.close().await?;
    println!("✓ Disconnected");

    for frame in transport.writes() {
        println!("  {}", hex::encode(&frame));
    }
    println!("States: {:?}", status.history());

    Ok(())
}
