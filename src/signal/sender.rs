//! Start-side client

use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::{Result, TimingError};

/// Send one start timestamp to the finish node and close the connection.
pub async fn send_start_timestamp(addr: SocketAddr, timestamp: f64) -> Result<()> {
    let mut stream = TcpStream::connect(addr).await.map_err(|e| {
        TimingError::start_signal_with_source(format!("cannot reach finish node at {}", addr), Box::new(e))
    })?;
    let payload = format!("{:.6}\n", timestamp);
    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await?;
    debug!(%addr, timestamp, "Start timestamp sent");
    Ok(())
}
