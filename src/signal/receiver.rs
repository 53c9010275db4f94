//! Finish-side listener for the start timestamp

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{StartSignalSource, parse_timestamp};
use crate::{Result, TimingError};

/// Largest start payload read from the connection.
pub const MAX_PAYLOAD_BYTES: u64 = 1024;

/// A bound, single-use start endpoint.
///
/// Receiving consumes the listener, so the socket is closed as soon as one
/// value has been read (or the wait was cancelled).
#[derive(Debug)]
pub struct StartSignalListener {
    listener: TcpListener,
}

impl StartSignalListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            TimingError::start_signal_with_source(format!("cannot listen on {}", addr), Box::new(e))
        })?;
        debug!("Start listener bound on {}", addr);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the first connection and read one timestamp from it.
    pub async fn receive(self, cancel: &CancellationToken) -> Result<Option<f64>> {
        let (stream, peer) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Start listener cancelled before a connection arrived");
                return Ok(None);
            }
            accepted = self.listener.accept() => accepted.map_err(|e| {
                TimingError::start_signal_with_source("accept failed", Box::new(e))
            })?,
        };
        // Only one connection per attempt
        drop(self.listener);
        debug!("Start node connected from {}", peer);

        let mut reader = BufReader::new(stream.take(MAX_PAYLOAD_BYTES));
        let mut payload = String::new();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Start read cancelled");
                return Ok(None);
            }
            read = reader.read_line(&mut payload) => read.map_err(|e| {
                TimingError::start_signal_with_source("failed to read start payload", Box::new(e))
            })?,
        };

        if read == 0 {
            return Err(TimingError::start_signal(format!(
                "connection from {} closed without data",
                peer
            )));
        }

        let timestamp = parse_timestamp(&payload)?;
        info!(%peer, timestamp, "Start timestamp received");
        Ok(Some(timestamp))
    }
}

/// Start signal over TCP, binding a fresh listener for every attempt.
#[derive(Debug, Clone)]
pub struct TcpStartSignal {
    addr: SocketAddr,
}

impl TcpStartSignal {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl StartSignalSource for TcpStartSignal {
    async fn receive_start(&self, cancel: &CancellationToken) -> Result<Option<f64>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        StartSignalListener::bind(self.addr).await?.receive(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::send_start_timestamp;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn bound() -> (StartSignalListener, SocketAddr) {
        let listener = StartSignalListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn reads_one_timestamp() {
        let (listener, addr) = bound().await;
        let cancel = CancellationToken::new();
        let client = tokio::spawn(async move { send_start_timestamp(addr, 100.0).await });

        let timestamp = listener.receive(&cancel).await.unwrap();
        client.await.unwrap().unwrap();
        assert_eq!(timestamp, Some(100.0));
    }

    #[tokio::test]
    async fn accepts_payload_without_newline() {
        let (listener, addr) = bound().await;
        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"100.000").await.unwrap();
            stream.shutdown().await.unwrap();
        });
        assert_eq!(listener.receive(&CancellationToken::new()).await.unwrap(), Some(100.0));
    }

    #[tokio::test]
    async fn empty_connection_is_an_error() {
        let (listener, addr) = bound().await;
        tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            drop(stream);
        });
        let result = listener.receive(&CancellationToken::new()).await;
        assert!(matches!(result, Err(TimingError::StartSignal { .. })));
    }

    #[tokio::test]
    async fn garbage_payload_is_an_error() {
        let (listener, addr) = bound().await;
        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"not a time\n").await.unwrap();
        });
        let result = listener.receive(&CancellationToken::new()).await;
        assert!(matches!(result, Err(TimingError::StartSignal { .. })));
    }

    #[tokio::test]
    async fn cancel_before_connection() {
        let (listener, _) = bound().await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        assert_eq!(listener.receive(&cancel).await.unwrap(), None);
    }

    #[tokio::test]
    async fn endpoint_is_closed_after_one_attempt() {
        let (listener, addr) = bound().await;
        let client = tokio::spawn(async move { send_start_timestamp(addr, 5.5).await });
        assert_eq!(listener.receive(&CancellationToken::new()).await.unwrap(), Some(5.5));
        client.await.unwrap().unwrap();

        // Nobody listens any more: a late start node must not be accepted.
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
