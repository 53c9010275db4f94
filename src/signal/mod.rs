//! Start signal exchange between the two nodes
//!
//! The start node sends one wall-clock timestamp as decimal text over a fresh
//! TCP connection; the finish node accepts exactly one connection per attempt,
//! reads the value and closes both the connection and the listener.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Result, TimingError};

mod receiver;
mod sender;

pub use receiver::{MAX_PAYLOAD_BYTES, StartSignalListener, TcpStartSignal};
pub use sender::send_start_timestamp;

/// Source of the start timestamp for one attempt.
///
/// Each call serves a single attempt. Implementations must not carry a
/// connection or buffered value over from a previous call.
#[async_trait]
pub trait StartSignalSource: Send + Sync + 'static {
    /// Wait for the start timestamp.
    ///
    /// Returns:
    /// - `Ok(Some(timestamp))` - start received
    /// - `Ok(None)` - `cancel` was signalled before a value arrived
    /// - `Err(e)` - nothing usable arrived (closed early, bad payload, bind failure)
    async fn receive_start(&self, cancel: &CancellationToken) -> Result<Option<f64>>;
}

/// Parse a start payload: a decimal number, surrounding whitespace ignored.
pub fn parse_timestamp(payload: &str) -> Result<f64> {
    let text = payload.trim();
    if text.is_empty() {
        return Err(TimingError::start_signal("empty start payload"));
    }
    let value: f64 = text.parse().map_err(|e| {
        TimingError::start_signal_with_source(format!("invalid start payload {:?}", text), Box::new(e))
    })?;
    if !value.is_finite() {
        return Err(TimingError::start_signal(format!("start timestamp {} is not finite", text)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_text() {
        assert_eq!(parse_timestamp("100.000").unwrap(), 100.0);
        assert_eq!(parse_timestamp(" 1718000000.25\n").unwrap(), 1_718_000_000.25);
    }

    #[test]
    fn rejects_garbage() {
        for payload in ["", "   ", "abc", "1,5", "inf", "NaN"] {
            assert!(
                matches!(parse_timestamp(payload), Err(TimingError::StartSignal { .. })),
                "payload {:?} should be rejected",
                payload
            );
        }
    }
}
