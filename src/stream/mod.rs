pub mod ws;

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("connect failed: {0}")]
pub struct ConnectError(pub String);

#[derive(Debug, Error)]
pub enum ReceiveError {
    /// No data within the timeout window; the connection is still healthy.
    #[error("receive timed out")]
    Timeout,
    #[error("connection lost: {0}")]
    Closed(String),
}

/// One logical push-event transport. Each `connect` opens and holds a single
/// network resource until the returned connection is closed or dropped.
pub trait EventSource: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Connection + Send>, ConnectError>;
}

pub trait Connection {
    /// Blocks for at most `timeout` waiting for the next inbound message.
    fn receive(&mut self, timeout: Duration) -> Result<String, ReceiveError>;

    /// Outbound control reply (keepalive acknowledgement).
    fn send(&mut self, text: &str) -> Result<(), ReceiveError>;

    fn close(&mut self);
}
