use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::event::RawEvent;

/// The recent-events feed keeps at most this many entries, newest first.
pub const RECENT_EVENTS_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Maps the status text carried by a `connection_status` event. Anything
    /// that is not "Connected" or a "Connecting..." variant counts as down.
    pub fn from_status(status: &str) -> Self {
        if status == "Connected" {
            Self::Connected
        } else if status.starts_with("Connecting") {
            Self::Connecting
        } else {
            Self::Disconnected
        }
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub successful_replies: u64,
    #[serde(default)]
    pub manual_reviews: u64,
    #[serde(default)]
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedEmailRecord {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub ai_response: Option<String>,
}

/// Side-channel outcome of folding an `email_processed` event; the driver
/// surfaces these as desktop toasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ReplySent { email: String },
    ManualReview { email: String },
    ProcessingError { email: String },
}

/// The reducer-maintained view of everything the dashboard observes. Owned
/// and written by the polling driver only; the listener never touches it.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub connection: ConnectionState,
    pub is_processing: bool,
    pub stats: Stats,
    /// Most recent processed-email events, newest first, capped.
    pub recent_events: Vec<RawEvent>,
    /// Latest record per message id, last write wins. Unbounded for the
    /// session; the process is short-lived.
    pub processed: HashMap<String, ProcessedEmailRecord>,
    pub last_status: Option<Value>,
    pub last_update: Option<DateTime<Utc>>,
}
