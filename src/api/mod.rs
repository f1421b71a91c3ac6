use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Stats;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend returned {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub processing_stats: Stats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEmail {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "low".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyRequest {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub message_id: String,
    pub priority: String,
}

/// Outcome of a manual reply. `confirmed` is false when the backend never
/// answered (client-side timeout): the send may well have completed
/// server-side, so it is reported as a qualified success rather than a hard
/// failure that would invite a duplicate send.
#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub success: bool,
    pub confirmed: bool,
    pub message: String,
}

#[derive(Deserialize)]
struct ReplyResponseBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetOutcome {
    #[serde(default)]
    pub message: String,
}

/// Blocking client for the agent's query API. Every call returns an explicit
/// result; fallback values belong to the caller, not in here.
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url: String = base_url.into();
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn get_status(&self) -> Result<AgentStatus, BackendError> {
        self.get("/status")
    }

    pub fn get_stats(&self) -> Result<StatsResponse, BackendError> {
        self.get("/stats")
    }

    pub fn get_manual_review_emails(&self) -> Result<Vec<ReviewEmail>, BackendError> {
        self.get("/manual-review-emails")
    }

    pub fn send_manual_reply(&self, reply: &ReplyRequest) -> Result<ReplyOutcome, BackendError> {
        let url = format!("{}/send-manual-reply", self.base_url);
        let response = match self.http.post(&url).json(reply).send() {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(ReplyOutcome {
                    success: true,
                    confirmed: false,
                    message: "timed out waiting for confirmation; the reply was likely sent"
                        .to_string(),
                });
            }
            Err(e) => return Err(BackendError::Request { url, source: e }),
        };
        let body: ReplyResponseBody = Self::decode(url, response)?;
        Ok(ReplyOutcome {
            success: body.success,
            confirmed: true,
            message: body.message,
        })
    }

    pub fn reset_processed(&self) -> Result<ResetOutcome, BackendError> {
        let url = format!("{}/reset-processed", self.base_url);
        let response = self
            .http
            .delete(&url)
            .send()
            .map_err(|e| BackendError::Request {
                url: url.clone(),
                source: e,
            })?;
        Self::decode(url, response)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| BackendError::Request {
                url: url.clone(),
                source: e,
            })?;
        Self::decode(url, response)
    }

    fn decode<T: DeserializeOwned>(url: String, response: Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status { url, status });
        }
        response.json().map_err(|e| BackendError::Decode { url, source: e })
    }
}
