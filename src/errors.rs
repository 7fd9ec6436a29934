use thiserror::Error;

/// Failure taxonomy for the live tracking client. Transport failures feed
/// the reconnect loop and are surfaced only through the connectivity flag;
/// protocol failures are logged and dropped; query failures leave cached
/// state untouched; command failures are the caller's to handle.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("protocol violation: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("query to {url} failed: {reason}")]
    Query { url: String, reason: String },
    #[error("command {url} rejected: {reason}")]
    Command { url: String, reason: String },
}

impl TrackingError {
    pub fn query(url: &str, reason: impl ToString) -> Self {
        TrackingError::Query {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn command(url: &str, reason: impl ToString) -> Self {
        TrackingError::Command {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
