use reqwest::StatusCode;
use std::fmt;

/// Process exit code for usage and configuration errors
pub const EXIT_USAGE: u8 = 1;
pub const EXIT_TRANSPORT: u8 = 2;
pub const EXIT_RESPONSE: u8 = 3;
pub const EXIT_PROCESSING: u8 = 4;

/// Coarse failure classification, one per distinct exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    Transport,
    Response,
    Processing,
}

/// Error type for a single fetch-and-interpret step
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be built (malformed URL, bad header).
    InvalidRequest(String),
    /// No response was received: DNS failure, refused connection, timeout.
    Transport { url: String, source: reqwest::Error },
    /// A response arrived but its status is not 2xx.
    Response {
        url: String,
        status: StatusCode,
        body: String,
    },
    /// The body could not be interpreted the way the caller expected.
    Processing(String),
    /// Reading or writing a cached page failed.
    Cache(std::io::Error),
}

/// Longest response body excerpt kept in a `FetchError::Response`
const BODY_EXCERPT_LEN: usize = 200;

impl FetchError {
    pub fn response(url: &str, status: StatusCode, body: &str) -> Self {
        let body = match body.char_indices().nth(BODY_EXCERPT_LEN) {
            Some((idx, _)) => format!("{}...", &body[..idx]),
            None => body.to_string(),
        };
        FetchError::Response {
            url: url.to_string(),
            status,
            body,
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        FetchError::Processing(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidRequest(_) => FailureKind::InvalidRequest,
            FetchError::Transport { .. } => FailureKind::Transport,
            FetchError::Response { .. } => FailureKind::Response,
            // A broken page cache is a local processing problem, not a network one
            FetchError::Processing(_) | FetchError::Cache(_) => FailureKind::Processing,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            FailureKind::InvalidRequest => EXIT_USAGE,
            FailureKind::Transport => EXIT_TRANSPORT,
            FailureKind::Response => EXIT_RESPONSE,
            FailureKind::Processing => EXIT_PROCESSING,
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Cache(err)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            FetchError::Transport { url, source } => {
                if source.is_timeout() {
                    write!(f, "Transport error: request to {} timed out", url)
                } else if source.is_connect() {
                    write!(f, "Transport error: could not connect to {}", url)
                } else {
                    write!(f, "Transport error: request to {} failed: {}", url, source)
                }
            }
            FetchError::Response { url, status, body } => {
                write!(f, "Response error: HTTP {} from {}", status, url)?;
                if !body.is_empty() {
                    write!(f, ": {}", body)?;
                }
                Ok(())
            }
            FetchError::Processing(msg) => write!(f, "Processing error: {}", msg),
            FetchError::Cache(err) => write!(f, "Page cache error: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport { source, .. } => Some(source),
            FetchError::Cache(err) => Some(err),
            FetchError::InvalidRequest(_)
            | FetchError::Response { .. }
            | FetchError::Processing(_) => None,
        }
    }
}
