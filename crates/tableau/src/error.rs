// crates/tableau/src/error.rs
use std::fmt;

use thiserror::Error;

use crate::transport::RawResponse;
use crate::wire::ErrorDocument;

/// Which bounded loop gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// Starting an extract refresh while another one holds the workbook.
    Refresh,
    /// Waiting for a job to reach a terminal state.
    Poll,
}

impl fmt::Display for RetryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RetryPhase::Refresh => "extract refresh",
            RetryPhase::Poll => "job status poll",
        })
    }
}

/// Errors raised by the Tableau REST client
#[derive(Debug, Error)]
pub enum TableauError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not signed in to a Tableau server")]
    NotSignedIn,

    /// Another refresh already runs for the workbook (403/409). Retryable.
    #[error("Refresh already in progress (HTTP {status})")]
    Conflict { status: u16, body: String },

    #[error("Tableau returned HTTP {status}: {}", summarize(.code, .detail, .body))]
    Service {
        status: u16,
        code: Option<String>,
        detail: Option<String>,
        body: String,
    },

    #[error("{phase}: max retries of {attempts} reached")]
    RetriesExhausted { phase: RetryPhase, attempts: u32 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

fn summarize(code: &Option<String>, detail: &Option<String>, body: &String) -> String {
    match (code, detail) {
        (Some(code), Some(detail)) => format!("{code}: {detail}"),
        (None, Some(detail)) => detail.clone(),
        _ => body.clone(),
    }
}

impl TableauError {
    /// Only a conflicting refresh is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableauError::Conflict { .. })
    }

    /// Build a `Service` error from a non-success response, pulling the
    /// error code and detail out of the body when it is a Tableau error document.
    pub fn service(response: &RawResponse) -> Self {
        let body = response.text().into_owned();
        let (code, detail) = match serde_json::from_slice::<ErrorDocument>(&response.body) {
            Ok(doc) => (doc.error.code, doc.error.detail.or(doc.error.summary)),
            Err(_) => (None, None),
        };
        TableauError::Service {
            status: response.status,
            code,
            detail,
            body,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        TableauError::MalformedResponse(message.into())
    }
}
