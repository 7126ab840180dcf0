//! Error taxonomy for the ingestion pipeline and the service client.
//!
//! File-level and chunk-level failures are values recorded in the
//! [`IngestReport`](crate::ingest::IngestReport); none of them escape the
//! orchestrator loop. Commands wrap everything else in `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

/// A failed call to the service.
///
/// `status_code` is `None` when the request never produced an HTTP response
/// (connection refused, timeout, TLS failure).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", describe_remote(.status_code, .message))]
pub struct RemoteError {
    pub status_code: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// Transport-level failure with no HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

fn describe_remote(status_code: &Option<u16>, message: &str) -> String {
    match status_code {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("request failed: {}", message),
    }
}

/// Why a single input file did not make it into the run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing path, not a regular file, or unsupported content type.
    #[error("skipped {}: {reason}", .path.display())]
    SkippedFile { path: PathBuf, reason: String },

    /// The file could not be turned into records (empty identifier,
    /// unreadable text, malformed JSON).
    #[error("invalid payload in {}: {reason}", .path.display())]
    InvalidPayload { path: PathBuf, reason: String },

    /// A chunk failed mid-sequence; chunks after `chunk_index` were not sent.
    #[error("chunk {chunk_index} of '{identifier}' failed, remaining chunks not sent: {source}")]
    ChunkSubmissionAborted {
        identifier: String,
        chunk_index: usize,
        #[source]
        source: RemoteError,
    },
}

/// A payload that cannot become a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("identifier is empty")]
    EmptyIdentifier,
}

/// Identifier decoding failure.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("identifier is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded identifier is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
