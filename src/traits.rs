//! The seam between the ingestion pipeline and the service.
//!
//! The pipeline decides what to submit and in which groups; a
//! [`SubmissionPort`] decides how. [`ParaClient`](crate::client::ParaClient)
//! is the HTTP implementation; tests plug in in-memory ports.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use para_cli::error::RemoteError;
//! use para_cli::models::{Record, SubmittedRecord};
//! use para_cli::traits::SubmissionPort;
//!
//! struct DryRun;
//!
//! #[async_trait]
//! impl SubmissionPort for DryRun {
//!     async fn submit_batch(&self, records: &[Record]) -> Result<Vec<SubmittedRecord>, RemoteError> {
//!         Ok(records.iter().map(|r| serde_json::to_value(r).unwrap()).collect())
//!     }
//!
//!     async fn submit_single(&self, record: &Record) -> Result<SubmittedRecord, RemoteError> {
//!         Ok(serde_json::to_value(record).unwrap())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{Record, SubmittedRecord};

/// Where ingested records go.
///
/// Timeouts and retries are the implementation's business; the pipeline
/// treats every `Err` as final for that batch or chunk.
#[async_trait]
pub trait SubmissionPort: Send + Sync {
    /// Store all `records` in one call.
    async fn submit_batch(&self, records: &[Record])
        -> Result<Vec<SubmittedRecord>, RemoteError>;

    /// Store a single record.
    async fn submit_single(&self, record: &Record) -> Result<SubmittedRecord, RemoteError>;
}
