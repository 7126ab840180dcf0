//! Ingestion pipeline orchestration.
//!
//! Walks the resolved file list in order: stat → classify → read → build
//! records. Text larger than the ceiling is split into chunks that are
//! submitted one at a time, stopping at the first failure. Everything else
//! is packed into size-bounded batches, which are all submitted after the
//! loop, concurrently and independently of each other.
//!
//! File-level and chunk-level failures are collected in the
//! [`IngestReport`]; they never abort the run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::batch::BatchPacker;
use crate::chunk::ChunkSplitter;
use crate::client::ParaClient;
use crate::config::Config;
use crate::error::{IngestError, RemoteError};
use crate::extract::{classify, detect_content_type, extract_html_metadata, ContentKind};
use crate::files::{canonical_cwd, relative_path, resolve_files};
use crate::models::Payload;
use crate::record::{sanitize_text, RecordBuilder};
use crate::traits::SubmissionPort;

/// Per-run options.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Identifier for the first file of the run.
    pub id: Option<String>,
    pub object_type: Option<String>,
    pub sanitize: bool,
    /// Identifiers are sent raw only when this is exactly `"false"`.
    pub encode_id: Option<String>,
    /// Base for relative-path identifiers.
    pub cwd: PathBuf,
    /// Maximum cumulative source bytes per batch, and the text size above
    /// which a file is chunked.
    pub ceiling: u64,
}

/// Result of one batch submission.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    /// Records sent in this batch.
    pub attempted: usize,
    pub source_size: u64,
    /// Number of records the service returned, or the failure.
    pub result: Result<usize, RemoteError>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of submitting the chunks of one oversized text file.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub path: PathBuf,
    pub identifier: String,
    /// Chunks the service accepted, in order.
    pub submitted: usize,
    /// Set when a chunk failed; later chunks were not attempted.
    pub error: Option<IngestError>,
}

/// Aggregated result of a run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Records attempted, batched or chunked.
    pub total_objects: usize,
    /// Source bytes of every file that produced records.
    pub total_size: u64,
    pub batches: Vec<BatchOutcome>,
    pub chunked: Vec<ChunkOutcome>,
    pub skipped: Vec<IngestError>,
    pub failed: Vec<IngestError>,
}

impl IngestReport {
    /// Submission calls issued (one per batch, one per attempted chunk).
    pub fn submissions(&self) -> usize {
        self.batches.len()
            + self
                .chunked
                .iter()
                .map(|c| c.submitted + usize::from(c.error.is_some()))
                .sum::<usize>()
    }

    pub fn failed_submissions(&self) -> usize {
        self.batches.iter().filter(|b| !b.succeeded()).count()
            + self.chunked.iter().filter(|c| c.error.is_some()).count()
    }

    /// True when at least one submission was made and none succeeded.
    pub fn all_submissions_failed(&self) -> bool {
        let total = self.submissions();
        total > 0 && self.failed_submissions() == total
    }
}

/// Run the pipeline over `files` in order, submitting through `port`.
pub async fn run_ingest(
    files: &[PathBuf],
    options: &IngestOptions,
    port: &dyn SubmissionPort,
) -> IngestReport {
    let mut run = Ingestion::new(options, port);

    for (position, path) in files.iter().enumerate() {
        match run.ingest_file(position, path).await {
            Ok(()) => {}
            Err(err @ IngestError::SkippedFile { .. }) => {
                warn!("{}", err);
                run.report.skipped.push(err);
            }
            Err(err) => {
                warn!("{}", err);
                run.report.failed.push(err);
            }
        }
    }

    run.finish().await
}

struct Ingestion<'a> {
    options: &'a IngestOptions,
    port: &'a dyn SubmissionPort,
    builder: RecordBuilder,
    packer: BatchPacker,
    report: IngestReport,
}

impl<'a> Ingestion<'a> {
    fn new(options: &'a IngestOptions, port: &'a dyn SubmissionPort) -> Self {
        Self {
            options,
            port,
            builder: RecordBuilder::new(
                options.object_type.as_deref(),
                options.encode_id.as_deref(),
            ),
            packer: BatchPacker::new(options.ceiling),
            report: IngestReport::default(),
        }
    }

    async fn ingest_file(&mut self, position: usize, path: &Path) -> Result<(), IngestError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| skipped(path, e.to_string()))?;
        if !metadata.is_file() {
            return Err(skipped(path, "not a regular file"));
        }
        let source_size = metadata.len();

        let content_type = detect_content_type(path);
        let kind = classify(&content_type);
        if let ContentKind::Unsupported(ref ct) = kind {
            return Err(skipped(
                path,
                format!("{} isn't JSON, HTML nor text", ct),
            ));
        }

        // Only the first file of a run may take the caller's identifier.
        let explicit_id = if position == 0 {
            self.options.id.as_deref().filter(|id| !id.is_empty())
        } else {
            None
        };
        let relative = relative_path(path, &self.options.cwd);

        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| invalid(path, format!("unreadable: {}", e)))?;

        let (payload, identifier) = match kind {
            ContentKind::Json => {
                let value: serde_json::Value = serde_json::from_str(&body)
                    .map_err(|e| invalid(path, format!("malformed JSON: {}", e)))?;
                let identifier = explicit_id.map(str::to_string).unwrap_or(relative);
                (Payload::from_json(value), identifier)
            }
            ContentKind::Html => {
                let doc = extract_html_metadata(&body);
                let identifier = explicit_id
                    .map(str::to_string)
                    .or_else(|| doc.url.clone().filter(|u| !u.is_empty()))
                    .unwrap_or(relative);
                (self.sanitized(Payload::Html(doc)), identifier)
            }
            _ => {
                let identifier = explicit_id.map(str::to_string).unwrap_or(relative);
                (self.sanitized(Payload::Text(body)), identifier)
            }
        };

        let text_len = payload.text().map_or(0, str::len) as u64;
        if text_len > self.options.ceiling {
            if identifier.is_empty() {
                return Err(invalid(path, "identifier is empty"));
            }
            self.report.total_size += source_size;
            info!("Creating {} in chunks ({} bytes)", identifier, text_len);
            self.submit_chunks(path, &payload, &identifier).await;
            return Ok(());
        }

        let records = self
            .builder
            .build(&payload, &identifier)
            .map_err(|e| invalid(path, e.to_string()))?;
        let count = records.len();
        let (batch, batch_size) = self.packer.add_all(records, source_size);
        self.report.total_objects += count;
        self.report.total_size += source_size;
        info!("Creating {}", identifier);
        debug!(batch, batch_size, records = count, "packed");
        Ok(())
    }

    fn sanitized(&self, payload: Payload) -> Payload {
        if !self.options.sanitize {
            return payload;
        }
        let clean = sanitize_text(payload.text().unwrap_or_default());
        payload.with_text(clean)
    }

    /// Submit chunks in order; the first failure ends the sequence.
    async fn submit_chunks(&mut self, path: &Path, payload: &Payload, identifier: &str) {
        let text = payload.text().unwrap_or_default();
        let mut outcome = ChunkOutcome {
            path: path.to_path_buf(),
            identifier: identifier.to_string(),
            submitted: 0,
            error: None,
        };

        for chunk in ChunkSplitter::new(text.as_bytes(), self.options.ceiling as usize) {
            let record = match self.builder.build_chunk(payload, identifier, &chunk) {
                Ok(record) => record,
                Err(e) => {
                    outcome.error = Some(invalid(path, e.to_string()));
                    break;
                }
            };
            self.report.total_objects += 1;

            match self.port.submit_single(&record).await {
                Ok(_) => {
                    outcome.submitted += 1;
                    info!(
                        "Created object chunk {} with size {} KB",
                        chunk.index,
                        (chunk.end - chunk.start).div_ceil(1024)
                    );
                }
                Err(source) => {
                    let err = IngestError::ChunkSubmissionAborted {
                        identifier: identifier.to_string(),
                        chunk_index: chunk.index,
                        source,
                    };
                    warn!("{}", err);
                    outcome.error = Some(err);
                    break;
                }
            }
        }

        self.report.chunked.push(outcome);
    }

    /// Submit every packed batch. All calls are issued together; each
    /// outcome is recorded on its own.
    async fn finish(self) -> IngestReport {
        let Ingestion {
            port,
            packer,
            mut report,
            ..
        } = self;

        let batches = packer.into_batches();
        let submissions = batches.iter().enumerate().map(|(index, batch)| async move {
            let result = port
                .submit_batch(&batch.records)
                .await
                .map(|stored| stored.len());
            if let Err(ref e) = result {
                warn!("Batch {} ({} objects) failed: {}", index, batch.len(), e);
            }
            BatchOutcome {
                index,
                attempted: batch.len(),
                source_size: batch.source_size,
                result,
            }
        });
        report.batches = join_all(submissions).await;
        report
    }
}

fn skipped(path: &Path, reason: impl Into<String>) -> IngestError {
    IngestError::SkippedFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> IngestError {
    IngestError::InvalidPayload {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Arguments of the `create` command.
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    pub pattern: Option<String>,
    pub id: Option<String>,
    pub object_type: Option<String>,
    pub sanitize: bool,
    pub encode_id: Option<String>,
    pub cwd: Option<PathBuf>,
    pub max_size: Option<u64>,
}

/// CLI entry point for `create`.
pub async fn run_create(config: &Config, args: CreateArgs) -> Result<()> {
    let Some(pattern) = args.pattern.as_deref().filter(|p| !p.is_empty()) else {
        bail!("No files specified.");
    };

    let cwd = canonical_cwd(args.cwd.as_deref())?;
    let files = resolve_files(pattern, &cwd)?;
    if files.is_empty() {
        bail!("No files specified.");
    }

    let options = IngestOptions {
        id: args.id,
        object_type: args.object_type,
        sanitize: args.sanitize,
        encode_id: args.encode_id,
        cwd,
        ceiling: args.max_size.unwrap_or(config.ingest.max_batch_size),
    };

    let client = ParaClient::new(config)?;
    let report = run_ingest(&files, &options, &client).await;

    for outcome in &report.batches {
        if let Err(ref e) = outcome.result {
            println!(
                "✖ Failed to create batch {} ({} objects): {}",
                outcome.index, outcome.attempted, e
            );
        }
    }
    for outcome in &report.chunked {
        if let Some(ref e) = outcome.error {
            println!("✖ {} ({} chunks created before the failure)", e, outcome.submitted);
        }
    }

    if report.all_submissions_failed() {
        bail!("Failed to create documents.");
    }

    println!(
        "✔ Created {} objects with total size of {} KB.",
        report.total_objects,
        report.total_size.div_ceil(1024)
    );
    if !report.skipped.is_empty() || !report.failed.is_empty() {
        println!(
            "  skipped: {}, failed: {}",
            report.skipped.len(),
            report.failed.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, SubmittedRecord};
    use crate::record::encode_id;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every call; fails batch and chunk calls by position.
    #[derive(Default)]
    struct RecordingPort {
        batches: Mutex<Vec<Vec<Record>>>,
        singles: Mutex<Vec<Record>>,
        fail_batches: Vec<usize>,
        fail_single_at: Option<usize>,
    }

    #[async_trait]
    impl SubmissionPort for RecordingPort {
        async fn submit_batch(
            &self,
            records: &[Record],
        ) -> Result<Vec<SubmittedRecord>, RemoteError> {
            let position = {
                let mut batches = self.batches.lock().unwrap();
                batches.push(records.to_vec());
                batches.len() - 1
            };
            if self.fail_batches.contains(&position) {
                return Err(RemoteError::new(Some(500), "batch rejected"));
            }
            Ok(records.iter().map(|r| serde_json::to_value(r).unwrap()).collect())
        }

        async fn submit_single(&self, record: &Record) -> Result<SubmittedRecord, RemoteError> {
            let position = {
                let mut singles = self.singles.lock().unwrap();
                singles.push(record.clone());
                singles.len()
            };
            if self.fail_single_at == Some(position) {
                return Err(RemoteError::new(Some(503), "unavailable"));
            }
            Ok(serde_json::to_value(record).unwrap())
        }
    }

    fn options(cwd: &Path, ceiling: u64) -> IngestOptions {
        IngestOptions {
            id: None,
            object_type: None,
            sanitize: false,
            encode_id: None,
            cwd: cwd.to_path_buf(),
            ceiling,
        }
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn unsupported_and_missing_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            write(tmp.path(), "image.png", "\u{0089}PNG"),
            tmp.path().join("missing.txt"),
            tmp.path().to_path_buf(),
            write(tmp.path(), "ok.txt", "hello"),
        ];
        let port = RecordingPort::default();
        let report = run_ingest(&files, &options(tmp.path(), 1000), &port).await;

        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.total_objects, 1);
        assert_eq!(report.total_size, 5);
        assert_eq!(port.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_file_takes_explicit_id() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            write(tmp.path(), "a.txt", "first"),
            write(tmp.path(), "b.txt", "second"),
        ];
        let mut opts = options(tmp.path(), 1000);
        opts.id = Some("custom".to_string());
        let port = RecordingPort::default();
        run_ingest(&files, &opts, &port).await;

        let batches = port.batches.lock().unwrap();
        let names: Vec<&str> = batches[0].iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["custom", "b.txt"]);
        assert_eq!(batches[0][0].id(), encode_id("custom"));
    }

    #[tokio::test]
    async fn html_url_becomes_identifier() {
        let tmp = TempDir::new().unwrap();
        let html = r#"<meta property="og:url" content="https://ex.com/page"><p>Body</p>"#;
        let files = vec![write(tmp.path(), "page.html", html)];
        let port = RecordingPort::default();
        run_ingest(&files, &options(tmp.path(), 1000), &port).await;

        let batches = port.batches.lock().unwrap();
        assert_eq!(batches[0][0].name(), "https://ex.com/page");
        assert_eq!(batches[0][0].fields()["text"].as_str().map(str::trim), Some("Body"));
    }

    #[tokio::test]
    async fn sanitize_strips_symbols() {
        let tmp = TempDir::new().unwrap();
        let files = vec![write(tmp.path(), "a.txt", "Hi!!  there, <b>you</b>")];
        let mut opts = options(tmp.path(), 1000);
        opts.sanitize = true;
        let port = RecordingPort::default();
        run_ingest(&files, &opts, &port).await;

        let batches = port.batches.lock().unwrap();
        assert_eq!(batches[0][0].fields()["text"], "Hi there b you b ");
    }

    #[tokio::test]
    async fn malformed_json_fails_only_that_file() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            write(tmp.path(), "bad.json", "{not json"),
            write(tmp.path(), "good.json", r#"[{"a": 1}, {"a": 2}]"#),
        ];
        let port = RecordingPort::default();
        let report = run_ingest(&files, &options(tmp.path(), 1000), &port).await;

        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], IngestError::InvalidPayload { .. }));
        assert_eq!(report.total_objects, 2);
        let batches = port.batches.lock().unwrap();
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0].iter().all(|r| r.name() == "good.json"));
    }

    #[tokio::test]
    async fn oversized_text_is_chunked_sequentially() {
        let tmp = TempDir::new().unwrap();
        let body = "word ".repeat(100); // 500 bytes
        let files = vec![write(tmp.path(), "big.txt", &body)];
        let port = RecordingPort::default();
        let report = run_ingest(&files, &options(tmp.path(), 120), &port).await;

        assert!(port.batches.lock().unwrap().is_empty());
        let singles = port.singles.lock().unwrap();
        assert!(singles.len() >= 5);
        for (i, record) in singles.iter().enumerate() {
            assert_eq!(record.chunk_index(), Some(i + 1));
            assert_eq!(record.name(), format!("big.txt_chunk{}", i + 1));
        }
        assert_eq!(report.chunked.len(), 1);
        assert_eq!(report.chunked[0].submitted, singles.len());
        assert_eq!(report.total_objects, singles.len());
        assert_eq!(report.total_size, 500);
    }

    #[tokio::test]
    async fn chunk_failure_stops_the_sequence() {
        let tmp = TempDir::new().unwrap();
        let body = "word ".repeat(100);
        let files = vec![
            write(tmp.path(), "big.txt", &body),
            write(tmp.path(), "small.txt", "tiny"),
        ];
        let port = RecordingPort {
            fail_single_at: Some(2),
            ..Default::default()
        };
        let report = run_ingest(&files, &options(tmp.path(), 120), &port).await;

        assert_eq!(port.singles.lock().unwrap().len(), 2);
        let outcome = &report.chunked[0];
        assert_eq!(outcome.submitted, 1);
        assert!(matches!(
            outcome.error,
            Some(IngestError::ChunkSubmissionAborted { chunk_index: 2, .. })
        ));
        // The next file is still processed.
        assert_eq!(port.batches.lock().unwrap().len(), 1);
        assert!(!report.all_submissions_failed());
    }

    #[tokio::test]
    async fn batch_failures_are_independent() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            write(tmp.path(), "a.json", &format!(r#"{{"pad": "{}"}}"#, "x".repeat(200))),
            write(tmp.path(), "b.json", &format!(r#"{{"pad": "{}"}}"#, "y".repeat(200))),
        ];
        let port = RecordingPort {
            fail_batches: vec![0],
            ..Default::default()
        };
        let report = run_ingest(&files, &options(tmp.path(), 300), &port).await;

        assert_eq!(report.batches.len(), 2);
        let first = report.batches.iter().find(|b| b.index == 0).unwrap();
        let second = report.batches.iter().find(|b| b.index == 1).unwrap();
        assert!(!first.succeeded());
        assert_eq!(second.result.as_ref().ok(), Some(&1));
        assert!(!report.all_submissions_failed());
    }

    #[tokio::test]
    async fn all_failed_is_reported() {
        let tmp = TempDir::new().unwrap();
        let files = vec![write(tmp.path(), "a.txt", "x")];
        let port = RecordingPort {
            fail_batches: vec![0],
            ..Default::default()
        };
        let report = run_ingest(&files, &options(tmp.path(), 300), &port).await;
        assert!(report.all_submissions_failed());
    }

    #[tokio::test]
    async fn oversized_json_gets_its_own_batch() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            write(tmp.path(), "small.txt", "tiny"),
            write(tmp.path(), "huge.json", &format!(r#"{{"pad": "{}"}}"#, "z".repeat(1000))),
            write(tmp.path(), "after.txt", "tail"),
        ];
        let port = RecordingPort::default();
        let report = run_ingest(&files, &options(tmp.path(), 100), &port).await;

        assert!(port.singles.lock().unwrap().is_empty());
        let batches = port.batches.lock().unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1][0].name(), "huge.json");
        assert_eq!(report.total_objects, 3);
    }
}
