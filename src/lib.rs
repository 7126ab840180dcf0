//! # para-cli
//!
//! Command-line client for the Para backend: push local files as searchable
//! objects, and read, update, delete and search them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │  files   │──▶│   extract    │──▶│    record    │──▶│   batch    │──┐
//! │ glob/walk│   │ mime + HTML  │   │ id/type/text │   │ size-bound │  │
//! └──────────┘   └──────────────┘   └──────┬───────┘   └────────────┘  │
//!                                          │ text > ceiling            ▼
//!                                    ┌─────▼──────┐          ┌──────────────────┐
//!                                    │   chunk    │─────────▶│ SubmissionPort   │
//!                                    │ sequential │          │ (ParaClient/HTTP)│
//!                                    └────────────┘          └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! para-cli ping
//! para-cli create "docs/**/*.md" --type note
//! para-cli search "deploy*"
//! para-cli new-jwt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, env and flag overrides |
//! | [`models`] | Records, payloads, paging |
//! | [`error`] | Typed pipeline and client errors |
//! | [`files`] | Glob resolution |
//! | [`extract`] | Content type detection, HTML text extraction |
//! | [`record`] | Record building, type names, identifier encoding |
//! | [`chunk`] | Whitespace-aligned text splitting |
//! | [`batch`] | Size-bounded batch packing |
//! | [`ingest`] | Ingestion pipeline and `create` |
//! | [`traits`] | Submission seam |
//! | [`signer`] | SigV4 request signing |
//! | [`client`] | HTTP client for the REST API |
//! | [`objects`] | `read`, `update`, `delete` |
//! | [`search`] | `search` |
//! | [`auth`] | Keys, tokens, `ping`, `me` |
//! | [`logging`] | Tracing subscriber setup |

pub mod auth;
pub mod batch;
pub mod chunk;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod files;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod objects;
pub mod record;
pub mod search;
pub mod signer;
pub mod traits;
