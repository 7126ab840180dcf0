//! # para-cli
//!
//! Command-line client for the Para backend.
//!
//! ## Usage
//!
//! ```bash
//! para-cli [--config <path>] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `para-cli create <glob>` | Persist files as objects and make them searchable |
//! | `para-cli read --id <id>...` | Fetch objects by id |
//! | `para-cli update <glob>` | Update objects from JSON files |
//! | `para-cli delete [glob] --id <id>...` | Delete objects |
//! | `para-cli search "<query>"` | Full-text search |
//! | `para-cli new-key` | Rotate the secret key and save it |
//! | `para-cli new-jwt` | Mint an app token and save it |
//! | `para-cli ping` | Check the connection and credentials |
//! | `para-cli me` | Print the authenticated object |
//!
//! ## Examples
//!
//! ```bash
//! para-cli create my-blog-post.md
//! para-cli read --id my-blog-post.md
//! para-cli create index.html --type webpage --id "My new article" --sanitize
//! para-cli delete --id 123 --id my-blog-post.md
//! para-cli new-key
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use para_cli::config::{self, CredentialOverrides};
use para_cli::ingest::{self, CreateArgs};
use para_cli::models::Pager;
use para_cli::objects::{self, DeleteArgs, UpdateArgs};
use para_cli::{auth, logging, search};

/// para-cli: persist local files in Para and query them.
///
/// Credentials come from the config file, then `PARA_ACCESS_KEY`,
/// `PARA_SECRET_KEY` and `PARA_ENDPOINT`, then the flags below.
#[derive(Parser)]
#[command(name = "para-cli", version, about = "Command-line client for the Para backend")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `~/.config/para-cli/config.toml`. A missing file means
    /// built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Para access key (app id).
    #[arg(long, global = true)]
    access_key: Option<String>,

    /// Para secret key.
    #[arg(long, global = true)]
    secret_key: Option<String>,

    /// URL of the Para server.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist files as objects and make them searchable.
    ///
    /// Text and HTML files become one object each; JSON files become one
    /// object per top-level element. Text above `--max-size` bytes is sent
    /// in chunks.
    Create {
        /// File, directory or glob (`docs/**/*.md`).
        pattern: Option<String>,

        /// Identifier for the first file instead of its path.
        #[arg(long)]
        id: Option<String>,

        /// Sets the `type` field of every object.
        #[arg(long = "type")]
        object_type: Option<String>,

        /// Strip all symbols from the text.
        #[arg(long)]
        sanitize: bool,

        /// Pass `false` to store identifiers as-is instead of base64.
        #[arg(long, value_name = "VALUE")]
        encode_id: Option<String>,

        /// Base directory for path identifiers (default: current directory).
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Override `[ingest] max_batch_size` (bytes).
        #[arg(long)]
        max_size: Option<u64>,
    },

    /// Fetch objects with the given ids.
    Read {
        #[arg(long = "id")]
        ids: Vec<String>,
    },

    /// Update objects with the data from JSON files.
    Update {
        pattern: Option<String>,

        #[arg(long, value_name = "VALUE")]
        encode_id: Option<String>,

        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Delete objects by file basename or id.
    Delete {
        pattern: Option<String>,

        #[arg(long = "id")]
        ids: Vec<String>,

        #[arg(long)]
        cwd: Option<PathBuf>,
    },

    /// Full-text search.
    Search {
        /// Query string (default `*`).
        query: Option<String>,

        /// Restrict results to one type.
        #[arg(long = "type")]
        object_type: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        /// Field to sort by.
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending.
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        desc: bool,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Generate a new secret key and save it to the config file.
    NewKey,

    /// Generate a new JWT app token and save it to the config file.
    NewJwt,

    /// Test the connection and print the authenticated identity.
    Ping,

    /// Print the authenticated object as JSON.
    Me,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("✖ {e:#}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✖ {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let overrides = CredentialOverrides {
        access_key: cli.access_key,
        secret_key: cli.secret_key,
        endpoint: cli.endpoint,
    };
    let mut cfg = config::load_config(&path, &overrides)?;

    match command {
        Commands::Create {
            pattern,
            id,
            object_type,
            sanitize,
            encode_id,
            cwd,
            max_size,
        } => {
            let args = CreateArgs {
                pattern,
                id,
                object_type,
                sanitize,
                encode_id,
                cwd,
                max_size,
            };
            ingest::run_create(&cfg, args).await?;
        }
        Commands::Read { ids } => {
            objects::run_read(&cfg, &ids).await?;
        }
        Commands::Update {
            pattern,
            encode_id,
            cwd,
        } => {
            let args = UpdateArgs {
                pattern,
                encode_id,
                cwd,
            };
            objects::run_update(&cfg, args).await?;
        }
        Commands::Delete { pattern, ids, cwd } => {
            objects::run_delete(&cfg, DeleteArgs { pattern, ids, cwd }).await?;
        }
        Commands::Search {
            query,
            object_type,
            page,
            sort,
            desc,
            limit,
        } => {
            let pager = Pager {
                page,
                sort_by: sort,
                desc,
                limit,
            };
            let query = query.unwrap_or_default();
            search::run_search(&cfg, &query, object_type.as_deref(), &pager).await?;
        }
        Commands::NewKey => {
            auth::run_new_key(&mut cfg).await?;
        }
        Commands::NewJwt => {
            auth::run_new_jwt(&mut cfg)?;
        }
        Commands::Ping => {
            auth::run_ping(&cfg).await?;
        }
        Commands::Me => {
            auth::run_me(&cfg).await?;
        }
    }

    Ok(())
}
