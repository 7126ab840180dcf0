//! Object commands other than `create`: `read`, `update`, `delete`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ParaClient;
use crate::config::Config;
use crate::extract::{detect_content_type, MIME_JSON};
use crate::files::{canonical_cwd, relative_path, resolve_files};
use crate::models::Payload;
use crate::record::RecordBuilder;

/// Files larger than this are not sent by `update`.
pub const MAX_UPDATE_FILE_SIZE: u64 = 400 * 1024;

pub async fn run_read(config: &Config, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        bail!("Must specify object id.");
    }
    let client = ParaClient::new(config)?;
    let objects = client
        .read_all(ids)
        .await
        .context("Failed to read object")?;
    println!("{}", serde_json::to_string_pretty(&objects)?);
    Ok(())
}

/// Arguments of the `update` command.
#[derive(Debug, Clone, Default)]
pub struct UpdateArgs {
    pub pattern: Option<String>,
    pub encode_id: Option<String>,
    pub cwd: Option<PathBuf>,
}

pub async fn run_update(config: &Config, args: UpdateArgs) -> Result<()> {
    let Some(pattern) = args.pattern.as_deref().filter(|p| !p.is_empty()) else {
        bail!("No files specified.");
    };
    let cwd = canonical_cwd(args.cwd.as_deref())?;
    let files = resolve_files(pattern, &cwd)?;
    if files.is_empty() {
        bail!("No files specified.");
    }

    let builder = RecordBuilder::new(None, args.encode_id.as_deref());
    let mut updates = Vec::new();
    for file in &files {
        match load_update(file, &cwd, &builder) {
            Ok(objects) => {
                info!("Updating {}", relative_path(file, &cwd));
                updates.extend(objects);
            }
            Err(e) => warn!("{} skipped: {:#}", file.display(), e),
        }
    }
    if updates.is_empty() {
        bail!("No JSON objects to update.");
    }

    let client = ParaClient::new(config)?;
    let updated = client
        .update_all(&updates)
        .await
        .context("Failed to update objects")?;
    println!("✔ Updated {} objects.", updated.len());
    Ok(())
}

fn load_update(path: &Path, cwd: &Path, builder: &RecordBuilder) -> Result<Vec<Value>> {
    if detect_content_type(path) != MIME_JSON {
        bail!("not a JSON file");
    }
    let size = std::fs::metadata(path)?.len();
    if size > MAX_UPDATE_FILE_SIZE {
        bail!("too big (max. {} KB)", MAX_UPDATE_FILE_SIZE / 1024);
    }
    let body = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&body).context("malformed JSON")?;
    update_objects(value, &relative_path(path, cwd), builder)
}

/// Objects to send for one update file. Objects carrying their own `id` go
/// out unchanged; the rest get the id `create` would have given them.
pub fn update_objects(
    value: Value,
    identifier: &str,
    builder: &RecordBuilder,
) -> Result<Vec<Value>> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut objects = Vec::with_capacity(items.len());
    for item in items {
        let has_id = item
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if has_id {
            objects.push(item);
            continue;
        }
        for record in builder.build(&Payload::Json(item), identifier)? {
            objects.push(serde_json::to_value(&record)?);
        }
    }
    Ok(objects)
}

/// Arguments of the `delete` command.
#[derive(Debug, Clone, Default)]
pub struct DeleteArgs {
    pub pattern: Option<String>,
    pub ids: Vec<String>,
    pub cwd: Option<PathBuf>,
}

pub async fn run_delete(config: &Config, args: DeleteArgs) -> Result<()> {
    let ids = delete_ids(&args)?;
    if ids.is_empty() {
        bail!("No files specified.");
    }
    let client = ParaClient::new(config)?;
    client
        .delete_all(&ids)
        .await
        .context("Failed to delete objects")?;
    println!("✔ Deleted objects {:?}", ids);
    Ok(())
}

/// Basenames of the files matching the pattern, or the explicit ids when
/// nothing matches.
pub fn delete_ids(args: &DeleteArgs) -> Result<Vec<String>> {
    if let Some(pattern) = args.pattern.as_deref().filter(|p| !p.is_empty()) {
        let cwd = canonical_cwd(args.cwd.as_deref())?;
        let names: Vec<String> = resolve_files(pattern, &cwd)?
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        if !names.is_empty() {
            return Ok(names);
        }
    }
    Ok(args
        .ids
        .iter()
        .filter(|id| !id.is_empty())
        .cloned()
        .collect())
}
