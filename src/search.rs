//! The `search` command.

use anyhow::{Context, Result};

use crate::client::ParaClient;
use crate::config::Config;
use crate::models::Pager;

/// Query the service and print the raw response as pretty JSON.
pub async fn run_search(
    config: &Config,
    query: &str,
    object_type: Option<&str>,
    pager: &Pager,
) -> Result<()> {
    let client = ParaClient::new(config)?;
    let query = if query.trim().is_empty() { "*" } else { query };
    let resp = client
        .find_query(object_type, query, pager)
        .await
        .context("Search failed")?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
