//! Credential commands: `new-key`, `new-jwt`, `ping`, `me`.
//!
//! `new-key` and `new-jwt` write the result back to the config file so later
//! invocations pick it up.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ParaClient;
use crate::config::{update_config_file, Config};

/// Tokens are valid for a week.
pub const TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;
/// Tolerated clock difference between this machine and the server.
pub const CLOCK_SKEW_SECS: i64 = 5;

/// Claims of an app token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppClaims {
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub appid: String,
}

impl AppClaims {
    pub fn new(access_key: &str, now: i64) -> Self {
        Self {
            exp: now + TOKEN_LIFETIME_SECS,
            iat: now,
            nbf: now - CLOCK_SKEW_SECS,
            appid: access_key.to_string(),
        }
    }
}

/// HS256 token for `access_key`, signed with `secret_key`.
pub fn mint_jwt(access_key: &str, secret_key: &str, now: i64) -> Result<String> {
    let claims = AppClaims::new(access_key, now);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret_key.as_bytes()),
    )
    .context("Failed to sign JWT")
}

pub fn run_new_jwt(config: &mut Config) -> Result<()> {
    let token = mint_jwt(
        &config.credentials.access_key,
        &config.credentials.secret_key,
        Utc::now().timestamp(),
    )?;
    update_config_file(&config.path, |stored| {
        stored.credentials.jwt = Some(token.clone());
    })?;
    config.credentials.jwt = Some(token);
    println!(
        "✔ New JWT generated and saved in {}",
        config.path.display()
    );
    Ok(())
}

pub async fn run_new_key(config: &mut Config) -> Result<()> {
    let client = ParaClient::new(config)?;
    let keys = client
        .new_keys()
        .await
        .context("Failed to generate new secret key")?;
    let secret = keys
        .get("secretKey")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .context("Failed to generate new secret key: response has no secretKey")?;

    update_config_file(&config.path, |stored| {
        stored.credentials.secret_key = secret.to_string();
    })?;
    config.credentials.secret_key = secret.to_string();
    println!(
        "✔ New secret key generated and saved in {}",
        config.path.display()
    );
    Ok(())
}

pub async fn run_ping(config: &Config) -> Result<()> {
    let me = fetch_me(config).await?;
    println!("✔ Authenticated as: {}", describe_principal(&me));
    Ok(())
}

pub async fn run_me(config: &Config) -> Result<()> {
    let me = fetch_me(config).await?;
    println!("{}", serde_json::to_string_pretty(&me)?);
    Ok(())
}

async fn fetch_me(config: &Config) -> Result<Value> {
    let client = ParaClient::new(config)?;
    client.me().await.with_context(|| {
        format!(
            "Connection failed. Check the configuration file {}",
            config.path.display()
        )
    })
}

/// `<type> <name> (<id>)`
pub fn describe_principal(me: &Value) -> String {
    let field = |key: &str| me.get(key).and_then(Value::as_str).unwrap_or("?");
    format!("{} {} ({})", field("type"), field("name"), field("id"))
}
