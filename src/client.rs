//! HTTP client for the Para REST API.
//!
//! Every call goes to `<endpoint>/v1/<resource>` with a JSON body. Requests
//! are signed with SigV4 using the app's access and secret keys, or carry a
//! bearer token when one is configured.
//!
//! Retry strategy:
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - HTTP 4xx (not 429) → fail immediately
//! - Network error → retry

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::RemoteError;
use crate::models::{Pager, Record, SubmittedRecord};
use crate::signer::{canonical_query, Signer};
use crate::traits::SubmissionPort;

/// Longest response excerpt carried in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Fallback resource for records without a type.
const DEFAULT_RESOURCE: &str = "sysprop";

#[derive(Debug, Clone)]
enum Auth {
    Signed(Signer),
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct ParaClient {
    http: reqwest::Client,
    endpoint: Url,
    auth: Auth,
    max_retries: u32,
    backoff: Duration,
}

impl ParaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let creds = &config.credentials;
        let endpoint = Url::parse(&creds.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", creds.endpoint))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.client.timeout_secs))
            .user_agent(concat!("para-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let auth = match creds.jwt.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Auth::Bearer(token.to_string()),
            None => Auth::Signed(Signer::new(&creds.access_key, &creds.secret_key)),
        };

        Ok(Self {
            http,
            endpoint,
            auth,
            max_retries: config.client.max_retries,
            backoff: Duration::from_millis(config.client.backoff_ms),
        })
    }

    /// `POST /v1/_batch`
    pub async fn create_all(&self, records: &[Record]) -> Result<Vec<Value>, RemoteError> {
        let body = to_json(records)?;
        let resp = self.invoke(Method::POST, "_batch", &[], Some(&body)).await?;
        Ok(into_list(resp))
    }

    /// `POST /v1/<type>`
    pub async fn create(&self, record: &Record) -> Result<Value, RemoteError> {
        let resource = record.object_type().unwrap_or(DEFAULT_RESOURCE);
        let body = to_json(record)?;
        self.invoke(Method::POST, resource, &[], Some(&body)).await
    }

    /// `GET /v1/_batch?ids=...`
    pub async fn read_all(&self, ids: &[String]) -> Result<Vec<Value>, RemoteError> {
        let resp = self
            .invoke(Method::GET, "_batch", &id_params(ids), None)
            .await?;
        Ok(into_list(resp))
    }

    /// `PATCH /v1/_batch`
    pub async fn update_all(&self, objects: &[Value]) -> Result<Vec<Value>, RemoteError> {
        let body = Value::Array(objects.to_vec());
        let resp = self
            .invoke(Method::PATCH, "_batch", &[], Some(&body))
            .await?;
        Ok(into_list(resp))
    }

    /// `DELETE /v1/_batch?ids=...`
    pub async fn delete_all(&self, ids: &[String]) -> Result<(), RemoteError> {
        self.invoke(Method::DELETE, "_batch", &id_params(ids), None)
            .await
            .map(|_| ())
    }

    /// The authenticated app or user.
    pub async fn me(&self) -> Result<Value, RemoteError> {
        self.invoke(Method::GET, "_me", &[], None).await
    }

    /// Rotate the app's secret key. The response carries `secretKey`.
    pub async fn new_keys(&self) -> Result<Value, RemoteError> {
        self.invoke(Method::POST, "_newkeys", &[], None).await
    }

    /// Full-text search, optionally restricted to one type.
    pub async fn find_query(
        &self,
        object_type: Option<&str>,
        query: &str,
        pager: &Pager,
    ) -> Result<Value, RemoteError> {
        let mut params = vec![("q".to_string(), query.to_string())];
        if let Some(t) = object_type.filter(|t| !t.is_empty()) {
            params.push(("type".to_string(), t.to_string()));
        }
        params.extend(pager.to_params());
        self.invoke(Method::GET, "search/", &params, None).await
    }

    async fn invoke(
        &self,
        method: Method,
        resource: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let path = format!(
            "{}/v1/{}",
            self.endpoint.path().trim_end_matches('/'),
            resource.trim_start_matches('/')
        );
        let payload = match body {
            Some(v) => serde_json::to_vec(v).map_err(|e| RemoteError::transport(e.to_string()))?,
            None => Vec::new(),
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff * (1u32 << (attempt - 1).min(5));
                debug!(attempt, ?delay, "retrying {} {}", method, path);
                tokio::time::sleep(delay).await;
            }

            let request = self.request(method.clone(), &path, params, &payload)?;
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        return parse_body(status, &text);
                    }

                    let err = RemoteError::new(Some(status.as_u16()), error_message(status, &text));
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(RemoteError::transport(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RemoteError::transport("request failed after retries")))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        payload: &[u8],
    ) -> Result<reqwest::RequestBuilder, RemoteError> {
        let mut url = self.endpoint.clone();
        url.set_path(path);

        let builder = match &self.auth {
            Auth::Signed(signer) => {
                let sig = signer.sign(
                    method.as_str(),
                    &host_header(&url),
                    url.path(),
                    params,
                    payload,
                    Utc::now(),
                );
                url.set_query(non_empty(&sig.query));
                self.http
                    .request(method, url)
                    .header("Authorization", sig.authorization)
                    .header("X-Amz-Date", sig.amz_date)
            }
            Auth::Bearer(token) => {
                url.set_query(non_empty(&canonical_query(params)));
                self.http.request(method, url).bearer_auth(token)
            }
        };

        let builder = if payload.is_empty() {
            builder
        } else {
            builder
                .header("Content-Type", "application/json")
                .body(payload.to_vec())
        };
        Ok(builder)
    }
}

#[async_trait]
impl SubmissionPort for ParaClient {
    async fn submit_batch(&self, records: &[Record]) -> Result<Vec<SubmittedRecord>, RemoteError> {
        self.create_all(records).await
    }

    async fn submit_single(&self, record: &Record) -> Result<SubmittedRecord, RemoteError> {
        self.create(record).await
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::transport(format!("encode: {}", e)))
}

fn id_params(ids: &[String]) -> Vec<(String, String)> {
    ids.iter().map(|id| ("ids".to_string(), id.clone())).collect()
}

fn non_empty(query: &str) -> Option<&str> {
    (!query.is_empty()).then_some(query)
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn parse_body(status: StatusCode, text: &str) -> Result<Value, RemoteError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        RemoteError::new(
            Some(status.as_u16()),
            format!("invalid JSON in response: {}", e),
        )
    })
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// The service's `message` field when present, else a prefix of the body.
pub fn error_message(status: StatusCode, text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        if let Some(Value::String(msg)) = map.get("message") {
            return msg.clone();
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
