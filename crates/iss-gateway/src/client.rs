//! Async ISS client wrapping reqwest.
//!
//! Fetches reference pages, block metadata and block rows. Retries on 5xx
//! and backs off on 429; anything else non-2xx is an error.

use crate::error::{GatewayError, GatewayResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// One data row as returned by ISS: column name → raw scalar.
pub type Row = Map<String, Value>;

/// Declared type of one metadata column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    pub name: String,
    /// Raw ISS type name, validated when the schema is built.
    pub type_name: String,
}

/// Columns of one block, in the order ISS declares them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMetadata {
    pub fields: Vec<FieldMetadata>,
}

/// HTTP client for the ISS REST API.
#[derive(Clone)]
pub struct IssClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl IssClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("iss-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 2,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw markup of `/reference/<id>`.
    pub async fn fetch_reference(&self, id: u32) -> GatewayResult<String> {
        let url = format!("{}/reference/{id}", self.base_url);
        self.get_text(&url, &[]).await
    }

    /// Column metadata for every block served at `path`.
    pub async fn fetch_metadata(&self, path: &str) -> GatewayResult<BTreeMap<String, BlockMetadata>> {
        let url = format!("{}/{path}.json", self.base_url);
        let query = [
            ("iss.meta".to_string(), "on".to_string()),
            ("iss.data".to_string(), "off".to_string()),
        ];
        let body = self.get_json(&url, &query).await?;
        parse_metadata(&url, body)
    }

    /// Rows of `block` at the concrete `path`, with extra query parameters.
    pub async fn fetch_rows(
        &self,
        path: &str,
        block: &str,
        params: &BTreeMap<String, String>,
    ) -> GatewayResult<Vec<Row>> {
        let url = format!("{}/{path}.json", self.base_url);
        let mut query: Vec<(String, String)> = vec![
            ("iss.meta".into(), "off".into()),
            ("iss.data".into(), "on".into()),
            ("iss.json".into(), "extended".into()),
            ("iss.only".into(), block.to_string()),
        ];
        query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = self.get_json(&url, &query).await?;
        parse_rows(&url, block, body)
    }

    async fn get_json(&self, url: &str, query: &[(String, String)]) -> GatewayResult<Value> {
        let text = self.get_text(url, query).await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// GET with retry on 5xx and transport errors, backoff on 429.
    async fn get_text(&self, url: &str, query: &[(String, String)]) -> GatewayResult<String> {
        let mut retries = 0u32;

        loop {
            debug!(url, attempt = retries + 1, "ISS request");
            let resp = self.client.get(url).query(query).send().await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < self.max_retries {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < self.max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    if !r.status().is_success() {
                        return Err(GatewayError::UnexpectedStatus {
                            url: url.to_string(),
                            status,
                        });
                    }

                    return Ok(r.text().await?);
                }
                Err(e) => {
                    if retries < self.max_retries && !e.is_builder() {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1)))
}

/// `{ block: { metadata: { COLUMN: { type, .. } } } }`
fn parse_metadata(url: &str, body: Value) -> GatewayResult<BTreeMap<String, BlockMetadata>> {
    let invalid = |reason: String| GatewayError::InvalidResponse {
        url: url.to_string(),
        reason,
    };

    let Value::Object(blocks) = body else {
        return Err(invalid("metadata response is not an object".into()));
    };

    let mut out = BTreeMap::new();
    for (block, content) in blocks {
        let Some(columns) = content.get("metadata").and_then(Value::as_object) else {
            continue;
        };
        let mut fields = Vec::with_capacity(columns.len());
        for (name, meta) in columns {
            let type_name = meta
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(format!("column {block}.{name} has no type")))?;
            fields.push(FieldMetadata {
                name: name.clone(),
                type_name: type_name.to_string(),
            });
        }
        out.insert(block, BlockMetadata { fields });
    }
    Ok(out)
}

/// Extended form: `[ { "charsetinfo": .. }, { block: [ row, .. ] } ]`.
fn parse_rows(url: &str, block: &str, body: Value) -> GatewayResult<Vec<Row>> {
    let invalid = |reason: &str| GatewayError::InvalidResponse {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let data = body
        .as_array()
        .and_then(|parts| parts.get(1))
        .ok_or_else(|| invalid("expected extended [charsetinfo, data] array"))?;

    let rows = match data.get(block) {
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(invalid("block data is not an array")),
        None => return Ok(Vec::new()),
    };

    rows.iter()
        .map(|row| {
            row.as_object()
                .cloned()
                .ok_or_else(|| invalid("row is not an object"))
        })
        .collect()
}
