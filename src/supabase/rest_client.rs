use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use super::source::{DataError, SelectQuery};

/// Error body returned by PostgREST on a rejected request.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// Thin client over the `/rest/v1` PostgREST surface.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    pub fn new(http: Client, project_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn build_url(&self, query: &SelectQuery) -> Result<Url, DataError> {
        let endpoint = format!("{}/{}", self.base_url, query.table);
        Url::parse_with_params(&endpoint, query.to_params())
            .map_err(|e| DataError::InvalidRequest(format!("{endpoint}: {e}")))
    }

    /// Execute a select and return the raw JSON rows.
    pub async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, DataError> {
        let url = self.build_url(query)?;
        tracing::debug!(table = %query.table, url = %url, "PostgREST select");

        let resp = self
            .http
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let message = rejection_message(&body);
            tracing::warn!(
                table = %query.table,
                status = status.as_u16(),
                error = %message,
                "PostgREST rejected query"
            );
            return Err(DataError::Query {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<Value> = serde_json::from_slice(&body)?;
        Ok(rows)
    }
}

fn rejection_message(body: &[u8]) -> String {
    match serde_json::from_slice::<PostgrestError>(body) {
        Ok(PostgrestError {
            message: Some(message),
            code,
            hint,
        }) => {
            let mut out = message;
            if let Some(code) = code {
                out = format!("{out} [{code}]");
            }
            if let Some(hint) = hint {
                out = format!("{out} (hint: {hint})");
            }
            out
        }
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}
