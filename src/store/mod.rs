use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::config::StoreConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Data store is not configured")]
    NotConfigured,

    #[error("Data store request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Data store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Data store returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Data store returned invalid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl StoreError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(timeout)
        } else {
            StoreError::Http(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }
}

/// Thin reader over a Supabase project's PostgREST endpoint.
pub struct StoreClient {
    config: Option<StoreConfig>,
    client: Client,
    timeout: Duration,
}

impl StoreClient {
    pub fn new(config: Option<StoreConfig>, client: Client, timeout: Duration) -> Self {
        match &config {
            Some(store) => info!("Using data store at {}", store.url),
            None => info!("No data store configured"),
        }
        Self {
            config,
            client,
            timeout,
        }
    }

    pub fn config(&self) -> Option<&StoreConfig> {
        self.config.as_ref()
    }

    /// Reads the row count of the configured table as a single object.
    pub async fn count_rows(&self) -> Result<Value, StoreError> {
        let store = self.config.as_ref().ok_or(StoreError::NotConfigured)?;
        let url = format!("{}/rest/v1/{}", store.url, store.table);

        debug!("Querying {} for row count", url);

        let response = self
            .client
            .get(&url)
            .query(&[("select", "count")])
            .header("apikey", &store.service_key)
            .bearer_auth(&store.service_key)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(StoreError::InvalidBody)
    }
}

fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
