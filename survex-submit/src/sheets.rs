use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use survex_core::CellValue;
use tracing::{debug, info};

use crate::{CredentialProvider, SheetsConfig, SubmitError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendReceipt {
    pub updated_range: Option<String>,
    pub updated_rows: u32,
}

/// Append-only destination for finished rows
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn append_row(&self, row: &[CellValue]) -> Result<AppendReceipt, SubmitError>;

    fn name(&self) -> &str;
}

/// Stand-in used when no spreadsheet is configured; every append fails.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredSink;

#[async_trait]
impl RowSink for UnconfiguredSink {
    async fn append_row(&self, _row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        Err(SubmitError::NotConfigured(
            "no spreadsheet id (set SURVEX_SPREADSHEET_ID)".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[derive(Serialize)]
struct AppendBody<'a> {
    values: [&'a [CellValue]; 1],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: Option<u32>,
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, SubmitError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SubmitError::Network(format!("failed to create HTTP client: {e}")))
}

/// Sheets v4 `values.append` client; the server picks the row.
pub struct SheetsClient<C: CredentialProvider> {
    http: reqwest::Client,
    credentials: C,
    api_base: String,
    spreadsheet_id: String,
    range: String,
}

impl<C: CredentialProvider> SheetsClient<C> {
    pub fn new(
        http: reqwest::Client,
        credentials: C,
        config: &SheetsConfig,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            http,
            credentials,
            api_base: config.api_base.clone(),
            spreadsheet_id: spreadsheet_id.into(),
            range: config.range.clone(),
        }
    }

    pub fn append_url(&self) -> Result<Url, SubmitError> {
        let target = format!("{}:append", self.range);
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SubmitError::NotConfigured(format!("API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SubmitError::NotConfigured(format!("API base: {}", self.api_base)))?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                target.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }
}

#[async_trait]
impl<C: CredentialProvider> RowSink for SheetsClient<C> {
    async fn append_row(&self, row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        let url = self.append_url()?;
        let token = self.credentials.access_token().await?;
        debug!("Appending {} cells to {}", row.len(), self.range);

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&AppendBody { values: [row] })
            .send()
            .await
            .map_err(SubmitError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            let body: AppendResponse = resp.json().await.unwrap_or_default();
            let updates = body.updates.unwrap_or_default();
            let receipt = AppendReceipt {
                updated_range: updates.updated_range,
                updated_rows: updates.updated_rows.unwrap_or(1),
            };
            info!(
                "Row appended to spreadsheet at {}",
                receipt.updated_range.as_deref().unwrap_or("?")
            );
            Ok(receipt)
        } else {
            let message = resp.text().await.unwrap_or_default();
            Err(match status.as_u16() {
                401 | 403 => SubmitError::Authentication(format!("HTTP {status}: {message}")),
                429 => SubmitError::RateLimited,
                code => SubmitError::Api {
                    status: code,
                    message,
                },
            })
        }
    }

    fn name(&self) -> &str {
        "google-sheets"
    }
}
