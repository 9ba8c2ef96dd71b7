use std::sync::Arc;
use std::time::Duration;

use survex_core::SubmissionRecord;
use tracing::{error, info, warn};

use crate::credentials::{OAuthClient, TokenFileProvider};
use crate::sheets::{http_client, AppendReceipt, RowSink, SheetsClient, UnconfiguredSink};
use crate::{to_csv, SheetsConfig, SubmitError};

/// Hands finished records to the remote sheet and renders the CSV download
#[derive(Clone)]
pub struct SubmissionAdapter {
    sink: Arc<dyn RowSink>,
}

impl SubmissionAdapter {
    pub fn new(sink: Arc<dyn RowSink>) -> Self {
        Self { sink }
    }

    /// Google Sheets with token-file credentials, or a sink that always fails
    /// when no spreadsheet id is configured.
    pub async fn from_config(config: &SheetsConfig) -> Result<Self, SubmitError> {
        let Some(spreadsheet_id) = config.spreadsheet_id.clone() else {
            warn!("No spreadsheet configured; responses will only be available as CSV");
            return Ok(Self::new(Arc::new(UnconfiguredSink)));
        };

        let http = http_client(Duration::from_secs(config.timeout_secs))?;
        let oauth = OAuthClient::new(config, http.clone());
        let credentials = TokenFileProvider::new(&config.token_path, oauth);
        if let Err(e) = credentials.load().await {
            warn!("Could not read credentials: {}", e);
        }

        info!("Submitting rows to spreadsheet {} ({})", spreadsheet_id, config.range);
        Ok(Self::new(Arc::new(SheetsClient::new(
            http,
            credentials,
            config,
            spreadsheet_id,
        ))))
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub async fn submit(&self, record: &SubmissionRecord) -> Result<AppendReceipt, SubmitError> {
        match self.sink.append_row(&record.to_row()).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                error!(
                    "Submission to {} failed (retryable: {}): {}",
                    self.sink.name(),
                    e.is_retryable(),
                    e
                );
                Err(e)
            }
        }
    }

    pub fn csv(&self, record: &SubmissionRecord) -> Result<Vec<u8>, SubmitError> {
        to_csv(record)
    }
}
