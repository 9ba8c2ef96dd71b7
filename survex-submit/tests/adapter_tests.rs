//! Submission adapter against in-memory sinks

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use survex_core::{CellValue, ParticipantInfo, Spectacles, SubmissionRecord};
use survex_submit::{AppendReceipt, RowSink, SheetsConfig, SubmissionAdapter, SubmitError};

#[derive(Default)]
struct MemorySink {
    rows: Mutex<Vec<Vec<CellValue>>>,
}

#[async_trait]
impl RowSink for MemorySink {
    async fn append_row(&self, row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        let mut rows = self.rows.lock().unwrap();
        rows.push(row.to_vec());
        Ok(AppendReceipt {
            updated_range: Some(format!("Sheet1!A{}", rows.len())),
            updated_rows: 1,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct DownSink;

#[async_trait]
impl RowSink for DownSink {
    async fn append_row(&self, _row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        Err(SubmitError::Network("connection refused".into()))
    }

    fn name(&self) -> &str {
        "down"
    }
}

fn record() -> SubmissionRecord {
    SubmissionRecord {
        participant: ParticipantInfo::new("X", 30, Spectacles::No).unwrap(),
        responses: vec!["A".into(), "".into()],
        elapsed_secs: 9.0,
    }
}

#[tokio::test]
async fn appends_full_row_in_column_order() {
    let sink = Arc::new(MemorySink::default());
    let adapter = SubmissionAdapter::new(sink.clone());

    let receipt = adapter.submit(&record()).await.unwrap();
    assert_eq!(receipt.updated_range.as_deref(), Some("Sheet1!A1"));

    let rows = sink.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    let cells: Vec<String> = rows[0].iter().map(ToString::to_string).collect();
    assert_eq!(cells, vec!["X", "30", "No", "A", "", "9"]);
}

#[tokio::test]
async fn failure_is_reported_and_csv_still_works() {
    let adapter = SubmissionAdapter::new(Arc::new(DownSink));
    let err = adapter.submit(&record()).await.unwrap_err();
    assert!(err.is_retryable());

    let csv = String::from_utf8(adapter.csv(&record()).unwrap()).unwrap();
    assert!(csv.ends_with("X,30,No,A,,9\n"));
}

#[tokio::test]
async fn missing_spreadsheet_id_yields_unconfigured_sink() {
    let adapter = SubmissionAdapter::from_config(&SheetsConfig::default()).await.unwrap();
    assert_eq!(adapter.sink_name(), "unconfigured");
    assert!(matches!(
        adapter.submit(&record()).await,
        Err(SubmitError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn configured_spreadsheet_uses_sheets_client() {
    let dir = tempfile::tempdir().unwrap();
    let config = SheetsConfig {
        spreadsheet_id: Some("sheet-1".into()),
        token_path: dir.path().join("token.json"),
        ..SheetsConfig::default()
    };
    let adapter = SubmissionAdapter::from_config(&config).await.unwrap();
    assert_eq!(adapter.sink_name(), "google-sheets");
    assert!(matches!(
        adapter.submit(&record()).await,
        Err(SubmitError::AuthorizationRequired(_))
    ));
}
