use survex_core::SubmissionRecord;

use crate::SubmitError;

pub const CSV_FILE_NAME: &str = "responses.csv";

/// Header line plus the record's row, same order as the remote append.
pub fn to_csv(record: &SubmissionRecord) -> Result<Vec<u8>, SubmitError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(record.headers())
        .map_err(|e| SubmitError::Csv(e.to_string()))?;
    writer
        .write_record(record.to_row().iter().map(ToString::to_string))
        .map_err(|e| SubmitError::Csv(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| SubmitError::Csv(e.to_string()))
}
