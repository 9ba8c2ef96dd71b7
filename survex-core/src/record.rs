use serde::Serialize;
use std::fmt;

use crate::ParticipantInfo;

/// One spreadsheet cell. Serialized untagged so numbers stay numbers in the
/// remote sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// Everything one participant produced, laid out in submission order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub participant: ParticipantInfo,
    /// Dense, one slot per trial; unanswered trials are empty strings.
    pub responses: Vec<String>,
    pub elapsed_secs: f64,
}

impl SubmissionRecord {
    pub fn column_names(trial_count: usize) -> Vec<String> {
        let mut names = vec![
            "Name".to_string(),
            "Age".to_string(),
            "Wears Spectacles".to_string(),
        ];
        names.extend((1..=trial_count).map(|i| format!("Video {i} Response")));
        names.push("Total Time".to_string());
        names
    }

    pub fn row_len(trial_count: usize) -> usize {
        3 + trial_count + 1
    }

    pub fn headers(&self) -> Vec<String> {
        Self::column_names(self.responses.len())
    }

    /// [name, age, spectacles, response_1..response_N, elapsed_seconds]
    pub fn to_row(&self) -> Vec<CellValue> {
        let mut row = Vec::with_capacity(Self::row_len(self.responses.len()));
        row.push(CellValue::Text(self.participant.name.clone()));
        row.push(CellValue::Integer(i64::from(self.participant.age)));
        row.push(self.participant.spectacles.as_str().into());
        row.extend(self.responses.iter().map(|r| CellValue::Text(r.clone())));
        row.push(CellValue::Number(self.elapsed_secs));
        row
    }
}
