use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Ordered set of labels a participant can pick from, shared by every trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ChoiceSet {
    labels: Vec<String>,
}

impl ChoiceSet {
    pub fn new<I, S>(labels: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if label.trim().is_empty() {
                return Err(ValidationError::BlankChoice);
            }
            if out.contains(&label) {
                return Err(ValidationError::DuplicateChoice(label));
            }
            out.push(label);
        }
        if out.is_empty() {
            return Err(ValidationError::EmptyChoiceSet);
        }
        Ok(Self { labels: out })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Returns the canonical label, or rejects anything outside the set.
    pub fn validate(&self, label: &str) -> Result<&str, ValidationError> {
        self.labels
            .iter()
            .find(|l| l.as_str() == label)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::UnknownChoice(label.to_string()))
    }
}

impl TryFrom<Vec<String>> for ChoiceSet {
    type Error = ValidationError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<ChoiceSet> for Vec<String> {
    fn from(set: ChoiceSet) -> Self {
        set.labels
    }
}
