use std::collections::BTreeMap;

use survex_core::{ChoiceSet, ValidationError};

/// Stores one validated choice per trial index
#[derive(Debug, Clone)]
pub struct ResponseRecorder {
    choices: ChoiceSet,
    responses: BTreeMap<usize, String>,
}

impl ResponseRecorder {
    pub fn new(choices: ChoiceSet) -> Self {
        Self {
            choices,
            responses: BTreeMap::new(),
        }
    }

    /// Rejects labels outside the choice set without touching stored data.
    pub fn record(&mut self, trial_index: usize, label: &str) -> Result<(), ValidationError> {
        debug_assert!(trial_index >= 1, "trial indices are 1-based");
        let label = self.choices.validate(label)?.to_string();
        self.responses.insert(trial_index, label);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.responses.clear();
    }

    pub fn get(&self, trial_index: usize) -> Option<&str> {
        self.responses.get(&trial_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn responses(&self) -> &BTreeMap<usize, String> {
        &self.responses
    }

    pub fn choices(&self) -> &ChoiceSet {
        &self.choices
    }

    /// Slot `i - 1` holds the answer to trial `i`, or "" when it was never
    /// answered. Always `trial_count` long.
    pub fn dense(&self, trial_count: usize) -> Vec<String> {
        (1..=trial_count)
            .map(|i| self.get(i).unwrap_or_default().to_string())
            .collect()
    }
}
