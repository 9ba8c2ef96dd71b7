use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

pub const MIN_AGE: u8 = 0;
pub const MAX_AGE: u8 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spectacles {
    Yes,
    No,
}

impl Spectacles {
    pub fn as_str(&self) -> &'static str {
        match self {
            Spectacles::Yes => "Yes",
            Spectacles::No => "No",
        }
    }
}

impl FromStr for Spectacles {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Spectacles::Yes),
            "No" => Ok(Spectacles::No),
            other => Err(ValidationError::UnknownSpectacles(other.to_string())),
        }
    }
}

impl fmt::Display for Spectacles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Demographic answers from the closing form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub name: String,
    pub age: u8,
    pub spectacles: Spectacles,
}

impl ParticipantInfo {
    pub fn new(name: impl Into<String>, age: i64, spectacles: Spectacles) -> Result<Self, ValidationError> {
        if !(i64::from(MIN_AGE)..=i64::from(MAX_AGE)).contains(&age) {
            return Err(ValidationError::AgeOutOfRange {
                value: age,
                min: MIN_AGE,
                max: MAX_AGE,
            });
        }
        Ok(Self {
            name: name.into(),
            age: age as u8,
            spectacles,
        })
    }

    /// Parses raw form fields. The name is trimmed but may be empty.
    pub fn parse(name: &str, age: &str, spectacles: &str) -> Result<Self, ValidationError> {
        let age: i64 = age
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidAge(age.to_string()))?;
        let spectacles = spectacles.trim().parse()?;
        Self::new(name.trim(), age, spectacles)
    }
}
