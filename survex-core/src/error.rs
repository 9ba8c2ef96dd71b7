use thiserror::Error;

/// Input rejected at the boundary before any session state changes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not one of the available options")]
    UnknownChoice(String),

    #[error("Age must be between {min} and {max}, got {value}")]
    AgeOutOfRange { value: i64, min: u8, max: u8 },

    #[error("Age must be a whole number, got '{0}'")]
    InvalidAge(String),

    #[error("Spectacles answer must be Yes or No, got '{0}'")]
    UnknownSpectacles(String),

    #[error("Choice set is empty")]
    EmptyChoiceSet,

    #[error("Choice labels must not be blank")]
    BlankChoice,

    #[error("Duplicate choice label '{0}'")]
    DuplicateChoice(String),
}
