use std::path::PathBuf;

use survex_core::{SurveyPhase, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExperimentError {
    #[error("Please accept the terms and conditions before starting the experiment.")]
    ConsentRequired,

    #[error("Video file not found: {}", .0.display())]
    MissingMedia(PathBuf),

    #[error("Video {0} was already answered")]
    StaleTrial(usize),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Cannot {action} while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: SurveyPhase,
    },
}
