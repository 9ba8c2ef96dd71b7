use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use survex_core::ValidationError;
use survex_experiment::ExperimentError;
use survex_submit::SubmitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Experiment(#[from] ExperimentError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Could not save your responses ({0}). You can download them as CSV and submit again.")]
    Submit(#[from] SubmitError),

    #[error("No responses to download yet")]
    NothingToExport,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Experiment(ExperimentError::MissingMedia(_)) => StatusCode::NOT_FOUND,
            AppError::Experiment(
                ExperimentError::WrongPhase { .. } | ExperimentError::StaleTrial(_),
            ) => StatusCode::CONFLICT,
            AppError::Experiment(_) | AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::Submit(_) => StatusCode::BAD_GATEWAY,
            AppError::NothingToExport => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use survex_core::SurveyPhase;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            AppError::from(ExperimentError::ConsentRequired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ExperimentError::MissingMedia(PathBuf::from("a.mp4"))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ExperimentError::WrongPhase {
                action: "record a choice",
                phase: SurveyPhase::NotStarted,
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ValidationError::InvalidAge("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::from(SubmitError::Timeout).status(), StatusCode::BAD_GATEWAY);
    }
}
