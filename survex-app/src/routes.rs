use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{Value, json};
use survex_core::ParticipantInfo;
use survex_experiment::{ExperimentError, ExperimentEvent};
use survex_render::{PageView, PhaseRenderer as _, TrialView, media_url};
use survex_submit::CSV_FILE_NAME;
use tracing::{info, warn};

use crate::session::Visitor;
use crate::{AppError, AppState, MEDIA_PREFIX, Session};

#[derive(Debug, Default, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    pub consent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceForm {
    pub choice: String,
    /// 1-based trial the page was showing
    pub trial: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParticipantForm {
    pub name: String,
    pub age: String,
    pub spectacles: String,
}

/// Renders the page for the session's current phase, with an optional error
/// banner. A missing video replaces the trial page with its own error.
fn render_page(state: &AppState, session: &Session, error: Option<AppError>) -> Response {
    let mut status = error.as_ref().map_or(StatusCode::OK, AppError::status);
    let mut message = error.map(|e| e.to_string());

    let trial = match session.present_trial() {
        Ok(trial) => trial.map(|t| TrialView {
            index: t.index,
            heading: t.heading(),
            video_url: media_url(MEDIA_PREFIX, t.stimulus.relative_path()),
        }),
        Err(e) => {
            let e = AppError::from(e);
            status = e.status();
            message = Some(e.to_string());
            None
        }
    };

    let view = PageView {
        trial,
        choices: session.choices().labels(),
        error: message.as_deref(),
        consent_given: session.consent_given(),
        can_download: session.export_record().is_some(),
    };
    let html = state.renderer.render_phase(&session.phase(), &view);
    (status, Html(html)).into_response()
}

pub async fn index(State(state): State<AppState>, visitor: Visitor) -> Response {
    let page = {
        let session = visitor.session.lock().await;
        render_page(&state, &session, None)
    };
    visitor.finish(page)
}

pub async fn start(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<StartForm>,
) -> Response {
    let visitor = visitor.enroll(&state);
    let response = {
        let mut session = visitor.session.lock().await;
        session.set_consent(form.consent.is_some());
        match session.handle_event(ExperimentEvent::StartPressed) {
            Ok(_) => Redirect::to("/").into_response(),
            Err(e) => render_page(&state, &session, Some(e.into())),
        }
    };
    visitor.finish(response)
}

pub async fn choice(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<ChoiceForm>,
) -> Response {
    let response = {
        let mut session = visitor.session.lock().await;
        let event = ExperimentEvent::ChoiceSubmitted {
            trial: form.trial,
            label: form.choice,
        };
        match session.handle_event(event) {
            // A resent form for a trial already answered just shows the current page.
            Ok(_) | Err(ExperimentError::StaleTrial(_)) => Redirect::to("/").into_response(),
            Err(e) => render_page(&state, &session, Some(e.into())),
        }
    };
    visitor.finish(response)
}

pub async fn participant(
    State(state): State<AppState>,
    visitor: Visitor,
    Form(form): Form<ParticipantForm>,
) -> Response {
    let response = {
        let mut session = visitor.session.lock().await;
        match submit_participant(&state, &mut session, &form).await {
            Ok(()) => Redirect::to("/").into_response(),
            Err(e) => render_page(&state, &session, Some(e)),
        }
    };
    visitor.finish(response)
}

async fn submit_participant(
    state: &AppState,
    session: &mut Session,
    form: &ParticipantForm,
) -> Result<(), AppError> {
    let participant = ParticipantInfo::parse(&form.name, &form.age, &form.spectacles)?;
    let Some(record) = session.prepare_submission(participant)? else {
        return Ok(());
    };

    match state.submitter.submit(&record).await {
        Ok(receipt) => {
            info!(
                "Responses saved for '{}' ({} rows at {})",
                record.participant.name,
                receipt.updated_rows,
                receipt.updated_range.as_deref().unwrap_or("?")
            );
            session.commit_submission(record);
            Ok(())
        }
        Err(e) => {
            warn!("Keeping unsent responses for CSV export");
            session.submission_failed(record);
            Err(e.into())
        }
    }
}

pub async fn download_csv(State(state): State<AppState>, visitor: Visitor) -> Response {
    let csv = {
        let session = visitor.session.lock().await;
        match session.export_record() {
            Some(record) => state
                .submitter
                .csv(record)
                .map_err(|e| AppError::Internal(e.to_string())),
            None => Err(AppError::NothingToExport),
        }
    };

    let response = match csv {
        Ok(bytes) => (
            [
                (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{CSV_FILE_NAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    };
    visitor.finish(response)
}

pub async fn restart(State(state): State<AppState>, visitor: Visitor) -> Response {
    if visitor.is_stored() {
        state.sessions.replace(visitor.id, state.new_session());
        info!("Session {} restarted", visitor.id);
    }
    visitor.finish(Redirect::to("/"))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "survex",
        "version": env!("CARGO_PKG_VERSION"),
        "videos": state.catalog.len(),
        "sessions": state.sessions.len(),
    }))
}
