//! survex - video classification survey service
//!
//! Serves one experiment session per visitor: instructions and consent, one
//! page per video with a fixed choice list, a closing participant form, then
//! a spreadsheet append and a CSV download of the same row.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use survex_cache::SessionCache;
use survex_core::{ChoiceSet, Phase};
use survex_experiment::{ExperimentStateMachine, VideoCatalog};
use survex_render::HtmlRenderer;
use survex_submit::SubmissionAdapter;
use survex_timing::MonotonicTimer;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

pub use config::AppConfig;
pub use error::AppError;

pub const MEDIA_PREFIX: &str = "/media";

pub type Session = ExperimentStateMachine<MonotonicTimer>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<VideoCatalog>,
    pub choices: ChoiceSet,
    pub sessions: Arc<SessionCache<Session>>,
    pub submitter: SubmissionAdapter,
    pub renderer: Arc<HtmlRenderer>,
}

impl AppState {
    pub fn new(
        catalog: VideoCatalog,
        choices: ChoiceSet,
        submitter: SubmissionAdapter,
        sessions: SessionCache<Session>,
        title: &str,
    ) -> Self {
        let renderer = HtmlRenderer::new(title, catalog.len());
        Self {
            catalog: Arc::new(catalog),
            choices,
            sessions: Arc::new(sessions.with_retention(in_progress)),
            submitter,
            renderer: Arc::new(renderer),
        }
    }

    /// A session at the welcome screen with its own clock.
    pub fn new_session(&self) -> Session {
        ExperimentStateMachine::new(
            Arc::clone(&self.catalog),
            self.choices.clone(),
            MonotonicTimer::new(),
        )
    }
}

/// Participants between the start action and the closing form.
fn in_progress(session: &Session) -> bool {
    let phase = session.phase();
    phase.is_trial() || phase.awaits_form()
}

pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(state.catalog.root());

    Router::new()
        .route("/", get(routes::index))
        .route("/start", post(routes::start))
        .route("/choice", post(routes::choice))
        .route("/participant", post(routes::participant))
        .route("/responses.csv", get(routes::download_csv))
        .route("/restart", post(routes::restart))
        .route("/health", get(routes::health))
        .nest_service(MEDIA_PREFIX, media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drops sessions that have gone idle.
pub fn spawn_session_sweeper(
    sessions: Arc<SessionCache<Session>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_idle();
            if evicted > 0 {
                info!("{} idle sessions dropped, {} active", evicted, sessions.len());
            }
        }
    })
}
