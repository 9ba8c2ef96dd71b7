//! HTTP tests for the survey service
//!
//! Each test drives the router with `oneshot` against a temporary video
//! directory and an in-memory row sink.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use survex_app::{AppState, build_router};
use survex_cache::SessionCache;
use survex_core::{CellValue, ChoiceSet};
use survex_experiment::VideoCatalog;
use survex_submit::{AppendReceipt, RowSink, SubmissionAdapter, SubmitError};
use tower::util::ServiceExt;

#[derive(Default)]
struct MemorySink {
    rows: Mutex<Vec<Vec<CellValue>>>,
}

#[async_trait]
impl RowSink for MemorySink {
    async fn append_row(&self, row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        self.rows.lock().unwrap().push(row.to_vec());
        Ok(AppendReceipt {
            updated_range: Some("Sheet1!A2:F2".into()),
            updated_rows: 1,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct DownSink;

#[async_trait]
impl RowSink for DownSink {
    async fn append_row(&self, _row: &[CellValue]) -> Result<AppendReceipt, SubmitError> {
        Err(SubmitError::Timeout)
    }

    fn name(&self) -> &str {
        "down"
    }
}

struct TestApp {
    router: Router,
    cookie: Option<String>,
    dir: Arc<tempfile::TempDir>,
}

impl TestApp {
    fn new(videos: usize, sink: Arc<dyn RowSink>) -> Self {
        Self::with_capacity(videos, sink, 16)
    }

    fn with_capacity(videos: usize, sink: Arc<dyn RowSink>, max_sessions: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=videos {
            fs::write(dir.path().join(format!("clip{i:02}.mp4")), b"\0\0\0\x18ftyp").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"not a video").unwrap();

        let catalog = VideoCatalog::load(dir.path(), &[".mp4".to_string()]);
        let state = AppState::new(
            catalog,
            ChoiceSet::new(["A", "B"]).unwrap(),
            SubmissionAdapter::new(sink),
            SessionCache::new(max_sessions, Duration::from_secs(600)),
            "Test survey",
        );
        Self {
            router: build_router(state),
            cookie: None,
            dir: Arc::new(dir),
        }
    }

    /// Another browser on the same server, without a cookie yet.
    fn new_visitor(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: None,
            dir: Arc::clone(&self.dir),
        }
    }

    fn video_dir(&self) -> &Path {
        self.dir.path()
    }

    async fn send(&mut self, method: &str, uri: &str, form: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        if let Some(set) = response.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send("GET", uri, None).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response {
        self.send("POST", uri, Some(form)).await
    }

    async fn page(&mut self) -> String {
        let response = self.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }

    async fn finish_trials(&mut self, answers: &[&str]) {
        assert_see_other(self.post("/start", "consent=on").await);
        for (i, answer) in answers.iter().enumerate() {
            let form = format!("choice={answer}&trial={}", i + 1);
            assert_see_other(self.post("/choice", &form).await);
        }
    }
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn assert_see_other(response: Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

fn row_strings(sink: &MemorySink) -> Vec<Vec<String>> {
    sink.rows
        .lock()
        .unwrap()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

#[tokio::test]
async fn health_reports_catalog_size() {
    let mut app = TestApp::new(3, Arc::new(MemorySink::default()));
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "survex");
    assert_eq!(body["videos"], 3);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn first_visit_shows_instructions_without_storing_a_session() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    let html = app.page().await;
    assert!(html.contains("There are 2 videos"));
    assert!(html.contains("I understand that my data is being collected."));
    assert!(app.cookie.is_none());

    let body: Value = serde_json::from_str(&body_text(app.get("/health").await).await).unwrap();
    assert_eq!(body["sessions"], 0);

    assert_see_other(app.post("/start", "consent=on").await);
    assert!(app.cookie.as_deref().unwrap().starts_with("survex_session="));
    let body: Value = serde_json::from_str(&body_text(app.get("/health").await).await).unwrap();
    assert_eq!(body["sessions"], 1);
}

#[tokio::test]
async fn start_without_consent_stays_on_welcome() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    app.get("/").await;

    let response = app.post("/start", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("Please accept the terms and conditions"));
    assert!(html.contains("Start Experiment"));
}

#[tokio::test]
async fn full_run_appends_row_and_offers_csv() {
    let sink = Arc::new(MemorySink::default());
    let mut app = TestApp::new(2, sink.clone());

    assert_see_other(app.post("/start", "consent=on").await);
    let html = app.page().await;
    assert!(html.contains("<h3>Video 1</h3>"));
    assert!(html.contains(r#"src="/media/clip01.mp4""#));

    assert_see_other(app.post("/choice", "choice=A&trial=1").await);
    assert!(app.page().await.contains("<h3>Video 2</h3>"));
    assert_see_other(app.post("/choice", "choice=B&trial=2").await);
    assert!(app.page().await.contains(r#"action="/participant""#));

    assert_see_other(app.post("/participant", "name=X&age=30&spectacles=No").await);
    let rows = row_strings(&sink);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][..5], &["X", "30", "No", "A", "B"]);
    assert!(rows[0][5].parse::<f64>().unwrap() >= 0.0);

    let html = app.page().await;
    assert!(html.contains("Download responses as CSV"));

    let response = app.get("/responses.csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("responses.csv")
    );
    let csv = body_text(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Name,Age,Wears Spectacles,Video 1 Response,Video 2 Response,Total Time")
    );
    assert!(lines.next().unwrap().starts_with("X,30,No,A,B,"));
}

#[tokio::test]
async fn second_form_submission_is_ignored() {
    let sink = Arc::new(MemorySink::default());
    let mut app = TestApp::new(1, sink.clone());
    app.finish_trials(&["A"]).await;

    assert_see_other(app.post("/participant", "name=X&age=30&spectacles=No").await);
    assert_see_other(app.post("/participant", "name=Y&age=40&spectacles=Yes").await);
    let rows = row_strings(&sink);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "X");
}

#[tokio::test]
async fn resent_trial_form_does_not_answer_the_next_video() {
    let sink = Arc::new(MemorySink::default());
    let mut app = TestApp::new(2, sink.clone());
    assert_see_other(app.post("/start", "consent=on").await);

    assert_see_other(app.post("/choice", "choice=A&trial=1").await);
    assert_see_other(app.post("/choice", "choice=B&trial=1").await);
    assert!(app.page().await.contains("<h3>Video 2</h3>"));

    let response = app.post("/choice", "choice=A&trial=3").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("<h3>Video 2</h3>"));

    assert_see_other(app.post("/choice", "choice=B&trial=2").await);
    assert_see_other(app.post("/participant", "name=X&age=30&spectacles=No").await);
    assert_eq!(&row_strings(&sink)[0][..5], &["X", "30", "No", "A", "B"]);
}

#[tokio::test]
async fn passers_by_do_not_evict_a_participant_mid_survey() {
    let sink = Arc::new(MemorySink::default());
    let mut participant = TestApp::with_capacity(2, sink.clone(), 2);
    assert_see_other(participant.post("/start", "consent=on").await);
    assert_see_other(participant.post("/choice", "choice=A&trial=1").await);

    for _ in 0..3 {
        let mut stranger = participant.new_visitor();
        assert_eq!(stranger.get("/").await.status(), StatusCode::OK);
        assert_eq!(stranger.post("/start", "").await.status(), StatusCode::BAD_REQUEST);
    }

    assert_see_other(participant.post("/choice", "choice=B&trial=2").await);
    assert_see_other(participant.post("/participant", "name=X&age=30&spectacles=No").await);
    assert_eq!(&row_strings(&sink)[0][..5], &["X", "30", "No", "A", "B"]);
}

#[tokio::test]
async fn age_out_of_range_keeps_form_open() {
    let sink = Arc::new(MemorySink::default());
    let mut app = TestApp::new(1, sink.clone());
    app.finish_trials(&["B"]).await;

    let response = app.post("/participant", "name=X&age=150&spectacles=No").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("150"));
    assert!(html.contains(r#"action="/participant""#));
    assert!(sink.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_choice_does_not_advance() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    assert_see_other(app.post("/start", "consent=on").await);

    let response = app.post("/choice", "choice=C&trial=1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("<h3>Video 1</h3>"));
}

#[tokio::test]
async fn choice_before_start_is_a_conflict() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    let response = app.post("/choice", "choice=A&trial=1").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("Start Experiment"));
}

#[tokio::test]
async fn missing_video_halts_on_error_page() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    assert_see_other(app.post("/start", "consent=on").await);
    fs::remove_file(app.video_dir().join("clip01.mp4")).unwrap();

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("Video file not found"));
    assert!(!html.contains(r#"action="/choice""#));

    let response = app.post("/choice", "choice=A&trial=1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_append_still_allows_csv_download() {
    let mut app = TestApp::new(1, Arc::new(DownSink));
    app.finish_trials(&["A"]).await;

    assert_eq!(app.get("/responses.csv").await.status(), StatusCode::NOT_FOUND);

    let response = app.post("/participant", "name=X&age=30&spectacles=No").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains("Could not save your responses"));
    assert!(html.contains(r#"href="/responses.csv""#));

    let response = app.get("/responses.csv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("X,30,No,A,"));
}

#[tokio::test]
async fn zero_videos_go_straight_to_form() {
    let sink = Arc::new(MemorySink::default());
    let mut app = TestApp::new(0, sink.clone());
    assert!(app.page().await.contains("There are 0 videos"));

    assert_see_other(app.post("/start", "consent=on").await);
    assert!(app.page().await.contains(r#"action="/participant""#));
    assert_see_other(app.post("/participant", "name=&age=0&spectacles=Yes").await);
    assert_eq!(row_strings(&sink)[0].len(), 4);
}

#[tokio::test]
async fn restart_returns_to_welcome() {
    let mut app = TestApp::new(2, Arc::new(MemorySink::default()));
    assert_see_other(app.post("/start", "consent=on").await);
    assert_see_other(app.post("/choice", "choice=A&trial=1").await);

    assert_see_other(app.post("/restart", "").await);
    let html = app.page().await;
    assert!(html.contains("Start Experiment"));
    assert!(!html.contains("<h3>Video"));
}

#[tokio::test]
async fn serves_catalog_media() {
    let mut app = TestApp::new(1, Arc::new(MemorySink::default()));
    let response = app.get("/media/clip01.mp4").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
}
