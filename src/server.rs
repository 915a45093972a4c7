//! HTTP server.
//!
//! Serves the paste form and its actions as server-rendered HTML, plus a
//! small JSON surface for health checks and scripted reads.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/login` | Login form |
//! | `POST` | `/login` | Check credentials, then redirect to `/` |
//! | `POST` | `/logout` | End the session |
//! | `GET`  | `/` | Paste form and results table |
//! | `POST` | `/process` | Parse pasted text into the session queue |
//! | `POST` | `/reset` | Clear the session queue |
//! | `POST` | `/submit` | Send the last batch to the spreadsheet |
//! | `GET`  | `/export.csv` | Download the session queue as CSV |
//! | `GET`  | `/dashboard` | Embedded BI dashboard |
//! | `GET`  | `/api/queue` | Session queue as JSON |
//!
//! HTML routes redirect to `/login` when the session is not logged in.
//! JSON routes answer `401` with the error body below. The session cookie
//! is only ever set by a successful login, always with a new id.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "log in first" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `internal` (500).

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::Config;
use crate::export::{records_to_csv, EXPORT_FILENAME};
use crate::models::{Record, SubmitOutcome};
use crate::pages::{self, Notice};
use crate::session::{expired_session_cookie, session_cookie, SessionStore};
use crate::sheet::SheetWriter;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    sessions: Arc<SessionStore>,
    writer: SheetWriter,
}

impl AppState {
    pub fn new(config: Config, writer: SheetWriter) -> Self {
        let idle = Duration::from_secs(config.server.session_idle_mins * 60);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new(idle)),
            writer,
        }
    }
}

/// Starts the HTTP server with the spreadsheet backend named in config.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let writer = SheetWriter::from_config(&config.sheet)?;
    run_server_with_writer(config, writer).await
}

/// Like [`run_server`], but with a caller-supplied [`SheetWriter`].
pub async fn run_server_with_writer(config: &Config, writer: SheetWriter) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), writer));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        backend = %config.sheet.backend,
        "server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/login", get(handle_login_page).post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/", get(handle_index))
        .route("/process", post(handle_process))
        .route("/reset", post(handle_reset))
        .route("/submit", post(handle_submit))
        .route("/export.csv", get(handle_export))
        .route("/dashboard", get(handle_dashboard))
        .route("/api/queue", get(handle_queue))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: "log in first".to_string(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Attach `Set-Cookie` for an established session id.
fn with_session_cookie(id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(&session_cookie(id)) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Login / logout ============

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn handle_login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let logged_in = handle.session.lock().await.logged_in;
    if logged_in {
        return Redirect::to("/").into_response();
    }
    Html(pages::login_page(None)).into_response()
}

async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let handle = state.sessions.resolve(&headers);
    let mut session = handle.session.lock().await;

    if auth::login(&mut session, &state.config.auth, &form.username, &form.password) {
        // Always a fresh id, even for a session that was already stored.
        let id = state.sessions.establish(&handle);
        return with_session_cookie(&id, Redirect::to("/"));
    }

    let notice = Notice::error("Wrong username or password.");
    (
        StatusCode::UNAUTHORIZED,
        Html(pages::login_page(Some(&notice))),
    )
        .into_response()
}

async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    auth::logout(&mut *handle.session.lock().await);
    if let Some(id) = &handle.id {
        state.sessions.end(id);
    }

    let mut response = Redirect::to("/login").into_response();
    if let Ok(value) = HeaderValue::from_str(&expired_session_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

// ============ Paste page and actions ============

async fn handle_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let session = handle.session.lock().await;
    if !session.logged_in {
        return Redirect::to("/login").into_response();
    }
    let page = pages::input_page(&session.queue, &state.config.sheet.headers, None);
    Html(page).into_response()
}

#[derive(Deserialize)]
struct PasteForm {
    #[serde(default)]
    text: String,
}

async fn handle_process(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PasteForm>,
) -> Response {
    let handle = state.sessions.resolve(&headers);
    let mut session = handle.session.lock().await;
    if !session.logged_in {
        return Redirect::to("/login").into_response();
    }

    let (status, notice) = if form.text.trim().is_empty() {
        (
            StatusCode::OK,
            Notice::warning("Nothing pasted. Paste at least one row first."),
        )
    } else {
        match session.queue.process_paste(&form.text) {
            Ok(summary) => {
                tracing::info!(
                    accepted = summary.accepted,
                    skipped = summary.skipped,
                    total = session.queue.all().len(),
                    "processed paste"
                );
                (
                    StatusCode::OK,
                    Notice::success(format!(
                        "{} rows added, {} skipped.",
                        summary.accepted, summary.skipped
                    )),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "paste rejected");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Notice::error(format!("Processing failed, nothing was added: {}", e)),
                )
            }
        }
    };

    let page = pages::input_page(&session.queue, &state.config.sheet.headers, Some(&notice));
    (status, Html(page)).into_response()
}

async fn handle_reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let mut session = handle.session.lock().await;
    if !session.logged_in {
        return Redirect::to("/login").into_response();
    }

    session.queue.reset();
    tracing::info!("queue reset");

    let notice = Notice::success("All data cleared.");
    let page = pages::input_page(&session.queue, &state.config.sheet.headers, Some(&notice));
    Html(page).into_response()
}

async fn handle_submit(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let session = handle.session.lock().await;
    if !session.logged_in {
        return Redirect::to("/login").into_response();
    }

    let (status, notice) = match session.queue.submit(&state.writer).await {
        Ok(SubmitOutcome::NothingToSend) => (
            StatusCode::OK,
            Notice::info("Nothing to send. Process a paste first."),
        ),
        Ok(SubmitOutcome::Sent(report)) => (
            StatusCode::OK,
            Notice::success(format!(
                "Sent {} rows to the spreadsheet starting at row {}.",
                report.rows_written, report.start_row
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, rows = session.queue.last_batch().len(), "submit failed");
            (
                StatusCode::BAD_GATEWAY,
                Notice::error(format!(
                    "Sending failed: {}. The batch is kept, try again.",
                    e
                )),
            )
        }
    };

    let page = pages::input_page(&session.queue, &state.config.sheet.headers, Some(&notice));
    (status, Html(page)).into_response()
}

// ============ Export, dashboard, JSON ============

async fn handle_export(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let session = handle.session.lock().await;
    if !session.logged_in {
        return unauthorized().into_response();
    }

    let bytes = match records_to_csv(session.queue.all(), &state.config.sheet.headers) {
        Ok(bytes) => bytes,
        Err(e) => return internal(e.to_string()).into_response(),
    };

    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILENAME);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

async fn handle_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let logged_in = handle.session.lock().await.logged_in;
    if !logged_in {
        return Redirect::to("/login").into_response();
    }
    Html(pages::dashboard_page(&state.config.dashboard)).into_response()
}

#[derive(Serialize)]
struct QueueResponse<'a> {
    all: &'a [Record],
    last_batch: &'a [Record],
}

async fn handle_queue(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = state.sessions.resolve(&headers);
    let session = handle.session.lock().await;
    if !session.logged_in {
        return unauthorized().into_response();
    }
    let body = QueueResponse {
        all: session.queue.all(),
        last_batch: session.queue.last_batch(),
    };
    Json(body).into_response()
}
