//! API request handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::api::session::resolve_session;
use crate::api::types::*;
use crate::conversation::ConversationOrchestrator;
use crate::errors::BarcraftError;
use crate::export::parse_recipient;
use crate::export::MailTransport;
use crate::export::PdfAttachment;
use crate::export::PdfExporter;
use crate::llm::CompletionError;
use crate::models::SessionId;
use crate::models::SessionState;
use crate::models::Turn;

const INDEX_HTML: &str = include_str!("static/index.html");
const NO_HISTORY: &str = "No chat history available";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub exporter: Arc<PdfExporter>,
    /// `None` when no `[smtp]` section is configured
    pub mailer: Option<Arc<dyn MailTransport>>,
    pub cookie_name: Arc<str>,
}

/// HTTP status for an error kind
pub fn status_for(err: &BarcraftError) -> StatusCode {
    match err {
        BarcraftError::Validation(_) => StatusCode::BAD_REQUEST,
        BarcraftError::AlreadySet(_) => StatusCode::CONFLICT,
        BarcraftError::Retrieval(_) | BarcraftError::RetrievalUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BarcraftError::CompletionFailure(CompletionError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        BarcraftError::CompletionFailure(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json<T: serde::Serialize>(status: StatusCode, body: ApiResponse<T>) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(err: &BarcraftError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    json(status, ApiResponse::<()>::error(err.to_string()))
}

/// Error plus the session's current view, so the page can keep rendering it
async fn error_with_view(state: &AppState, id: &SessionId, err: &BarcraftError) -> Response {
    match state.orchestrator.snapshot(id).await {
        Ok(session) => {
            let status = status_for(err);
            warn!("Turn failed, conversation unchanged: {}", err);
            json(status, ApiResponse::error_with(ChatView::from(session), err.to_string()))
        }
        Err(snapshot_err) => {
            error!("Cannot read session after failure: {}", snapshot_err);
            error_response(err)
        }
    }
}

async fn history(state: &AppState, id: &SessionId) -> Result<Vec<Turn>, Response> {
    let turns = state
        .orchestrator
        .snapshot(id)
        .await
        .map_err(|e| error_response(&e))?
        .turns;
    if turns.is_empty() {
        return Err(json(StatusCode::BAD_REQUEST, ApiResponse::<()>::error(NO_HISTORY)));
    }
    Ok(turns)
}

async fn render_pdf(exporter: Arc<PdfExporter>, turns: Vec<Turn>) -> Result<Vec<u8>, BarcraftError> {
    tokio::task::spawn_blocking(move || exporter.render(&turns))
        .await
        .map_err(|e| BarcraftError::ExportFailure(format!("render task: {e}")))?
}

/// Single-page front end
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mail_enabled: state.mailer.is_some(),
    }))
}

/// Current conversation for the caller's session
pub async fn conversation(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let (jar, id) = resolve_session(jar, &state.cookie_name);
    let response = match state.orchestrator.snapshot(&id).await {
        Ok(session) => json(StatusCode::OK, ApiResponse::success(ChatView::from(session))),
        Err(e) => error_response(&e),
    };
    (jar, response)
}

/// Concept and/or prompt submission
pub async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (CookieJar, Response) {
    let (jar, id) = resolve_session(jar, &state.cookie_name);
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return (
                jar,
                json(StatusCode::BAD_REQUEST, ApiResponse::<()>::error(rejection.body_text())),
            )
        }
    };

    info!("POST /api/chat session={}", id);
    let response = match state
        .orchestrator
        .submit(&id, request.concept.as_deref(), request.prompt.as_deref())
        .await
    {
        Ok(outcome) => json(StatusCode::OK, ApiResponse::success(ChatView::from(outcome))),
        Err(e) if e.is_recoverable() => error_with_view(&state, &id, &e).await,
        Err(e) => error_response(&e),
    };
    (jar, response)
}

/// Forget concept and turns
pub async fn reset(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let (jar, id) = resolve_session(jar, &state.cookie_name);
    info!("POST /api/reset session={}", id);
    let response = match state.orchestrator.reset(&id).await {
        Ok(()) => json(
            StatusCode::OK,
            ApiResponse::success(ChatView::from(SessionState::new(id))),
        ),
        Err(e) => error_response(&e),
    };
    (jar, response)
}

/// Transcript as a PDF download
pub async fn download(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Response) {
    let (jar, id) = resolve_session(jar, &state.cookie_name);
    let turns = match history(&state, &id).await {
        Ok(turns) => turns,
        Err(response) => return (jar, response),
    };

    let response = match render_pdf(state.exporter.clone(), turns).await {
        Ok(bytes) => {
            info!("PDF export for session {} ({} bytes)", id, bytes.len());
            let disposition = format!("attachment; filename=\"{}\"", state.exporter.file_name());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    };
    (jar, response)
}

/// Mail the transcript PDF to a supplied address
pub async fn email(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> (CookieJar, Response) {
    let (jar, id) = resolve_session(jar, &state.cookie_name);
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let turns = match history(&state, &id).await {
        Ok(turns) => turns,
        Err(response) => return (jar, response),
    };

    let recipient = match parse_recipient(request.email.as_deref().unwrap_or_default()) {
        Ok(address) => address,
        Err(e) => return (jar, error_response(&e)),
    };

    let Some(mailer) = state.mailer.clone() else {
        return (
            jar,
            json(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::<()>::error("Mail delivery is not configured"),
            ),
        );
    };

    let result = async {
        let bytes = render_pdf(state.exporter.clone(), turns).await?;
        let attachment = PdfAttachment {
            file_name: state.exporter.file_name().to_string(),
            bytes,
        };
        mailer.send_pdf(&recipient, attachment).await
    }
    .await;

    let response = match result {
        Ok(()) => json(
            StatusCode::OK,
            ApiResponse::success(EmailSent {
                recipient: recipient.to_string(),
                message: "Email sent successfully!".to_string(),
            }),
        ),
        Err(e) => json(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::<()>::error(format!("Error sending email: {e}")),
        ),
    };
    (jar, response)
}
