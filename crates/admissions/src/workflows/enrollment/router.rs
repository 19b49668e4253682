use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::session::SessionContext;

use super::attachments::MAX_ATTACHMENT_BYTES;
use super::backend::EnrollmentBackend;
use super::schema::{StepKind, StepSchema};
use super::service::{EnrollmentService, SessionError, SessionId};
use super::wizard::{WizardError, WizardView};

/// Router builder exposing the wizard as a session-oriented HTTP API.
pub fn enrollment_router<B>(service: Arc<EnrollmentService<B>>) -> Router
where
    B: EnrollmentBackend + Clone + 'static,
{
    Router::new()
        .route("/api/v1/enrollment/steps", get(steps_handler))
        .route(
            "/api/v1/enrollment/sessions",
            post(create_session_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id",
            get(view_handler::<B>).delete(delete_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/start",
            post(start_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/resume",
            post(resume_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/fields",
            patch(fields_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/attachments/:field",
            put(attach_handler::<B>).delete(detach_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/save",
            post(save_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/next",
            post(next_handler::<B>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/previous",
            post(previous_handler::<B>),
        )
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 64 * 1024))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub welcome_name: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_id: SessionId,
    session: WizardView,
}

#[derive(Debug, Serialize)]
struct StepListing {
    position: usize,
    #[serde(flatten)]
    schema: &'static StepSchema,
}

pub(crate) async fn steps_handler() -> Response {
    let steps: Vec<StepListing> = StepKind::ALL
        .into_iter()
        .map(|kind| StepListing {
            position: kind.position(),
            schema: kind.schema(),
        })
        .collect();
    (StatusCode::OK, Json(json!({ "steps": steps }))).into_response()
}

pub(crate) async fn create_session_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        match serde_json::from_slice::<CreateSessionRequest>(&body) {
            Ok(request) => request,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
        }
    };

    let token = bearer_token(&headers).or(request.auth_token);
    let (session_id, session) =
        match service.create(SessionContext::new(request.welcome_name, token)) {
            Ok(created) => created,
            Err(err) => return session_error_response(err),
        };
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            session,
        }),
    )
        .into_response()
}

pub(crate) async fn view_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    match service.view(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn delete_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    match service.remove(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn start_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    wizard.start_new();
    (StatusCode::OK, Json(wizard.view())).into_response()
}

pub(crate) async fn resume_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
    Json(request): Json<ResumeRequest>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.resume(&request.code).await {
        Ok(_) => (StatusCode::OK, Json(wizard.view())).into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn fields_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
    Json(edits): Json<Map<String, Value>>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.edit_many(edits) {
        Ok(_) => (StatusCode::OK, Json(wizard.view())).into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn attach_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path((session_id, field)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let content_type = header_text(&headers, header::CONTENT_TYPE.as_str()).unwrap_or_default();
    let file_name = header_text(&headers, "x-file-name").unwrap_or_default();

    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.attach(&field, &file_name, &content_type, body.to_vec()) {
        Ok(attachment) => (
            StatusCode::OK,
            Json(json!({ "attachment": attachment, "session": wizard.view() })),
        )
            .into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn detach_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path((session_id, field)): Path<(String, String)>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.detach(&field) {
        Ok(_) => (StatusCode::OK, Json(wizard.view())).into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn save_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.save().await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({ "receipt": receipt, "session": wizard.view() })),
        )
            .into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn next_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    match wizard.next().await {
        Ok(_) => (StatusCode::OK, Json(wizard.view())).into_response(),
        Err(err) => wizard_error_response(&err, wizard.view()),
    }
}

pub(crate) async fn previous_handler<B>(
    State(service): State<Arc<EnrollmentService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: EnrollmentBackend + Clone + 'static,
{
    let mut wizard = match service.lease(&SessionId(session_id)) {
        Ok(wizard) => wizard,
        Err(err) => return session_error_response(err),
    };
    wizard.previous();
    (StatusCode::OK, Json(wizard.view())).into_response()
}

pub(crate) fn wizard_status(err: &WizardError) -> StatusCode {
    match err {
        WizardError::NotStarted | WizardError::AlreadyComplete { .. } => StatusCode::CONFLICT,
        WizardError::StepIncomplete { .. }
        | WizardError::InvalidAdmissionCode
        | WizardError::Validation(_)
        | WizardError::Attachment(_)
        | WizardError::UnknownField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WizardError::UnknownAdmissionCode(_) => StatusCode::NOT_FOUND,
        WizardError::CheckpointFailed(_) | WizardError::SaveFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn wizard_error_response(err: &WizardError, view: WizardView) -> Response {
    let fields: BTreeMap<String, String> = match err {
        WizardError::Validation(report) => report.errors().clone(),
        _ => BTreeMap::new(),
    };
    let payload = json!({
        "error": err.user_message(),
        "fields": fields,
        "session": view,
    });
    (wizard_status(err), Json(payload)).into_response()
}

fn session_error_response(err: SessionError) -> Response {
    let status = match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Busy(_) => StatusCode::CONFLICT,
        SessionError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    header_text(headers, header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer ").map(str::to_string))
}
