// ============================================================================
// HTTP Surface
// ============================================================================
//
// Single action-dispatch endpoint. The caller is automated content, so
// every failure is a structured, machine-readable body; there is no retry
// UI at this layer. Caller identity arrives out of band in the
// `x-learner-id` header set by the surrounding platform's auth proxy.
// ============================================================================

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::{LearnerId, RuntimeError};
use crate::service::{RuntimeReply, RuntimeRequest, RuntimeService};

pub const CALLER_HEADER: &str = "x-learner-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RuntimeService>,
}

impl AppState {
    pub fn new(service: Arc<RuntimeService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub struct WebError(pub RuntimeError);

impl From<RuntimeError> for WebError {
    fn from(err: RuntimeError) -> Self {
        Self(err)
    }
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RuntimeError::Authentication(_) => StatusCode::UNAUTHORIZED,
            RuntimeError::Entitlement(_) => StatusCode::FORBIDDEN,
            RuntimeError::PackageNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            RuntimeError::SessionState(_) | RuntimeError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            RuntimeError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            RuntimeError::Persistence(_) | RuntimeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        });
        (status, body).into_response()
    }
}

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn healthcheck() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn dispatch_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RuntimeRequest>,
) -> WebResult<Json<RuntimeReply>> {
    let caller = caller_identity(&headers)?;
    let reply = state.service.dispatch(caller, request).await?;
    Ok(Json(reply))
}

/// Resolve the authenticated caller from the out-of-band identity header.
fn caller_identity(headers: &HeaderMap) -> WebResult<LearnerId> {
    let raw = headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            WebError(RuntimeError::Authentication(format!(
                "missing {CALLER_HEADER} header"
            )))
        })?;

    raw.parse::<LearnerId>().map_err(|_| {
        WebError(RuntimeError::Authentication(format!(
            "malformed {CALLER_HEADER} header"
        )))
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/api/v1/runtime", post(dispatch_action))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
