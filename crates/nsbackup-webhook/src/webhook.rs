//! Namespace admission webhook
//!
//! Receives AdmissionReview requests for namespaces, decides which backup
//! lifecycle actions the label change requires, runs them, and always
//! answers with `allowed: true`. Backup bookkeeping never blocks the
//! namespace mutation itself; failures are reported as HTTP errors.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use kube::{
    api::DynamicObject,
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
};
use nsbackup_core::{CoreError, LabelKeys, OperationKind, OperationRecord, decide};
use nsbackup_kube::{ExecutionError, LifecycleExecutor};
use tracing::{debug, error, info};

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    pub executor: LifecycleExecutor,
}

impl WebhookState {
    pub fn new(executor: LifecycleExecutor) -> Self {
        Self { executor }
    }
}

/// Error type for webhook operations
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Content-Type: {0:?} should be \"application/json\"")]
    UnsupportedContentType(String),

    #[error("admission request body is empty")]
    EmptyBody,

    /// The admission review envelope was invalid or malformed
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    #[error(transparent)]
    Decode(#[from] CoreError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::UnsupportedContentType(_)
            | WebhookError::EmptyBody
            | WebhookError::InvalidReview(_) => StatusCode::BAD_REQUEST,
            WebhookError::Decode(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Create the webhook router
///
/// - POST /validate - namespace admission reviews
/// - GET /health - liveness probe
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/validate", post(review_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    debug!("healthy");
    "ok"
}

/// Handle one AdmissionReview
pub async fn review_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let result = async {
        let request = parse_request(&headers, &body)?;
        let response = admit(&state, &request).await?;
        Ok::<_, WebhookError>(response.into_review())
    }
    .await;

    match result {
        Ok(review) => Ok(Json(review)),
        Err(e) => {
            error!(error = %e, status = %e.status(), "Failed to handle admission review");
            Err(e)
        }
    }
}

/// Validate the envelope and extract the admission request
pub fn parse_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AdmissionRequest<DynamicObject>, WebhookError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != "application/json" {
        return Err(WebhookError::UnsupportedContentType(content_type.to_string()));
    }
    if body.is_empty() {
        return Err(WebhookError::EmptyBody);
    }

    let review: AdmissionReview<DynamicObject> = serde_json::from_slice(body)
        .map_err(|e| WebhookError::InvalidReview(format!("failed to parse admission request: {}", e)))?;
    TryInto::<AdmissionRequest<DynamicObject>>::try_into(review)
        .map_err(|e| WebhookError::InvalidReview(e.to_string()))
}

fn operation_kind(operation: &Operation) -> OperationKind {
    match operation {
        Operation::Create => OperationKind::Create,
        Operation::Update => OperationKind::Update,
        Operation::Delete => OperationKind::Delete,
        Operation::Connect => OperationKind::Other("CONNECT".to_string()),
    }
}

/// Build the operation record for a request
pub fn record_for(
    request: &AdmissionRequest<DynamicObject>,
    keys: &LabelKeys,
) -> Result<OperationRecord, WebhookError> {
    let current = request.object.as_ref().map(serde_json::to_value).transpose()?;
    let previous = request.old_object.as_ref().map(serde_json::to_value).transpose()?;

    Ok(OperationRecord::from_payloads(
        operation_kind(&request.operation),
        &request.name,
        current.as_ref(),
        previous.as_ref(),
        keys,
    )?)
}

/// Decide and execute backup actions for one request
pub async fn admit(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<AdmissionResponse, WebhookError> {
    let uid = request.uid.as_str();
    let record = record_for(request, &state.executor.config().labels)?;

    if !record.kind.is_recognized() {
        info!(uid = %uid, operation = %record.kind, "Unknown operation");
        return Ok(AdmissionResponse::from(request));
    }

    info!(
        uid = %uid,
        namespace = %record.resource_name,
        operation = %record.kind,
        enrolled = record.current.enrolled,
        was_enrolled = record.previous.enrolled,
        "Namespace admission"
    );

    let actions = decide(&record);
    if actions.is_empty() {
        debug!(uid = %uid, namespace = %record.resource_name, "No backup changes required");
        return Ok(AdmissionResponse::from(request));
    }

    if request.dry_run {
        for action in &actions {
            info!(uid = %uid, namespace = %record.resource_name, action = %action, "Dry run, skipping");
        }
        return Ok(AdmissionResponse::from(request));
    }

    let report = state
        .executor
        .execute(&record.resource_name, &actions)
        .await?;
    info!(uid = %uid, namespace = %record.resource_name, result = %report, "Backup lifecycle updated");

    Ok(AdmissionResponse::from(request))
}
