use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::config::{BranchPolicy, ServiceConfig};
use crate::constants::{EVENT_HEADER, FALLBACK_BRANCH, SIGNATURE_HEADER, WEBHOOK_ROUTE};
use crate::event::{RepositoryCreated, WebhookEvent};
use crate::github::{GatewayError, GitHub};
use crate::retry::{self, retry, RetryError};

use super::protect::{self, ProtectionResult, Target};
use super::signature::{self, SignatureError};

/// GitHub caps webhook payloads at 25 MB.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
struct AppState {
    secret: Arc<SecretString>,
    policy: Arc<BranchPolicy>,
    github: GitHub,
    retry: retry::Policy,
    branch: Option<Arc<str>>,
    read_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum WebhookError {
    #[error("{0}")]
    Signature(#[from] SignatureError),
    #[error("missing {} header", EVENT_HEADER)]
    MissingEventKind,
    #[error("invalid event payload: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("timed out reading request body")]
    ReadTimeout,
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    #[error("failed to apply branch protection: {0}")]
    Apply(#[source] RetryError<GatewayError>),
}

impl WebhookError {
    fn status(&self) -> StatusCode {
        match self {
            WebhookError::Signature(_) => StatusCode::UNAUTHORIZED,
            WebhookError::MissingEventKind | WebhookError::Payload(_) | WebhookError::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::ReadTimeout => StatusCode::REQUEST_TIMEOUT,
            WebhookError::Apply(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<String, WebhookError> {
    let body = tokio::time::timeout(state.read_timeout, axum::body::to_bytes(body, MAX_BODY_BYTES))
        .await
        .map_err(|_| WebhookError::ReadTimeout)?
        .map_err(WebhookError::Body)?;
    if let Err(e) = signature::verify(
        state.secret.expose_secret().as_bytes(),
        headers.get(SIGNATURE_HEADER),
        &body,
    ) {
        tracing::warn!("Rejecting webhook delivery: {e}");
        return Err(e.into());
    }
    let kind = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingEventKind)?;
    let event = WebhookEvent::parse(kind, &body).map_err(|e| {
        tracing::warn!("Failed to parse {kind} event: {e}");
        WebhookError::Payload(e)
    })?;

    match event {
        WebhookEvent::RepositoryCreated(created) => {
            let span = tracing::info_span!(
                "repository_created",
                owner = %created.owner,
                repo = %created.repo
            );
            on_repository_created(&state, &created).instrument(span).await
        }
        WebhookEvent::Ignored { kind, action } => {
            tracing::debug!("Ignoring {kind} event (action: {action:?})");
            Ok("ignored".to_owned())
        }
    }
}

async fn on_repository_created(
    state: &AppState,
    created: &RepositoryCreated,
) -> Result<String, WebhookError> {
    let branch = state
        .branch
        .as_deref()
        .or(created.default_branch.as_deref())
        .unwrap_or(FALLBACK_BRANCH);
    let target = Target {
        owner: &created.owner,
        repo: &created.repo,
        branch,
    };
    tracing::info!("Adding branch protection policy to {created}@{branch}");

    let applied = retry(state.retry, || protect::apply(&state.github, &state.policy, target))
        .await
        .map_err(|e| {
            tracing::error!(
                attempts = e.attempts(),
                rate_limited = e.last().is_rate_limited(),
                "Error creating branch protection: {e}"
            );
            WebhookError::Apply(e)
        })?;
    let result = ProtectionResult::from(&applied);
    tracing::info!(
        protected = result.protection_applied,
        signed_commits = result.signatures_applied,
        "Protection added:\n{}",
        result.raw_summary
    );

    match protect::notify(&state.github, &state.policy, target, &result).await {
        Ok(issue) => tracing::info!("Created issue #{}: {}", issue.number, issue.html_url),
        // protection stays in place; there is nothing to roll back
        Err(e) => tracing::error!("Failed to create notification issue for {created}: {e:#}"),
    }
    Ok("protected".to_owned())
}

pub(crate) fn router(config: &ServiceConfig, github: GitHub) -> Router {
    let state = AppState {
        secret: Arc::clone(&config.webhook_secret),
        policy: Arc::clone(&config.policy),
        github,
        retry: config.retry,
        branch: config.branch.as_deref().map(Arc::from),
        read_timeout: config.read_timeout,
    };

    Router::new()
        .route(WEBHOOK_ROUTE, post(handle))
        .layer(TimeoutLayer::new(config.write_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
