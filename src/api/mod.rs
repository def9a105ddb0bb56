//! HTTP API handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::controllers::Command;
use crate::devices::DeviceStore;
use crate::error::ControllerError;
use crate::remote::{Remote, RemoteError, RemoteSummary};
use crate::updates::{UpdateChecker, UpdateStatus};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Remotes are wired at startup and immutable afterwards; only their
    /// command tables change.
    pub remotes: Arc<HashMap<String, Arc<Remote>>>,
    pub store: Arc<DeviceStore>,
    pub updates: Arc<UpdateChecker>,
}

impl AppState {
    pub fn new(
        remotes: HashMap<String, Arc<Remote>>,
        store: Arc<DeviceStore>,
        updates: Arc<UpdateChecker>,
    ) -> Self {
        Self {
            remotes: Arc::new(remotes),
            store,
            updates,
        }
    }

    fn remote(&self, name: &str) -> Result<&Arc<Remote>, ApiError> {
        self.remotes
            .get(name)
            .ok_or_else(|| ApiError::not_found(format!("Remote not found: {name}")))
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// API-level error with its HTTP mapping already decided.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        let status = match &err {
            RemoteError::UnknownCommand(_) => StatusCode::NOT_FOUND,
            RemoteError::Controller(ControllerError::LearnUnsupported(_)) => {
                StatusCode::BAD_REQUEST
            }
            // Conversion and dispatch failures mean the bridge could not
            // deliver to the backend.
            RemoteError::Controller(_) => StatusCode::BAD_GATEWAY,
            RemoteError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub git_sha: &'static str,
    pub remotes: usize,
    pub update: UpdateStatus,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "ir-control-bridge",
        version: env!("ICB_VERSION"),
        git_sha: env!("ICB_GIT_SHA"),
        remotes: state.remotes.len(),
        update: state.updates.status().await,
    })
}

// =============================================================================
// Remote handlers
// =============================================================================

/// GET /remotes - List configured remotes
pub async fn list_remotes_handler(State(state): State<AppState>) -> Json<Vec<RemoteSummary>> {
    let mut summaries = Vec::with_capacity(state.remotes.len());
    for remote in state.remotes.values() {
        summaries.push(remote.summary().await);
    }
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    Json(summaries)
}

/// GET /remotes/{name} - One remote with its command table
pub async fn get_remote_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.remote(&name) {
        Ok(remote) => (StatusCode::OK, Json(remote.summary().await)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Send request body: named commands from the device table, or a raw
/// payload dispatched as-is.
#[derive(Deserialize)]
pub struct SendRequest {
    pub command: Command,
    #[serde(default)]
    pub raw: bool,
}

/// POST /remotes/{name}/send - Send one or more commands
pub async fn send_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SendRequest>,
) -> impl IntoResponse {
    let result = async {
        let remote = state.remote(&name)?;
        if req.raw {
            remote.send_raw(&req.command).await?;
        } else {
            remote.send_named(req.command.tokens()).await?;
        }
        Ok::<_, ApiError>(())
    }
    .await;

    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Learn request body
#[derive(Deserialize)]
pub struct LearnRequest {
    /// Name to store the captured code under.
    pub command: String,
}

/// POST /remotes/{name}/learn - Capture a code into the override store
pub async fn learn_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<LearnRequest>,
) -> impl IntoResponse {
    let result = async {
        let remote = state.remote(&name)?;
        let code = remote.learn_into(&req.command, &state.store).await?;
        Ok::<_, ApiError>(code)
    }
    .await;

    match result {
        Ok(Some(code)) => (
            StatusCode::OK,
            Json(serde_json::json!({"command": req.command, "code": code})),
        )
            .into_response(),
        Ok(None) => ApiError::not_found("no code captured before the learn deadline")
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// DELETE /remotes/{name}/commands/{command} - Drop a learned command
pub async fn delete_command_handler(
    State(state): State<AppState>,
    Path((name, command)): Path<(String, String)>,
) -> impl IntoResponse {
    let result = async {
        let remote = state.remote(&name)?;
        let removed = remote.delete_command(&command, &state.store).await?;
        Ok::<_, ApiError>(removed)
    }
    .await;

    match result {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            ApiError::not_found(format!("Command not found: {command}")).into_response()
        }
        Err(err) => err.into_response(),
    }
}
