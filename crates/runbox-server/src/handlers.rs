//! HTTP handlers for the runbox API

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use runbox::{ExecutionRequest, ExecutionResult, RunnerError};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{error, warn};

use crate::AppState;

/// Body of `POST /execute`.
///
/// Both fields are optional here so that a missing field is reported with
/// the service's own 400 message rather than a deserializer error.
#[derive(Debug, Default, Deserialize)]
pub struct ExecutePayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecuteResponse {
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: None,
        }
    }
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            success: result.is_success(),
            output: result.output,
            exit_code: result.exit_code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub id: String,
    pub name: String,
    pub compiled: bool,
    pub available: bool,
    pub aliases: Vec<String>,
}

fn server_error(message: impl std::fmt::Display) -> (StatusCode, Json<ExecuteResponse>) {
    error!(%message, "execution failed unexpectedly");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ExecuteResponse::failure(format!("Server error: {message}"))),
    )
}

/// POST /execute - Run a code submission and wait for the result
pub async fn execute(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    // Empty or malformed bodies are treated like missing fields
    let payload: ExecutePayload = serde_json::from_slice(&body).unwrap_or_default();

    let request = match ExecutionRequest::new(
        payload.code.unwrap_or_default(),
        payload.language.unwrap_or_default(),
    ) {
        Ok(request) => request,
        Err(e) => {
            warn!("rejected request: {e}");
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecuteResponse::failure(e.to_string())),
            );
        }
    };

    // A panic inside the runner surfaces as a JoinError instead of
    // tearing down the connection
    let runner = state.runner.clone();
    let task = tokio::spawn(async move { runner.execute(&request).await });

    execution_response(task.await)
}

/// Map the outcome of an execution task to a status and body.
///
/// Runner errors and panics are the only way to a 500.
fn execution_response(
    joined: Result<Result<ExecutionResult, RunnerError>, JoinError>,
) -> (StatusCode, Json<ExecuteResponse>) {
    match joined {
        Ok(Ok(result)) => (StatusCode::OK, Json(result.into())),
        Ok(Err(e)) => server_error(e),
        Err(e) => server_error(e),
    }
}

/// GET /health - Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /languages - Configured languages, sorted by id
pub async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    let mut languages: Vec<_> = state
        .runner
        .config()
        .languages
        .iter()
        .map(|(id, lang)| LanguageInfo {
            id: id.clone(),
            name: lang.name.clone(),
            compiled: lang.is_compiled(),
            available: lang.is_available(),
            aliases: lang.aliases.clone(),
        })
        .collect();
    languages.sort_by(|a, b| a.id.cmp(&b.id));
    Json(languages)
}
