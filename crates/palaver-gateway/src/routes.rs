//! HTTP routes for the Palaver gateway.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use palaver_core::Turn;
use palaver_context::render_prompt;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the gateway router.
pub fn build_routes(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Serve the chat page.
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Ok(Html(page)),
        Err(_) => Err(ApiError::NotFound("index.html")),
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub response: String,
    /// Engine latency in seconds, rounded to centiseconds.
    pub duration: f64,
}

/// Run one user message through the history/prompt/completion cycle.
///
/// The user turn is appended optimistically before generation so that the
/// prompt window can include it; a failed generation compensates by rolling
/// back exactly that turn. The slow engine call runs without any history
/// lock held, so concurrent requests may interleave their appends.
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let engine = state.engine.as_ref().ok_or(ApiError::EngineUnavailable)?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::EmptyPrompt);
    }

    tracing::info!(prompt_len = request.prompt.len(), "received prompt");

    let user_turn = Turn::user(request.prompt);
    state.history.append(user_turn.clone()).await;

    let window = state.history.window(state.settings.max_history_turns).await;
    let prompt = render_prompt(&window);
    tracing::debug!(%prompt, "formatted prompt");

    let started = Instant::now();
    match engine.complete(&prompt, &state.settings.params).await {
        Ok(text) => {
            let duration = round_secs(started.elapsed());
            let reply = text.trim().to_string();
            state.history.append(Turn::assistant(reply.clone())).await;
            state.history.prune(state.settings.max_history_len).await;
            tracing::info!(duration, reply_len = reply.len(), "generated response");
            Ok(Json(GenerateResponse {
                response: reply,
                duration,
            }))
        }
        Err(err) => {
            if state.history.rollback_if_tail(&user_turn).await {
                tracing::info!("rolled back user turn after failed generation");
            }
            tracing::error!(error = %err, "text generation failed");
            Err(ApiError::Engine(err))
        }
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
