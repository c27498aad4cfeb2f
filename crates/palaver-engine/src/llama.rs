//! llama.cpp `llama-server` client.
//!
//! Implements [`CompletionEngine`] against the native `POST /completion`
//! API of llama.cpp's bundled HTTP server. The engine can either attach to
//! a server that is already running or launch one itself from a GGUF model
//! artifact, holding the child process for the lifetime of the engine.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::{CompletionEngine, CompletionParams, EngineError};

const DEFAULT_SERVER_BIN: &str = "llama-server";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8311;

/// How long one completion request may run before it is abandoned and
/// surfaced as [`EngineError::Timeout`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Resource parameters for launching `llama-server` from a model artifact.
#[derive(Debug, Clone)]
pub struct LlamaServerConfig {
    /// Path to the GGUF model file.
    pub model_path: PathBuf,
    /// `llama-server` executable; resolved via `PATH` by default.
    pub server_bin: PathBuf,
    pub host: String,
    pub port: u16,
    /// Context window size in tokens.
    pub ctx_len: u32,
    pub threads: u32,
    /// GPU layers to offload; -1 offloads everything.
    pub gpu_layers: i32,
    pub batch_size: u32,
    /// Deadline for the server to report healthy after launch.
    pub startup_timeout: Duration,
}

impl LlamaServerConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            server_bin: PathBuf::from(DEFAULT_SERVER_BIN),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ctx_len: 64000,
            threads: 6,
            gpu_layers: -1,
            batch_size: 512,
            startup_timeout: Duration::from_secs(120),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// HTTP client for a llama.cpp `llama-server` instance.
#[derive(Debug)]
pub struct LlamaServerEngine {
    client: Client,
    base_url: String,
    // Child we launched ourselves; killed on drop.
    _server: Option<Child>,
}

impl LlamaServerEngine {
    /// Attach to an already-running server, probing `/health` once.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self, EngineError> {
        let engine = Self {
            client: build_client()?,
            base_url: base_url.into(),
            _server: None,
        };
        engine.check_health().await?;
        tracing::info!(base_url = %engine.base_url, "attached to llama-server");
        Ok(engine)
    }

    /// Launch `llama-server` from a model artifact and wait for it to
    /// become healthy.
    pub async fn spawn(config: LlamaServerConfig) -> Result<Self, EngineError> {
        if !config.model_path.exists() {
            return Err(EngineError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("model artifact not found: {}", config.model_path.display()),
            )));
        }

        tracing::info!(
            model = %config.model_path.display(),
            ctx_len = config.ctx_len,
            threads = config.threads,
            gpu_layers = config.gpu_layers,
            batch_size = config.batch_size,
            "launching llama-server"
        );

        let child = Command::new(&config.server_bin)
            .arg("-m")
            .arg(&config.model_path)
            .arg("--host")
            .arg(&config.host)
            .arg("--port")
            .arg(config.port.to_string())
            .arg("-c")
            .arg(config.ctx_len.to_string())
            .arg("-t")
            .arg(config.threads.to_string())
            .arg("-ngl")
            .arg(config.gpu_layers.to_string())
            .arg("-b")
            .arg(config.batch_size.to_string())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let engine = Self {
            client: build_client()?,
            base_url: config.base_url(),
            _server: Some(child),
        };
        engine.wait_ready(config.startup_timeout).await?;
        tracing::info!(base_url = %engine.base_url, "llama-server ready");
        Ok(engine)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check_health(&self) -> Result<(), EngineError> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .send()
            .await
            .map_err(|e| EngineError::NotReady(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(EngineError::NotReady(format!(
                "health probe returned HTTP {}",
                response.status().as_u16()
            )))
        }
    }

    async fn wait_ready(&self, deadline: Duration) -> Result<(), EngineError> {
        let started = Instant::now();
        loop {
            if self.check_health().await.is_ok() {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                return Err(EngineError::NotReady(format!(
                    "llama-server did not become healthy within {deadline:?}"
                )));
            }
            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl CompletionEngine for LlamaServerEngine {
    fn name(&self) -> &'static str {
        "llama-server"
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, EngineError> {
        let request = CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            stop: &params.stop,
        };

        let response = self
            .client
            .post(self.endpoint("/completion"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout(REQUEST_TIMEOUT)
                } else {
                    EngineError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Payload(e.to_string()))?;
        Ok(payload.content)
    }
}

fn build_client() -> Result<Client, EngineError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(EngineError::Transport)
}

/// Body of `POST /completion` in llama-server's native API.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}
