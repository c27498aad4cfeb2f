//! Palaver Gateway - chat front-end entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use palaver_engine::{CompletionEngine, LlamaServerConfig, LlamaServerEngine};
use palaver_gateway::{build_routes, AppState, ChatSettings};

/// Command-line and environment configuration.
#[derive(Debug, Parser)]
#[command(name = "palaver-gateway", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "PALAVER_BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: SocketAddr,

    /// GGUF model artifact to launch llama-server with.
    #[arg(long, env = "PALAVER_MODEL_PATH", conflicts_with = "engine_url")]
    model_path: Option<PathBuf>,

    /// Attach to an already-running llama-server instead of launching one.
    #[arg(long, env = "PALAVER_ENGINE_URL")]
    engine_url: Option<String>,

    /// llama-server executable used when launching from a model artifact.
    #[arg(long, env = "PALAVER_SERVER_BIN", default_value = "llama-server")]
    server_bin: PathBuf,

    /// Context window size in tokens.
    #[arg(long, env = "PALAVER_CTX_LEN", default_value_t = 64000)]
    ctx_len: u32,

    /// Inference threads.
    #[arg(long, env = "PALAVER_THREADS", default_value_t = 6)]
    threads: u32,

    /// GPU layers to offload; -1 offloads everything.
    #[arg(
        long,
        env = "PALAVER_GPU_LAYERS",
        default_value_t = -1,
        allow_hyphen_values = true
    )]
    gpu_layers: i32,

    /// Prompt batch size.
    #[arg(long, env = "PALAVER_BATCH_SIZE", default_value_t = 512)]
    batch_size: u32,

    /// Exchanges included in each prompt window.
    #[arg(long, env = "PALAVER_MAX_HISTORY_TURNS", default_value_t = 5)]
    max_history_turns: usize,

    /// Turns retained after history pruning.
    #[arg(long, env = "PALAVER_MAX_HISTORY_LEN", default_value_t = 20)]
    max_history_len: usize,

    /// Directory holding the chat page and its assets.
    #[arg(long, env = "PALAVER_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "palaver_gateway=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!(
        "Starting Palaver Gateway v{}",
        palaver_gateway::GATEWAY_VERSION
    );

    let engine = init_engine(&args).await;
    if engine.is_none() {
        tracing::warn!("no completion engine available; /generate will report 503");
    }

    let settings = ChatSettings {
        max_history_turns: args.max_history_turns,
        max_history_len: args.max_history_len,
        ..ChatSettings::default()
    };
    let state = AppState::new(engine, settings, args.static_dir.clone());

    let app = build_routes(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", args.bind_addr);

    let listener = tokio::net::TcpListener::bind(args.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the completion engine once at startup.
///
/// Failure leaves the gateway running without an engine rather than
/// crashing the process; `/generate` reports unavailability instead.
async fn init_engine(args: &Args) -> Option<Arc<dyn CompletionEngine>> {
    let result = match (&args.engine_url, &args.model_path) {
        (Some(url), _) => LlamaServerEngine::connect(url.clone()).await,
        (None, Some(model_path)) => {
            let config = LlamaServerConfig {
                server_bin: args.server_bin.clone(),
                ctx_len: args.ctx_len,
                threads: args.threads,
                gpu_layers: args.gpu_layers,
                batch_size: args.batch_size,
                ..LlamaServerConfig::new(model_path.clone())
            };
            LlamaServerEngine::spawn(config).await
        }
        (None, None) => {
            tracing::error!("neither --model-path nor --engine-url given; nothing to initialize");
            return None;
        }
    };

    match result {
        Ok(engine) => Some(Arc::new(engine) as Arc<dyn CompletionEngine>),
        Err(err) => {
            tracing::error!(error = %err, "completion engine failed to initialize");
            None
        }
    }
}
