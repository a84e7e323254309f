//! Avatar runtime server entry point: loads configuration, wires the
//! core crates together, and serves the thin HTTP/WS adapter.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use avatar_config::{load_settings, HostProfile, Settings};
use avatar_conversation::{ConversationConfig, ConversationCore};
use avatar_motion::MotionResolver;
use avatar_pipeline::EchoLanguageModel;
use avatar_server::{create_router, AppState, RuntimeHandles};
use avatar_store::Store;
use dashmap::DashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let env = std::env::var("AVATAR_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("failed to load configuration: {e}. Using defaults.");
            Settings::default()
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting avatar-server");

    let host_profile = HostProfile::detect();
    tracing::info!(
        tier = ?host_profile.performance_tier,
        llm_size = ?host_profile.llm_size,
        "detected host profile"
    );

    let data_dir = PathBuf::from(&config.store.data_dir);
    let store = Arc::new(Store::open(&data_dir)?);

    let bus = avatar_bus::EventBus::new();
    let conversation = Arc::new(ConversationCore::new(
        store.clone(),
        Arc::new(EchoLanguageModel),
        bus.clone(),
        ConversationConfig::default(),
    ));
    let motion = Arc::new(MotionResolver::new());

    let state = AppState {
        config: Arc::new(config.clone()),
        host_profile: Arc::new(host_profile),
        bus,
        store,
        conversation: conversation.clone(),
        motion,
        pipelines: Arc::new(DashMap::new()),
    };

    let (mut runtime, shutdown_rx) = RuntimeHandles::new();
    let conversation_task = tokio::spawn(async move { conversation.run(shutdown_rx).await });
    runtime.track(conversation_task);

    let app = create_router(state);
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or([127, 0, 0, 1].into()),
        config.server.port,
    ));
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let token = runtime.token();
    tokio::spawn(shutdown_signal(token.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    runtime.stop().await;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM and cancels `token`, which both stops
/// accepting new connections and unblocks `RuntimeHandles::stop`'s caller.
async fn shutdown_signal(token: tokio_util::sync::CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
    token.cancel();
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avatar_server=info,avatar_conversation=info,avatar_pipeline=info".into());
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
}
