use anyhow::{Context, Result};
use clap::Parser;
use jarvis_realtime::{
    create_router, AppState, AudioBackend, ChannelBackend, Config, ConnectionOrchestrator,
    FileBackend, GlassesAudioBridge, GlassesAudioRouter, InMemoryGlassesManager,
    InMemoryMessageStore, NatsTransport, StartupCoordinator,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(about = "Realtime voice session core with smart-glasses audio")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/jarvis")]
    config: String,

    /// Open a realtime session once startup completes
    #[arg(long)]
    connect: bool,

    /// Replay a WAV file as the glasses microphone
    #[arg(long)]
    replay: Option<PathBuf>,

    /// How long to wait for startup before serving anyway, in seconds
    #[arg(long, default_value = "30")]
    startup_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Jarvis realtime core v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    // Storage and glasses
    let store = Arc::new(InMemoryMessageStore::new());
    let glasses = Arc::new(InMemoryGlassesManager::new(
        cfg.glasses.persisted_device.clone(),
        cfg.glasses.bluetooth_enabled,
        cfg.glasses.permissions_granted,
    ));

    // Realtime transport and orchestrator
    let transport = Arc::new(NatsTransport::new(
        cfg.transport.nats_url.clone(),
        cfg.audio.sample_rate,
        cfg.audio.channels,
    ));
    let orchestrator = Arc::new(ConnectionOrchestrator::new(transport, store.clone()));

    // Glasses audio capture
    let backend_config = cfg.audio_backend_config();
    let backend: Box<dyn AudioBackend> = match args.replay.or(cfg.audio.replay_file.clone()) {
        Some(path) => {
            info!("Glasses microphone replays {}", path.display());
            Box::new(FileBackend::new(path, backend_config.clone()))
        }
        None => {
            // No Bluetooth layer feeds the injector in the standalone binary.
            // Dropping it makes routing fail, so the phone microphone stays on.
            warn!("No glasses audio source configured, glasses will use the phone microphone");
            let (backend, _) = ChannelBackend::new(&backend_config);
            Box::new(backend)
        }
    };
    let router = Arc::new(GlassesAudioRouter::new(backend, backend_config));

    let bridge = Arc::new(GlassesAudioBridge::new(
        glasses.clone(),
        orchestrator.clone(),
        router,
        cfg.audio.frame_queue_capacity,
    ));
    bridge.start().await;

    let startup = Arc::new(StartupCoordinator::new(
        store.clone(),
        glasses.clone(),
        cfg.startup_options(),
    ));
    startup.initialize().await;

    if !startup
        .wait_for_initialization(Duration::from_secs(args.startup_timeout))
        .await
    {
        warn!("Startup not finished: {:?}", startup.current_state());
    }

    let session_config = cfg.session_config();
    if args.connect {
        orchestrator.connect(session_config.clone()).await;
    }

    let state = AppState {
        orchestrator: orchestrator.clone(),
        bridge: bridge.clone(),
        startup,
        messages: store,
        session_config,
    };
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");
    bridge.cleanup().await;
    orchestrator.disconnect().await;

    Ok(())
}
