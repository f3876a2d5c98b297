use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use voice_sos::incident::IncidentAssembler;
use voice_sos::location::{
    FixedLocationProvider, Location, LocationProvider, UnavailableLocationProvider,
};
use voice_sos::recognition::RecognizerFactory;
use voice_sos::store::{LocalStore, NotificationStore};
use voice_sos::{create_router, AppState, AudioSource, Config, VoiceActivationController};

#[derive(Parser, Debug)]
#[command(name = "voicesos", about = "Voice-triggered emergency alert service")]
struct Args {
    /// Config file stem (TOML), without extension
    #[arg(long, default_value = "config/voice-sos")]
    config: String,

    /// User the submitted incidents belong to
    #[arg(long, default_value = "anonymous")]
    user_id: String,

    /// Begin listening immediately instead of waiting for /voice/start
    #[arg(long)]
    listen: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config))?;

    info!("VoiceSOS v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Trigger phrases: {:?} (engine: {})",
        cfg.voice.trigger_phrases, cfg.voice.recognizer
    );

    let store: Arc<dyn NotificationStore> = match &cfg.store.persist_path {
        Some(path) => {
            info!("Persisting incidents to {}", path);
            Arc::new(LocalStore::open(path).context("failed to open incident store")?)
        }
        None => Arc::new(LocalStore::new()),
    };

    let location: Arc<dyn LocationProvider> = match &cfg.location {
        Some(loc) => Arc::new(FixedLocationProvider::new(Location {
            lat: loc.lat,
            lng: loc.lng,
            formatted: loc.formatted.clone(),
        })),
        None => Arc::new(UnavailableLocationProvider),
    };

    let assembler = Arc::new(IncidentAssembler::new(store.clone(), location));
    let recognizer = RecognizerFactory::create(&cfg.voice.recognizer, None);

    let (controller, task) = VoiceActivationController::spawn(
        &cfg.voice,
        cfg.capture.clone(),
        recognizer,
        AudioSource::Microphone,
        assembler,
        args.user_id,
    );

    if args.listen {
        controller.start().await?;
    }

    let app = create_router(AppState::new(controller.clone(), store));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    controller.shutdown(task).await?;
    Ok(())
}
