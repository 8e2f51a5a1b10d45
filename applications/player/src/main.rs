/// Hybrid Player - console player with scheduled playback
use chrono::Utc;
use clap::{Parser, Subcommand};
use hybrid_audio_desktop::DesktopBackendHost;
use hybrid_core::{PreferenceStore, TrackCatalog};
use hybrid_playback::{
    apply_persisted, load_persisted, local_time, persistence::save_all, should_be_playing,
    spawn_persister, PersistedPlayer, PlaybackAdapter, PlaybackScheduler, PlayerStore,
};
use hybrid_player::{console::HELP, AppConfig, Console};
use hybrid_storage::SqlitePreferences;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hybrid-player")]
#[command(about = "Multi-source music player with scheduled playback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the player with console controls
    Run {
        /// Configuration file path
        #[arg(short, long, env = "HYBRID_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Evaluate the schedule once and print the result
    Check {
        /// Configuration file path
        #[arg(short, long, env = "HYBRID_CONFIG")]
        config: Option<PathBuf>,
    },
    /// List the tracks in the catalog
    Tracks {
        /// Configuration file path
        #[arg(short, long, env = "HYBRID_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hybrid_player=info,hybrid_playback=info,hybrid_audio_desktop=info,hybrid_server_client=info,hybrid_storage=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&load_config(config)?).await?,
        Commands::Check { config } => check(&load_config(config)?).await?,
        Commands::Tracks { config } => list_tracks(&load_config(config)?).await?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load(path.as_deref())?;
    config.validate()?;
    Ok(config)
}

async fn open_preferences(config: &AppConfig) -> anyhow::Result<Arc<SqlitePreferences>> {
    if let Some(dir) = config.database_dir() {
        std::fs::create_dir_all(&dir)?;
    }
    let pool = hybrid_storage::create_pool(&config.storage.database_url).await?;
    hybrid_storage::run_migrations(&pool).await?;
    tracing::info!("Database connected");
    Ok(Arc::new(SqlitePreferences::new(pool)))
}

async fn run(config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Hybrid Player");
    tracing::info!("API: {}", config.api.base_url);
    tracing::info!("Time zone: {}", config.player.time_zone);

    let prefs = open_preferences(config).await?;
    let persisted = load_persisted(prefs.as_ref()).await;

    let client = config.catalog_client()?;
    match client.health_check().await {
        Ok(health) if health.is_ok() => tracing::info!(uptime = health.uptime, "API is up"),
        Ok(health) => tracing::warn!(status = %health.status, "API reports a problem"),
        Err(e) => tracing::warn!(error = %e, "API health check failed"),
    }

    let store = PlayerStore::new();
    if let Err(e) = store.load_tracks(&client).await {
        tracing::error!(error = %e, "Could not load tracks, starting with an empty playlist");
    }
    apply_persisted(&store, &persisted);
    let persister = spawn_persister(&store, Arc::clone(&prefs) as Arc<dyn PreferenceStore>);

    let host = Arc::new(DesktopBackendHost::new()?);
    let adapter = PlaybackAdapter::new(store.clone(), host.clone(), config.player.clone());
    adapter.spawn_store_follower().await;

    let scheduler = PlaybackScheduler::new(adapter.clone(), config.player.clone());
    scheduler.launch();

    let catalog: Arc<dyn TrackCatalog> = Arc::new(client);
    let console = Console::new(adapter.clone(), scheduler.clone(), catalog, move |interaction| {
        host.report_interaction(interaction);
    });

    println!("{HELP}");
    tokio::select! {
        result = console.run(BufReader::new(tokio::io::stdin())) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    tracing::info!("Shutting down");
    scheduler.shutdown();
    save_all(prefs.as_ref(), &PersistedPlayer::from(&store.snapshot())).await;
    adapter.shutdown().await;
    persister.abort();

    Ok(())
}

async fn check(config: &AppConfig) -> anyhow::Result<()> {
    let prefs = open_preferences(config).await?;
    let persisted = load_persisted(prefs.as_ref()).await;

    let now = local_time(Utc::now(), &config.player.time_zone);
    let inside = should_be_playing(&persisted.schedule_config, now);
    let window = persisted.schedule_config.window_for(now.weekday);

    println!(
        "{} {:02}:{:02} in {}",
        now.weekday,
        now.minutes / 60,
        now.minutes % 60,
        config.player.time_zone
    );
    println!("window: {}-{}", window.start, window.end);
    println!(
        "scheduler: {}",
        if persisted.scheduler_enabled { "on" } else { "off" }
    );
    println!(
        "playback {}",
        if inside { "should be running" } else { "should be stopped" }
    );

    Ok(())
}

async fn list_tracks(config: &AppConfig) -> anyhow::Result<()> {
    let client = config.catalog_client()?;
    let tracks = client.get_tracks().await?;

    println!("Tracks:");
    for track in tracks {
        println!("  {} - {} [{}] {}", track.id, track.title, track.track_type, track.src);
    }

    Ok(())
}
