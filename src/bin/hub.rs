use std::sync::Arc;

use clap::Parser;
use hydro_monitor::{
    actors::{
        alert::AlertHandle,
        messages::ReadingEvent,
        sensor_feed::SensorFeedHandle,
        storage::{StorageHandle, StorageOptions},
    },
    config::{self, Config, StorageConfig},
    ingest::{IngestBridge, SensorTopics},
    notifications::{AlertDispatcher, ExpoPushClient, NotificationDebouncer, PushService},
    storage::{MemoryBackend, StorageBackend},
};
use tokio::sync::broadcast;
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Capacity of the reading broadcast channel
const READING_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON), defaults are used when omitted
    #[arg(short)]
    file: Option<String>,

    /// Log level for the hub's own targets
    #[arg(long, default_value_t = LevelFilter::TRACE)]
    log_level: LevelFilter,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("hydro_monitor", level),
        ("hub", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = config::load(args.file.as_deref())?;

    let (reading_tx, _) = broadcast::channel::<ReadingEvent>(READING_CHANNEL_CAPACITY);
    let bridge = IngestBridge::new(SensorTopics::from_config(&config.mqtt), reading_tx);

    let push: Arc<dyn PushService> = Arc::new(ExpoPushClient::new(&config.push)?);
    let dispatcher = AlertDispatcher::new(
        config.alerts.thresholds(),
        NotificationDebouncer::new(config.alerts.realert_interval()),
    );
    let alerts = AlertHandle::spawn(dispatcher, push, bridge.subscribe());

    let (backend, options) = storage_backend(&config).await?;
    let storage = StorageHandle::spawn(bridge.subscribe(), backend, options);

    let sensor_feed = SensorFeedHandle::spawn(&config.mqtt, bridge.clone());

    if config.api.enabled {
        start_api(&config, bridge.clone(), alerts.clone(), storage.clone()).await?;
    } else {
        info!("API server disabled");
    }

    info!("hub running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    sensor_feed.shutdown().await;
    alerts.shutdown().await;
    storage.shutdown().await;

    // give the storage actor a moment for its final flush
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    Ok(())
}

async fn storage_backend(
    config: &Config,
) -> anyhow::Result<(Box<dyn StorageBackend>, StorageOptions)> {
    match &config.storage {
        None | Some(StorageConfig::None) => {
            debug!("using in-memory storage");
            Ok((Box::new(MemoryBackend::new()), StorageOptions::default()))
        }

        #[cfg(feature = "storage-sqlite")]
        Some(StorageConfig::Sqlite {
            path,
            retention_days,
        }) => {
            info!("using SQLite storage at {}", path.display());
            let backend = hydro_monitor::storage::sqlite::SqliteBackend::new(path).await?;
            let options = StorageOptions {
                retention_days: Some(*retention_days),
                ..StorageOptions::default()
            };
            Ok((Box::new(backend), options))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        Some(StorageConfig::Sqlite { .. }) => {
            tracing::warn!("built without SQLite support, falling back to in-memory storage");
            Ok((Box::new(MemoryBackend::new()), StorageOptions::default()))
        }
    }
}

#[cfg(feature = "api")]
async fn start_api(
    config: &Config,
    bridge: IngestBridge,
    alerts: AlertHandle,
    storage: StorageHandle,
) -> anyhow::Result<()> {
    use hydro_monitor::api::{ApiConfig, ApiState, spawn_api_server};

    let state = ApiState::new(bridge, alerts, storage);
    let addr = spawn_api_server(ApiConfig::from(&config.api), state).await?;
    info!("API available at http://{addr}/api/v1");
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn start_api(
    _config: &Config,
    _bridge: IngestBridge,
    _alerts: AlertHandle,
    _storage: StorageHandle,
) -> anyhow::Result<()> {
    tracing::warn!("API enabled in config but the hub was built without the api feature");
    Ok(())
}
