//! SyncRate room coordination server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin syncrate-server
//! cargo run --bin syncrate-server -- --host 0.0.0.0 --port 3000 --catalog data/sample_catalog.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use syncrate_server::{
    config::{RetentionPolicy, ServerConfig},
    domain::{RandomSource, RoomRecordStore, SongCatalog},
    infrastructure::{
        repository::{InMemoryRoomRecordStore, InMemorySongCatalog},
        room_manager::RoomManager,
    },
    ui::{Server, state::AppState},
    usecase::{
        CreateRoomUseCase, DispatchMessageUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        RoomHandlers, SweepRecordsUseCase,
    },
};
use syncrate_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "syncrate-server")]
#[command(about = "Real-time room coordination server for SyncRate", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// JSON file with songs and votes for the in-memory catalog
    #[arg(short = 'c', long)]
    catalog: Option<PathBuf>,

    /// Seconds between sweeps of empty live rooms
    #[arg(long, default_value = "300")]
    sweep_interval_secs: u64,

    /// Seconds an empty live room may stay idle
    #[arg(long, default_value = "600")]
    idle_room_timeout_secs: u64,

    /// Seconds between sweeps of inactive room records
    #[arg(long, default_value = "3600")]
    record_sweep_interval_secs: u64,

    /// Seed for room codes, song shuffles and coin flips
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            catalog_path: args.catalog,
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            idle_room_timeout: Duration::from_secs(args.idle_room_timeout_secs),
            record_sweep_interval: Duration::from_secs(args.record_sweep_interval_secs),
            seed: args.seed,
            retention: RetentionPolicy::default(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(Args::parse());

    // Initialize dependencies in order:
    // 1. Collaborators (catalog, record store)
    // 2. Room manager and randomness
    // 3. UseCases
    // 4. Background sweeps
    // 5. Server

    // 1. Collaborators
    let catalog: Arc<dyn SongCatalog> = match &config.catalog_path {
        Some(path) => match InMemorySongCatalog::from_file(path).await {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                tracing::error!("Failed to load catalog: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No catalog given, starting with an empty song catalog");
            Arc::new(InMemorySongCatalog::new(Vec::new()))
        }
    };
    let store: Arc<dyn RoomRecordStore> = Arc::new(InMemoryRoomRecordStore::new());

    // 2. Room manager and randomness
    let room_manager = Arc::new(RoomManager::new(Arc::new(SystemClock)));
    let random = Arc::new(RandomSource::from_seed_option(config.seed));
    if let Some(seed) = config.seed {
        tracing::info!("Using random seed {}", seed);
    }

    // 3. UseCases
    let handlers = Arc::new(RoomHandlers::new(
        catalog.clone(),
        store.clone(),
        room_manager.clone(),
        random.clone(),
        random.clone(),
    ));
    let create_room_usecase = Arc::new(CreateRoomUseCase::new(
        catalog.clone(),
        store.clone(),
        room_manager.clone(),
        random.clone(),
    ));
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        store.clone(),
        room_manager.clone(),
        handlers.clone(),
    ));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(room_manager.clone()));
    let dispatch_usecase = Arc::new(DispatchMessageUseCase::new(
        store.clone(),
        room_manager.clone(),
        handlers,
        leave_room_usecase.clone(),
    ));
    let sweep_records_usecase = Arc::new(SweepRecordsUseCase::new(
        store.clone(),
        room_manager.clone(),
        config.retention,
    ));

    // 4. Background sweeps
    let idle_sweeper = room_manager
        .clone()
        .spawn_idle_sweeper(config.sweep_interval, config.idle_room_timeout);
    let record_sweeper = sweep_records_usecase.spawn(config.record_sweep_interval);

    // 5. Create and run the server
    let server = Server::new(AppState {
        create_room_usecase,
        join_room_usecase,
        leave_room_usecase,
        dispatch_usecase,
        room_manager,
        store,
    });
    let result = server.run(config.host, config.port).await;

    idle_sweeper.abort();
    record_sweeper.abort();
    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
