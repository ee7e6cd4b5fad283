use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wt_locks::{
    clients::SupabaseStorage,
    config::Config,
    routes::create_app,
    services::{BlobStore, MemoryBlobStore},
    ws::{LivenessSupervisor, RoomRegistry},
    AppState,
};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first so its log level can seed the filter
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .init();

    if let Err(e) = loaded {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
    }
    info!("Starting {} ({})...", config.service_name, config.environment);

    // Blob storage for slide images
    let blob = build_blob_store(&config);

    // Rooms live in memory only; the supervisor revokes locks of silent holders
    let registry = Arc::new(RoomRegistry::new());
    let _supervisor = LivenessSupervisor::spawn(
        registry.clone(),
        config.lock_ttl(),
        config.idle_timeout(),
        config.sweep_interval(),
    );

    let address = config.server_address();
    let app_state = Arc::new(AppState::new(config, registry, blob));
    let app_routes = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", address));

    info!("🚀 Server running on http://{}", address);
    info!("📡 Lock rooms available at ws://{}/ws/{{session}}/{{story}}/{{slide}}", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");
}

fn build_blob_store(config: &Config) -> Arc<dyn BlobStore> {
    match (&config.supabase_url, &config.supabase_key) {
        (Some(url), Some(key)) => match SupabaseStorage::new(url, key.clone()) {
            Ok(storage) => return Arc::new(storage),
            Err(e) => error!("Failed to configure Supabase storage: {}", e),
        },
        _ => warn!("No Supabase storage configured"),
    }
    warn!("Slide images are kept in memory and lost on restart");
    Arc::new(MemoryBlobStore::new())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
