use std::sync::Arc;

use refin_bot::config::Config;
use refin_bot::engine::Engine;
use refin_bot::safra::SafraClient;
use refin_bot::server::{self, AppState};
use refin_bot::store::{ConversationStore, LibSqlStore};
use refin_bot::zapi::ZapiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env();

    eprintln!("💬 Refin Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}:{}/webhook", config.server.host, config.server.port);
    eprintln!("   Health:  http://{}:{}/health", config.server.host, config.server.port);
    eprintln!("   Database: {}", config.database.path);
    if !config.safra.has_credentials() {
        eprintln!("   Warning: SAFRA_USERNAME/SAFRA_PASSWORD not set, quotes will fail");
    }
    if !config.zapi.has_credentials() {
        eprintln!("   Warning: ZAPI_INSTANCE_ID/ZAPI_TOKEN not set, replies will not send");
    }

    let db_path = std::path::Path::new(&config.database.path);
    let store: Arc<dyn ConversationStore> = Arc::new(
        LibSqlStore::new_local(db_path).await.unwrap_or_else(|e| {
            eprintln!(
                "Error: Failed to open database at {}: {}",
                config.database.path, e
            );
            std::process::exit(1);
        }),
    );

    let safra_configured = config.safra.has_credentials();
    let quotes = Arc::new(SafraClient::new(&config.safra)?);
    let gateway = Arc::new(ZapiClient::new(config.zapi)?);
    let engine = Arc::new(Engine::new(Arc::clone(&store), quotes));

    let app = server::router(AppState {
        engine,
        store,
        gateway,
        safra_configured,
    });

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
