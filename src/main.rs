use portal_messaging::{
    config::Config,
    directory::StaticDirectory,
    error::AppError,
    logging, routes,
    services::upload::InMemoryUploader,
    state::AppState,
    store::Store,
    websocket::ConnectionRegistry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Config::from_env()?;
    let directory = StaticDirectory::from_env()?;

    let state = AppState {
        store: Arc::new(Store::new()),
        registry: ConnectionRegistry::new(),
        directory: Arc::new(directory),
        uploader: Arc::new(InMemoryUploader::new()),
        config: Arc::new(config.clone()),
    };

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    info!(%addr, "messaging service listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    Ok(())
}
