use recibo_core::config::OcrConfig;
use recibo_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("RECIBO_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            tracing::info!("loaded OCR config from {path}");
            OcrConfig::from_toml(&raw)?
        }
        Err(_) => OcrConfig::default(),
    };

    let state = AppState::new(config);
    let addr = std::env::var("RECIBO_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("recibo-server listening on {addr}");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
