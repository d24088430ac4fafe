use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecom_visual_suite::{AppConfig, GeminiClient, Workflow, web_pages};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let bind_address = format!("0.0.0.0:{}", config.port);

    let client = GeminiClient::new(config.gemini.clone());
    let workflow = Arc::new(Workflow::new(Arc::new(client)));
    let router = web_pages::router(workflow, config.max_upload_bytes);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(
        address = %bind_address,
        analysis_model = %config.gemini.analysis_model,
        image_model = %config.gemini.image_model,
        video_model = %config.gemini.video_model,
        "visual suite server started"
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
