use anyhow::Context;

use freshfood_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    freshfood_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let app = freshfood_api::app::build_app(&config)
        .await
        .context("failed to initialise the storefront store")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
