use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aluguetudo_observability::init();

    let config = aluguetudo_api::config::ApiConfig::from_env()?;
    let bind_addr = config.bind_addr;

    let app = aluguetudo_api::app::build_app(config)?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
