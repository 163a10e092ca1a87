use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use warden_api::app::{build_app, services::AppServices};
use warden_api::config::ApiConfig;
use warden_infra::ConsoleEmailSender;
use warden_infra::db::connect_and_migrate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    // Fail fast: a bad signing key/issuer/audience must stop startup.
    let config = ApiConfig::load().context("invalid configuration")?;
    let email = Arc::new(ConsoleEmailSender::new());

    let services = match config.database_url.as_deref() {
        Some(url) => {
            let pool = connect_and_migrate(url).await?;
            AppServices::postgres(&config, pool, email).await
        }
        None => {
            warn!("DATABASE_URL not set; state will not survive a restart");
            AppServices::in_memory(&config, email).await
        }
    }
    .context("failed to build application services")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind((config.api_host.as_str(), config.api_port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.api_host, config.api_port))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
