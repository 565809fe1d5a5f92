use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use insight_hub::config::Config;
use insight_hub::core::db::{init_demo_data, DocumentStore};
use insight_hub::handlers;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<DocumentStore> {
    match &config.data_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening document store");
            DocumentStore::open(path)
        }
        None => {
            tracing::warn!("DATA_FILE not set; documents are kept in memory only");
            Ok(DocumentStore::in_memory())
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let store = web::Data::new(open_store(&config)?);
    if config.seed_demo_data {
        init_demo_data(&store).context("failed to seed demo data")?;
    }

    let (host, port) = config.bind_addr();
    tracing::info!("server listening on http://{}:{}", host, port);

    let app_config = web::Data::new(config);
    HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors(&app_config))
            .wrap(handlers::access_log())
            .app_data(store.clone())
            .app_data(app_config.clone())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("failed to bind {}:{}", host, port))?
    .run()
    .await
    .context("server terminated with an error")
}
