mod config;
mod error;
mod model;
mod store;
mod web;

use actix_web::middleware::Logger;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};
use reqwest::Client;

use config::AppConfig;
use model::CompletionClient;
use store::StoreClient;
use web::{handlers, middleware, routes};

// App state structure, built once at startup and shared read-only
struct AppState {
    config: AppConfig,
    completions: CompletionClient,
    store: StoreClient,
}

impl AppState {
    fn new(config: AppConfig) -> anyhow::Result<Self> {
        // One client for both upstreams; the timeout bounds every outbound call.
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .context("failed to build HTTP client")?;

        let completions = CompletionClient::new(
            config.completion.clone(),
            client.clone(),
            config.upstream_timeout,
        );
        let store = StoreClient::new(config.store.clone(), client, config.upstream_timeout);

        Ok(Self {
            config,
            completions,
            store,
        })
    }
}

fn warn_on_risky_config(config: &AppConfig) {
    if let Some(store) = &config.store {
        if store.discloses_service_key() {
            warn!("SUPABASE_ANON_KEY is not set; /config will disclose SUPABASE_KEY");
        }
    }
    if config.allowed_origins.is_empty() {
        warn!("ALLOWED_ORIGINS is empty; accepting requests from any origin");
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting chat relay");

    let config = AppConfig::from_env().context("invalid configuration")?;
    warn_on_risky_config(&config);
    info!("Running in {:?} mode", config.mode);

    let bind = (config.host.clone(), config.port);
    let state = Data::new(AppState::new(config)?);

    info!("Server is running on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let config = &state.config;
        App::new()
            .app_data(state.clone())
            .wrap(middleware::error_handlers(config.mode))
            .wrap(middleware::cors(&config.allowed_origins))
            .wrap(Logger::default())
            .configure(routes::configure)
            .configure(|cfg| routes::static_files(cfg, &config.public_dir))
            .default_service(actix_web::web::to(handlers::not_found))
    })
    .bind(bind)
    .context("failed to bind listen address")?
    .run()
    .await?;

    Ok(())
}
