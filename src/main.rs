use std::process;

use tracing::{error, info};

mod config;
mod domain;
mod energidataservice;
mod http;
mod setup;
mod tariff;
mod transform;

const APP_NAME: &str = "spotprice";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting {}", APP_NAME);

    let config = config::Config::from_env().unwrap_or_else(|e| {
        error!("unable to load configuration, {}", e);
        process::exit(1);
    });

    let app_state = setup::setup_app_state(&config).unwrap_or_else(|e| {
        error!("unable to set up the price provider, {}", e);
        process::exit(1);
    });

    if let Err(e) = http::start_http_server(app_state, config.port).await {
        error!("http server stopped, {}", e);
        process::exit(1);
    }

    info!("Shutting down {}", APP_NAME);
}
