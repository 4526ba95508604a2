//! # Quotagate API Server
//!
//! Actix-web server that admits or rejects requests per identifier quota.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::AdmissionMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    // Any configuration problem stops the process before it serves traffic
    let config = AppConfig::from_env()?;
    let policies = config::load_policies(&config.policy_path)?;
    tracing::info!(
        path = %config.policy_path.display(),
        policies = policies.len(),
        "Rate limit policies loaded"
    );

    let state = AppState::new(&config, policies).await?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = background::start_sweeper(&state).await?;

    let admission = AdmissionMiddleware::new(
        state.gate.clone(),
        state.clock.clone(),
        config.identifier_param.clone(),
    );

    tracing::info!(
        "Starting Quotagate API Server on {}:{}",
        config.host,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, admission.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    scheduler.shutdown().await?;

    Ok(())
}
