// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::server::app::build_app;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::{TwilioOptions, TwilioService};

use server_core::domains::auth::JwtService;
use server_core::kernel::geocoding::NominatimGeocoder;
use server_core::kernel::routing::OsrmRoutingClient;
use server_core::kernel::scheduled_tasks::start_scheduler;
use server_core::kernel::sms::{DisabledSmsSender, SmsSender, TwilioSmsSender};
use server_core::kernel::workers::GeocodingWorker;
use server_core::kernel::ServerDeps;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Summit Field Service API");

    // Load configuration; a missing required variable aborts here.
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // External services
    let routing = Arc::new(OsrmRoutingClient::new(config.osrm_base_url.clone()));
    let geocoder = Arc::new(NominatimGeocoder::new(
        config.nominatim_base_url.clone(),
        config.geocoding_user_agent.clone(),
    ));

    let twilio = match (
        &config.twilio_account_sid,
        &config.twilio_auth_token,
        &config.twilio_from_number,
    ) {
        (Some(account_sid), Some(auth_token), Some(from_number)) => {
            Some(Arc::new(TwilioService::new(TwilioOptions {
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
                from_number: from_number.clone(),
            })))
        }
        _ => {
            tracing::warn!("Twilio credentials not configured, SMS disabled");
            None
        }
    };
    let sms: Arc<dyn SmsSender> = match &twilio {
        Some(service) => Arc::new(TwilioSmsSender::new(service.clone())),
        None => Arc::new(DisabledSmsSender),
    };

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let deps = Arc::new(ServerDeps::new(
        pool.clone(),
        routing,
        geocoder,
        sms,
        jwt_service,
    ));

    // Background execution: geocoding poll loop + cron tasks.
    let worker = GeocodingWorker::new(deps.clone());
    tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            tracing::error!(error = %e, "Geocoding worker exited with error");
        }
    });

    let _scheduler = start_scheduler(deps.clone())
        .await
        .context("Failed to start scheduled tasks")?;

    // Build application
    let app = build_app(deps, twilio, config.allowed_origins.clone());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
