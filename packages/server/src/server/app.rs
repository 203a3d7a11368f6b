//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use twilio::TwilioService;

use crate::kernel::ServerDeps;
use crate::server::middleware::{jwt_auth_middleware, request_id_middleware};
use crate::server::routes::{
    after_hours, agreements, auth, customers, dispatch, employees, escalations, eta, health,
    jobs, refrigerant, reviews, schedules, sms, time_tracking,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    /// Present only when Twilio credentials are configured; the inbound SMS
    /// webhook requires it for signature validation.
    pub twilio: Option<Arc<TwilioService>>,
}

/// Build the Axum application router
pub fn build_app(
    deps: Arc<ServerDeps>,
    twilio: Option<Arc<TwilioService>>,
    allowed_origins: Vec<String>,
) -> Router {
    let state = AppState {
        deps: deps.clone(),
        twilio,
    };

    // Public auth routes, rate-limited in production builds.
    let auth_routes = Router::new()
        .route("/login", post(auth::login_handler))
        .route("/register", post(auth::register_handler))
        .route("/onboard", post(auth::onboard_handler));

    // Rate limiting (production only). Disabled in development where all
    // requests share localhost.
    #[cfg(not(debug_assertions))]
    let auth_routes = {
        use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

        let rate_limit_config = std::sync::Arc::new(
            GovernorConfigBuilder::default()
                .per_second(2)
                .burst_size(10)
                .use_headers()
                .finish()
                .expect("Rate limiter configuration is valid and should never fail"),
        );
        auth_routes.layer(GovernorLayer {
            config: rate_limit_config,
        })
    };

    // Public surface: health probes, token-bearing ETA lookup, signed SMS
    // webhook.
    let public_routes = Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/live", get(health::live_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/eta/:token", get(eta::eta_lookup))
        .route("/sms/inbound", post(sms::inbound_sms));

    // Token-gated API. Handlers enforce auth through the AuthUser extractor.
    let api_routes = Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route("/jobs/batch-dispatch", post(dispatch::batch_dispatch))
        .route("/jobs/:id", get(jobs::get_job).patch(jobs::patch_job))
        .route("/jobs/:id/status", put(jobs::change_status))
        .route("/jobs/:id/close", post(jobs::close_job_handler))
        .route("/jobs/:id/dispatch", post(dispatch::dispatch_job))
        .route("/jobs/:id/dispatch-override", post(dispatch::dispatch_override))
        .route("/jobs/:id/reassign", post(dispatch::reassign_job))
        .route("/jobs/:id/escalate", post(escalations::trigger))
        .route("/jobs/:id/time-tracking", get(time_tracking::get_tracking))
        .route(
            "/jobs/:id/time-tracking/:event",
            post(time_tracking::record_event),
        )
        .route(
            "/jobs/:id/refrigerant-logs",
            post(refrigerant::append_log).get(refrigerant::list_logs),
        )
        .route("/escalations/:id/resolve", post(escalations::resolve))
        .route(
            "/escalation-policies",
            post(escalations::create_policy).get(escalations::list_policies),
        )
        .route(
            "/after-hours/rules",
            post(after_hours::create_rule).get(after_hours::list_rules),
        )
        .route("/after-hours/status", get(after_hours::status))
        .route(
            "/customers",
            post(customers::create_customer).get(customers::list_customers),
        )
        .route(
            "/customers/:id",
            get(customers::get_customer).patch(customers::patch_customer),
        )
        .route(
            "/customers/:id/locations",
            post(customers::create_location).get(customers::list_locations),
        )
        .route(
            "/customers/:id/locations/:location_id/primary",
            put(customers::set_primary_location),
        )
        .route(
            "/customers/:id/equipment",
            post(customers::create_equipment).get(customers::list_equipment),
        )
        .route(
            "/employees",
            post(employees::create_employee).get(employees::list_employees),
        )
        .route("/employees/:id", patch(employees::patch_employee))
        .route("/employees/:id/location", post(employees::update_location))
        .route(
            "/recurring-schedules",
            post(schedules::create_schedule).get(schedules::list_schedules),
        )
        .route(
            "/agreements",
            post(agreements::create_agreement).get(agreements::list_agreements),
        )
        .route("/billing-triggers", get(agreements::list_billing_triggers))
        .route("/reviews/pending", get(reviews::list_pending))
        .route("/eta/token", post(eta::create_eta_token));

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    };

    let jwt_service = deps.jwt_service.clone();

    api_routes
        .merge(public_routes)
        .merge(auth_routes)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
