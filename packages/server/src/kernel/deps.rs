//! Server dependencies (using traits for testability)
//!
//! Central dependency container handed to handlers, workers, and scheduled
//! tasks. External services sit behind trait objects so tests can substitute
//! fixed-speed routing, canned geocoding, and collecting SMS senders.

use std::sync::Arc;

use sqlx::PgPool;

use crate::domains::auth::JwtService;
use crate::kernel::geocoding::Geocoder;
use crate::kernel::routing::RoutingClient;
use crate::kernel::sms::SmsSender;

#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub routing: Arc<dyn RoutingClient>,
    pub geocoder: Arc<dyn Geocoder>,
    pub sms: Arc<dyn SmsSender>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        routing: Arc<dyn RoutingClient>,
        geocoder: Arc<dyn Geocoder>,
        sms: Arc<dyn SmsSender>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            db_pool,
            routing,
            geocoder,
            sms,
            jwt_service,
        }
    }
}
