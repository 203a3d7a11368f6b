//! Geocoding worker: resolves pending addresses on jobs, customers, and
//! customer locations.
//!
//! Polls on a fixed tick, claiming up to a batch of rows across the three
//! tables with `FOR UPDATE SKIP LOCKED` inside the transaction that also
//! writes the results back, so a second process never double-geocodes.
//! Failures mark the row failed and bump its retry counter; rows stop being
//! retried after three failed attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::kernel::ServerDeps;

const MAX_ATTEMPTS: i32 = 3;

/// Delay between provider calls within one batch.
const PROVIDER_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct GeocodingWorkerConfig {
    /// Rows claimed per tick across all tables.
    pub batch_size: i64,
    pub poll_interval: Duration,
}

impl Default for GeocodingWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// The geocodable tables. All three share the status/attempt columns.
#[derive(Debug, Clone, Copy)]
enum Target {
    Jobs,
    Customers,
    CustomerLocations,
}

impl Target {
    const ALL: [Target; 3] = [Target::Jobs, Target::Customers, Target::CustomerLocations];

    fn table(&self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::Customers => "customers",
            Self::CustomerLocations => "customer_locations",
        }
    }

    /// Address expression: jobs carry a single free-form address; customers
    /// and locations assemble one from their normalized parts.
    fn address_expr(&self) -> &'static str {
        match self {
            Self::Jobs => "address",
            Self::Customers | Self::CustomerLocations => {
                "concat_ws(', ', address, city, state, zip)"
            }
        }
    }
}

#[derive(sqlx::FromRow)]
struct PendingRow {
    id: Uuid,
    address: String,
}

pub struct GeocodingWorker {
    deps: Arc<ServerDeps>,
    config: GeocodingWorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl GeocodingWorker {
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self {
            deps,
            config: GeocodingWorkerConfig::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(deps: Arc<ServerDeps>, config: GeocodingWorkerConfig) -> Self {
        Self {
            deps,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Main loop: tick, sleep, repeat until shutdown is requested.
    pub async fn run(self) -> Result<()> {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_s = self.config.poll_interval.as_secs(),
            "geocoding worker starting"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "geocoding tick failed");
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        info!("geocoding worker stopped");
        Ok(())
    }

    /// One pass: spread the batch budget across the three tables in order.
    pub async fn tick(&self) -> Result<usize> {
        let mut budget = self.config.batch_size;
        let mut processed = 0;

        for target in Target::ALL {
            if budget <= 0 {
                break;
            }
            let done = self.process_table(target, budget).await?;
            processed += done;
            budget -= done as i64;
        }

        if processed > 0 {
            info!(processed, "geocoding tick complete");
        }
        Ok(processed)
    }

    async fn process_table(&self, target: Target, limit: i64) -> Result<usize> {
        let pool: &PgPool = &self.deps.db_pool;
        let mut tx = pool.begin().await?;

        let claim_sql = format!(
            "SELECT id, {} AS address FROM {}
             WHERE (geocoding_status = 'pending'
                    OR (geocoding_status = 'failed' AND geocoding_attempts < {}))
               AND address IS NOT NULL
             LIMIT $1
             FOR UPDATE SKIP LOCKED",
            target.address_expr(),
            target.table(),
            MAX_ATTEMPTS,
        );

        let rows: Vec<PendingRow> = sqlx::query_as(&claim_sql)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await?;
        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(0);
        }

        let mut first = true;
        for row in &rows {
            if !first {
                tokio::time::sleep(PROVIDER_DELAY).await;
            }
            first = false;

            match self.deps.geocoder.geocode(&row.address).await {
                Ok(Some(point)) => {
                    let sql = format!(
                        "UPDATE {} SET
                            latitude = $2,
                            longitude = $3,
                            geocoding_status = 'complete',
                            geocoding_attempts = geocoding_attempts + 1
                         WHERE id = $1",
                        target.table()
                    );
                    sqlx::query(&sql)
                        .bind(row.id)
                        .bind(point.latitude)
                        .bind(point.longitude)
                        .execute(&mut *tx)
                        .await?;
                    debug!(table = target.table(), id = %row.id, "geocoded");
                }
                Ok(None) => {
                    self.mark_failed(target, row.id, &mut tx).await?;
                    debug!(table = target.table(), id = %row.id, "address not found");
                }
                Err(e) => {
                    self.mark_failed(target, row.id, &mut tx).await?;
                    warn!(table = target.table(), id = %row.id, error = %e, "geocoding failed");
                }
            }
        }

        tx.commit().await?;
        Ok(rows.len())
    }

    async fn mark_failed(
        &self,
        target: Target,
        id: Uuid,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET
                geocoding_status = 'failed',
                geocoding_attempts = geocoding_attempts + 1
             WHERE id = $1",
            target.table()
        );
        sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
        Ok(())
    }
}
