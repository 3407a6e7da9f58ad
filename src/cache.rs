//! In-memory caching using moka
//!
//! Holds each tenancy's live discount set so order evaluation does not hit
//! the database on every request. Entries are keyed by tenancy and a
//! generation counter. Admin writes bump the generation, so a load that
//! started before the write can only land under a key nobody reads again.

use chrono::Utc;
use dashmap::DashMap;
use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::discounts::models::Discount;
use crate::discounts::queries;
use crate::error::AppError;

const DEFAULT_DISCOUNT_TTL: Duration = Duration::from_secs(5 * 60);

type DiscountKey = (Uuid, u64);

/// Application cache holding live discount sets
#[derive(Clone)]
pub struct AppCache {
    /// Live discounts ((tenancy_id, generation) -> discounts ordered by priority)
    discounts: Cache<DiscountKey, Arc<Vec<Discount>>>,
    /// Current generation of each tenancy that has been written to
    generations: Arc<DashMap<Uuid, u64>>,
}

impl AppCache {
    /// Create a new cache instance with the given discount TTL
    pub fn new(discount_ttl: Duration) -> Self {
        Self {
            // 10k tenancies, idle entries dropped after half the TTL
            discounts: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(discount_ttl)
                .time_to_idle(discount_ttl / 2)
                .build(),
            generations: Arc::new(DashMap::new()),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            discount_sets: self.discounts.entry_count(),
        }
    }

    /// Current generation of a tenancy's discount set
    pub fn generation(&self, tenancy_id: Uuid) -> u64 {
        self.generations.get(&tenancy_id).map_or(0, |g| *g)
    }

    /// Cached discount set of a tenancy, running `load` on a miss.
    ///
    /// Concurrent misses for the same tenancy share a single load.
    pub async fn get_or_load<F>(
        &self,
        tenancy_id: Uuid,
        load: F,
    ) -> Result<Arc<Vec<Discount>>, AppError>
    where
        F: Future<Output = Result<Vec<Discount>, AppError>>,
    {
        let key = (tenancy_id, self.generation(tenancy_id));
        self.discounts
            .try_get_with(key, async move { load.await.map(Arc::new) })
            .await
            .map_err(|e| {
                Arc::try_unwrap(e).unwrap_or_else(|shared| AppError::Internal(shared.to_string()))
            })
    }

    /// Store a discount set loaded while `generation` was current
    pub async fn store(&self, tenancy_id: Uuid, generation: u64, discounts: Vec<Discount>) {
        self.discounts
            .insert((tenancy_id, generation), Arc::new(discounts))
            .await;
    }

    /// Retire a tenancy's cached discount set. Call after the write is committed.
    pub async fn invalidate_tenancy(&self, tenancy_id: Uuid) {
        // The map guard must be released before awaiting
        let retired = {
            let mut generation = self.generations.entry(tenancy_id).or_insert(0);
            let retired = *generation;
            *generation += 1;
            retired
        };
        self.discounts.invalidate(&(tenancy_id, retired)).await;
        info!("Discount cache invalidated for tenancy: {}", tenancy_id);
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(DEFAULT_DISCOUNT_TTL)
    }
}

/// Cache statistics for the health endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub discount_sets: u64,
}

/// Start background cache warmer
///
/// Warms the cache on startup and refreshes on every tick of `every`.
pub async fn start_cache_warmer(cache: AppCache, db: PgPool, every: Duration) {
    let mut interval = interval(every);
    loop {
        interval.tick().await;
        warm_cache(&cache, &db).await;
    }
}

/// Load the live discount set of every tenancy that has one
async fn warm_cache(cache: &AppCache, db: &PgPool) {
    info!("Starting cache warm-up...");
    let now = Utc::now();

    let tenancies = match queries::tenancies_with_live_discounts(db, now).await {
        Ok(tenancies) => tenancies,
        Err(e) => {
            warn!("Failed to list tenancies for cache warm-up: {}", e);
            return;
        }
    };

    for tenancy_id in tenancies {
        let generation = cache.generation(tenancy_id);
        match queries::fetch_live_discounts(db, tenancy_id, now).await {
            Ok(discounts) => cache.store(tenancy_id, generation, discounts).await,
            Err(e) => warn!("Failed to warm discounts for tenancy {}: {}", tenancy_id, e),
        }
    }

    cache.discounts.run_pending_tasks().await;
    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}
