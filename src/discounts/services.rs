//! Discount service functions with database access.
//!
//! Reads go through the tenancy's cached discount set; writes go to the
//! database and then drop that cached set.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::AppCache;
use crate::error::{AppError, Result};

use super::calculators::evaluate_discounts;
use super::models::Discount;
use super::queries;
use super::requests::{ApplicableDiscountsRequest, SaveDiscountRequest};
use super::responses::ApplicableDiscountsResponse;

/// Live discount set of a tenancy, from cache or database
pub async fn live_discounts(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    check_time: DateTime<Utc>,
) -> Result<Arc<Vec<Discount>>> {
    cache
        .get_or_load(tenancy_id, async move {
            tracing::debug!("Cache MISS for discounts of tenancy: {}", tenancy_id);
            queries::fetch_live_discounts(pool, tenancy_id, check_time).await
        })
        .await
}

/// Evaluate the tenancy's discounts against a candidate order
pub async fn applicable_discounts(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    request: ApplicableDiscountsRequest,
) -> Result<ApplicableDiscountsResponse> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let now = Utc::now();
    let order = request.into_snapshot();
    let discounts = live_discounts(pool, cache, tenancy_id, now).await?;

    let evaluation = evaluate_discounts(&discounts, &order, tenancy_id, now)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(
        tenancy = %tenancy_id,
        candidates = discounts.len(),
        applied = evaluation.applicable.len(),
        total_discount = %evaluation.total_discount,
        "Evaluated discounts for order"
    );

    Ok(ApplicableDiscountsResponse::new(order.order_value, &evaluation))
}

/// Every discount of a tenancy, for the admin listing
pub async fn list_discounts(pool: &PgPool, tenancy_id: Uuid) -> Result<Vec<Discount>> {
    queries::list_discounts(pool, tenancy_id).await
}

pub async fn get_discount(pool: &PgPool, tenancy_id: Uuid, id: Uuid) -> Result<Discount> {
    queries::get_discount(pool, tenancy_id, id).await
}

fn validated(request: &SaveDiscountRequest) -> Result<()> {
    let errors = request.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

pub async fn create_discount(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    request: SaveDiscountRequest,
) -> Result<Discount> {
    validated(&request)?;

    let discount = queries::insert_discount(pool, tenancy_id, request.into_fields()).await?;
    cache.invalidate_tenancy(tenancy_id).await;

    tracing::info!(tenancy = %tenancy_id, discount = %discount.id, "Discount created");
    Ok(discount)
}

pub async fn update_discount(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    id: Uuid,
    request: SaveDiscountRequest,
) -> Result<Discount> {
    validated(&request)?;

    let discount = queries::update_discount(pool, tenancy_id, id, request.into_fields()).await?;
    cache.invalidate_tenancy(tenancy_id).await;

    tracing::info!(tenancy = %tenancy_id, discount = %id, "Discount updated");
    Ok(discount)
}

pub async fn toggle_discount(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    id: Uuid,
) -> Result<bool> {
    let is_active = queries::toggle_discount(pool, tenancy_id, id).await?;
    cache.invalidate_tenancy(tenancy_id).await;

    tracing::info!(tenancy = %tenancy_id, discount = %id, is_active, "Discount toggled");
    Ok(is_active)
}

pub async fn delete_discount(
    pool: &PgPool,
    cache: &AppCache,
    tenancy_id: Uuid,
    id: Uuid,
) -> Result<()> {
    queries::delete_discount(pool, tenancy_id, id).await?;
    cache.invalidate_tenancy(tenancy_id).await;

    tracing::info!(tenancy = %tenancy_id, discount = %id, "Discount deleted");
    Ok(())
}
