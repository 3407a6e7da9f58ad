//! Database queries for discounts.
//!
//! Every query is scoped to a tenancy; a discount owned by another tenancy
//! behaves as if it did not exist.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

use super::models::{Discount, DiscountRule};

const DISCOUNT_COLUMNS: &str = r#"
    id, tenancy_id, name, description, rules, priority,
    can_stack_with_coupons, can_stack_with_other_discounts,
    start_date, end_date, is_active, created_at, updated_at
"#;

/// Fields written by create and update
#[derive(Debug, Clone)]
pub struct DiscountFields {
    pub name: String,
    pub description: String,
    pub rules: Vec<DiscountRule>,
    pub priority: i32,
    pub can_stack_with_coupons: bool,
    pub can_stack_with_other_discounts: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

/// Active discounts of a tenancy that have not expired yet.
///
/// Discounts whose window has not opened are included so a cached set stays
/// correct once they start; the evaluator checks the window itself.
pub async fn fetch_live_discounts(
    pool: &PgPool,
    tenancy_id: Uuid,
    check_time: DateTime<Utc>,
) -> Result<Vec<Discount>, AppError> {
    let sql = format!(
        r#"
        SELECT {DISCOUNT_COLUMNS}
        FROM discounts
        WHERE tenancy_id = $1
          AND is_active = true
          AND end_date >= $2
        ORDER BY priority DESC, created_at ASC
        "#
    );

    let discounts = sqlx::query_as::<_, Discount>(&sql)
        .bind(tenancy_id)
        .bind(check_time)
        .fetch_all(pool)
        .await?;

    Ok(discounts)
}

/// Tenancies that currently have live discounts (for cache warming)
pub async fn tenancies_with_live_discounts(
    pool: &PgPool,
    check_time: DateTime<Utc>,
) -> Result<Vec<Uuid>, AppError> {
    let tenancies = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT tenancy_id
        FROM discounts
        WHERE is_active = true
          AND end_date >= $1
        "#,
    )
    .bind(check_time)
    .fetch_all(pool)
    .await?;

    Ok(tenancies)
}

/// All discounts of a tenancy, for the admin listing
pub async fn list_discounts(pool: &PgPool, tenancy_id: Uuid) -> Result<Vec<Discount>, AppError> {
    let sql = format!(
        r#"
        SELECT {DISCOUNT_COLUMNS}
        FROM discounts
        WHERE tenancy_id = $1
        ORDER BY is_active DESC, priority DESC, name ASC
        "#
    );

    let discounts = sqlx::query_as::<_, Discount>(&sql)
        .bind(tenancy_id)
        .fetch_all(pool)
        .await?;

    Ok(discounts)
}

pub async fn get_discount(pool: &PgPool, tenancy_id: Uuid, id: Uuid) -> Result<Discount, AppError> {
    let sql = format!(
        r#"
        SELECT {DISCOUNT_COLUMNS}
        FROM discounts
        WHERE id = $1 AND tenancy_id = $2
        "#
    );

    sqlx::query_as::<_, Discount>(&sql)
        .bind(id)
        .bind(tenancy_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Discount"))
}

pub async fn insert_discount(
    pool: &PgPool,
    tenancy_id: Uuid,
    fields: DiscountFields,
) -> Result<Discount, AppError> {
    let sql = format!(
        r#"
        INSERT INTO discounts (
            id, tenancy_id, name, description, rules, priority,
            can_stack_with_coupons, can_stack_with_other_discounts,
            start_date, end_date, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {DISCOUNT_COLUMNS}
        "#
    );

    let discount = sqlx::query_as::<_, Discount>(&sql)
        .bind(Uuid::new_v4())
        .bind(tenancy_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(Json(fields.rules))
        .bind(fields.priority)
        .bind(fields.can_stack_with_coupons)
        .bind(fields.can_stack_with_other_discounts)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(fields.is_active)
        .fetch_one(pool)
        .await?;

    Ok(discount)
}

pub async fn update_discount(
    pool: &PgPool,
    tenancy_id: Uuid,
    id: Uuid,
    fields: DiscountFields,
) -> Result<Discount, AppError> {
    let sql = format!(
        r#"
        UPDATE discounts
        SET name = $3,
            description = $4,
            rules = $5,
            priority = $6,
            can_stack_with_coupons = $7,
            can_stack_with_other_discounts = $8,
            start_date = $9,
            end_date = $10,
            is_active = $11,
            updated_at = NOW()
        WHERE id = $1 AND tenancy_id = $2
        RETURNING {DISCOUNT_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Discount>(&sql)
        .bind(id)
        .bind(tenancy_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(Json(fields.rules))
        .bind(fields.priority)
        .bind(fields.can_stack_with_coupons)
        .bind(fields.can_stack_with_other_discounts)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(fields.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Discount"))
}

/// Flip `is_active` and return the new value
pub async fn toggle_discount(pool: &PgPool, tenancy_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        UPDATE discounts
        SET is_active = NOT is_active,
            updated_at = NOW()
        WHERE id = $1 AND tenancy_id = $2
        RETURNING is_active
        "#,
    )
    .bind(id)
    .bind(tenancy_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Discount"))
}

pub async fn delete_discount(pool: &PgPool, tenancy_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM discounts
        WHERE id = $1 AND tenancy_id = $2
        "#,
    )
    .bind(id)
    .bind(tenancy_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Discount"));
    }

    Ok(())
}
