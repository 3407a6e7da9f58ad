//! Response DTOs for discount API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::calculators::{AppliedDiscount, DiscountEvaluation};
use super::models::{Discount, DiscountRule};

/// A discount as returned by the admin endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub rules: Vec<DiscountRule>,
    pub priority: i32,
    pub can_stack_with_coupons: bool,
    pub can_stack_with_other_discounts: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Discount> for DiscountResponse {
    fn from(d: Discount) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            rules: d.rules.0,
            priority: d.priority,
            can_stack_with_coupons: d.can_stack_with_coupons,
            can_stack_with_other_discounts: d.can_stack_with_other_discounts,
            start_date: d.start_date,
            end_date: d.end_date,
            is_active: d.is_active,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// One entry of the applicable set
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscountResponse {
    pub discount_id: Uuid,
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub can_stack_with_coupons: bool,
    pub matched_rule: DiscountRule,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl From<&AppliedDiscount<'_>> for AppliedDiscountResponse {
    fn from(applied: &AppliedDiscount<'_>) -> Self {
        Self {
            discount_id: applied.discount.id,
            name: applied.discount.name.clone(),
            description: applied.discount.description.clone(),
            priority: applied.discount.priority,
            can_stack_with_coupons: applied.discount.can_stack_with_coupons,
            matched_rule: applied.matched_rule.clone(),
            amount: applied.amount,
        }
    }
}

/// Response for the applicable-discounts evaluation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicableDiscountsResponse {
    pub applicable_discounts: Vec<AppliedDiscountResponse>,
    #[serde(with = "rust_decimal::serde::str")]
    pub order_value: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_discount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub final_amount: Decimal,
}

impl ApplicableDiscountsResponse {
    pub fn new(order_value: Decimal, evaluation: &DiscountEvaluation<'_>) -> Self {
        Self {
            applicable_discounts: evaluation.applicable.iter().map(Into::into).collect(),
            order_value,
            total_discount: evaluation.total_discount,
            final_amount: evaluation.final_amount,
        }
    }
}

/// Response for the toggle endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub id: Uuid,
    pub is_active: bool,
}
