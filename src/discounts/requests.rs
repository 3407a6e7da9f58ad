//! Request DTOs for discount API endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::models::{is_money, DiscountRule, OrderItem, OrderSnapshot, MAX_MONEY};
use super::queries::DiscountFields;

/// Request to list the discounts applicable to a candidate order
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicableDiscountsRequest {
    #[serde(default)]
    pub order_value: Option<Decimal>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
}

/// An item line of the candidate order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
}

fn default_quantity() -> u32 {
    1
}

/// Largest quantity accepted on a single order line
pub const MAX_ITEM_QUANTITY: u32 = 100_000;

impl ApplicableDiscountsRequest {
    /// Collect every problem with the candidate order
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if matches!(self.order_value, Some(value) if !is_money(value)) {
            errors.push(format!("orderValue must be between 0 and {}", MAX_MONEY));
        }

        for (i, item) in self.items.iter().enumerate() {
            if !(1..=MAX_ITEM_QUANTITY).contains(&item.quantity) {
                errors.push(format!(
                    "items[{}]: quantity must be between 1 and {}",
                    i, MAX_ITEM_QUANTITY
                ));
            }
            if !is_money(item.unit_price) {
                errors.push(format!(
                    "items[{}]: unitPrice must be between 0 and {}",
                    i, MAX_MONEY
                ));
            }
        }

        errors
    }

    /// Build the snapshot the evaluator works on. A missing order value is zero.
    pub fn into_snapshot(self) -> OrderSnapshot {
        OrderSnapshot {
            order_value: self.order_value.unwrap_or(Decimal::ZERO),
            service_type: self.service_type,
            items: self
                .items
                .into_iter()
                .map(|item| OrderItem {
                    name: item.name,
                    service_type: item.service_type,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            customer: self.customer_id,
        }
    }
}

/// Body for creating or replacing a discount
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDiscountRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<DiscountRule>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub can_stack_with_coupons: bool,
    #[serde(default)]
    pub can_stack_with_other_discounts: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SaveDiscountRequest {
    /// Collect every validation problem with the request
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name is required".to_string());
        }
        if self.rules.is_empty() {
            errors.push("at least one rule is required".to_string());
        }
        if self.end_date <= self.start_date {
            errors.push("endDate must be after startDate".to_string());
        }

        errors.extend(
            self.rules
                .iter()
                .enumerate()
                .flat_map(|(i, rule)| rule.validate(i)),
        );

        errors
    }

    pub fn into_fields(self) -> DiscountFields {
        DiscountFields {
            name: self.name.trim().to_string(),
            description: self.description,
            rules: self.rules,
            priority: self.priority,
            can_stack_with_coupons: self.can_stack_with_coupons,
            can_stack_with_other_discounts: self.can_stack_with_other_discounts,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
        }
    }
}
