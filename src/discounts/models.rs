//! Discount documents and the order snapshot they are evaluated against.
//!
//! Rules are stored as a JSONB array on the discount row and decoded into a
//! closed set of rule kinds, so every rule is validated before it is saved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Discount from the discounts table
#[derive(Debug, Clone, FromRow)]
pub struct Discount {
    pub id: Uuid,
    pub tenancy_id: Uuid,
    pub name: String,
    pub description: String,
    pub rules: Json<Vec<DiscountRule>>,
    pub priority: i32,
    pub can_stack_with_coupons: bool,
    pub can_stack_with_other_discounts: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// Check the tenancy, active flag and validity window
    pub fn is_eligible_at(&self, tenancy_id: Uuid, check_time: DateTime<Utc>) -> bool {
        if self.tenancy_id != tenancy_id || !self.is_active {
            return false;
        }
        self.start_date <= check_time && check_time <= self.end_date
    }
}

/// A single reward rule: what it gives and when it applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    #[serde(flatten)]
    pub kind: RuleKind,
    #[serde(default)]
    pub conditions: RuleConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Percentage of the order value, optionally capped
    Percentage {
        value: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_discount: Option<Decimal>,
    },
    /// Fixed amount off the order
    Flat { value: Decimal },
    /// Every `buy_quantity + get_quantity` units of a line, `get_quantity` are free
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service_type: Option<String>,
    },
}

/// Conditions a rule requires. Unset conditions always hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customer_ids: Vec<Uuid>,
}

impl RuleConditions {
    pub fn matches(&self, order: &OrderSnapshot) -> bool {
        if let Some(min) = self.min_order_value {
            if order.order_value < min {
                return false;
            }
        }

        if !self.service_types.is_empty() {
            let Some(service) = order.service_type.as_deref() else {
                return false;
            };
            if !self
                .service_types
                .iter()
                .any(|s| s.eq_ignore_ascii_case(service))
            {
                return false;
            }
        }

        if let Some(min) = self.min_items {
            if order.item_count() < u64::from(min) {
                return false;
            }
        }

        if !self.customer_ids.is_empty() {
            match order.customer {
                Some(customer) if self.customer_ids.contains(&customer) => {}
                _ => return false,
            }
        }

        true
    }
}

/// Largest money value accepted from admins or customers
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest buy/get quantity a buy-x-get-y rule may use
pub const MAX_RULE_QUANTITY: u32 = 10_000;

/// Within `0..=MAX_MONEY`
pub fn is_money(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= MAX_MONEY
}

/// Within `(0, MAX_MONEY]`
pub fn is_positive_money(value: Decimal) -> bool {
    value > Decimal::ZERO && value <= MAX_MONEY
}

impl DiscountRule {
    /// Collect every problem with this rule, prefixed with its position
    pub fn validate(&self, index: usize) -> Vec<String> {
        let mut errors = Vec::new();
        let prefix = format!("rules[{}]", index);

        match &self.kind {
            RuleKind::Percentage {
                value,
                max_discount,
            } => {
                if *value <= Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
                    errors.push(format!("{}: percentage must be between 0 and 100", prefix));
                }
                if matches!(max_discount, Some(cap) if !is_positive_money(*cap)) {
                    errors.push(format!(
                        "{}: max_discount must be positive and at most {}",
                        prefix, MAX_MONEY
                    ));
                }
            }
            RuleKind::Flat { value } => {
                if !is_positive_money(*value) {
                    errors.push(format!(
                        "{}: flat value must be positive and at most {}",
                        prefix, MAX_MONEY
                    ));
                }
            }
            RuleKind::BuyXGetY {
                buy_quantity,
                get_quantity,
                ..
            } => {
                if !(1..=MAX_RULE_QUANTITY).contains(buy_quantity) {
                    errors.push(format!(
                        "{}: buy_quantity must be between 1 and {}",
                        prefix, MAX_RULE_QUANTITY
                    ));
                }
                if !(1..=MAX_RULE_QUANTITY).contains(get_quantity) {
                    errors.push(format!(
                        "{}: get_quantity must be between 1 and {}",
                        prefix, MAX_RULE_QUANTITY
                    ));
                }
            }
        }

        if matches!(self.conditions.min_order_value, Some(min) if !is_money(min)) {
            errors.push(format!(
                "{}: min_order_value must be between 0 and {}",
                prefix, MAX_MONEY
            ));
        }

        errors
    }
}

/// Candidate order. Never persisted; only used to test rule applicability.
#[derive(Debug, Clone, Default)]
pub struct OrderSnapshot {
    pub order_value: Decimal,
    pub service_type: Option<String>,
    pub items: Vec<OrderItem>,
    pub customer: Option<Uuid>,
}

impl OrderSnapshot {
    /// Total quantity across all lines
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub name: String,
    pub service_type: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn discount(tenancy_id: Uuid) -> Discount {
        let now = Utc::now();
        Discount {
            id: Uuid::new_v4(),
            tenancy_id,
            name: "Weekday wash".to_string(),
            description: String::new(),
            rules: Json(vec![]),
            priority: 1,
            can_stack_with_coupons: false,
            can_stack_with_other_discounts: false,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_eligibility_gate() {
        let tenancy = Uuid::new_v4();
        let now = Utc::now();
        let d = discount(tenancy);

        assert!(d.is_eligible_at(tenancy, now));
        assert!(!d.is_eligible_at(Uuid::new_v4(), now));
        assert!(!d.is_eligible_at(tenancy, now + Duration::days(2)));
        assert!(!d.is_eligible_at(tenancy, now - Duration::days(2)));

        let inactive = Discount {
            is_active: false,
            ..d
        };
        assert!(!inactive.is_eligible_at(tenancy, now));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: DiscountRule = serde_json::from_value(serde_json::json!({
            "type": "percentage",
            "value": 10,
            "conditions": { "min_order_value": "500", "service_types": ["dry_clean"] }
        }))
        .unwrap();

        assert_eq!(
            rule.kind,
            RuleKind::Percentage {
                value: dec!(10),
                max_discount: None
            }
        );
        assert_eq!(rule.conditions.min_order_value, Some(dec!(500)));
        assert_eq!(rule.conditions.service_types, vec!["dry_clean".to_string()]);
    }

    #[test]
    fn test_rule_without_conditions_defaults() {
        let rule: DiscountRule = serde_json::from_value(serde_json::json!({
            "type": "buy_x_get_y",
            "buy_quantity": 2,
            "get_quantity": 1
        }))
        .unwrap();

        assert_eq!(rule.conditions, RuleConditions::default());
    }

    #[test]
    fn test_unknown_rule_type_is_rejected() {
        let result: Result<DiscountRule, _> = serde_json::from_value(serde_json::json!({
            "type": "mystery_box",
            "value": 5
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_conditions_match() {
        let customer = Uuid::new_v4();
        let order = OrderSnapshot {
            order_value: dec!(800),
            service_type: Some("Wash_Fold".to_string()),
            items: vec![OrderItem {
                name: "Shirt".to_string(),
                service_type: None,
                quantity: 3,
                unit_price: dec!(100),
            }],
            customer: Some(customer),
        };

        let conditions = RuleConditions {
            min_order_value: Some(dec!(500)),
            service_types: vec!["wash_fold".to_string()],
            min_items: Some(3),
            customer_ids: vec![customer],
        };
        assert!(conditions.matches(&order));

        let too_expensive = RuleConditions {
            min_order_value: Some(dec!(1000)),
            ..Default::default()
        };
        assert!(!too_expensive.matches(&order));

        let other_service = RuleConditions {
            service_types: vec!["ironing".to_string()],
            ..Default::default()
        };
        assert!(!other_service.matches(&order));

        let more_items = RuleConditions {
            min_items: Some(4),
            ..Default::default()
        };
        assert!(!more_items.matches(&order));

        let other_customer = RuleConditions {
            customer_ids: vec![Uuid::new_v4()],
            ..Default::default()
        };
        assert!(!other_customer.matches(&order));
    }

    #[test]
    fn test_service_condition_requires_service_type() {
        let conditions = RuleConditions {
            service_types: vec!["ironing".to_string()],
            ..Default::default()
        };
        assert!(!conditions.matches(&OrderSnapshot::default()));
    }

    #[test]
    fn test_rule_validation() {
        let bad_percentage = DiscountRule {
            kind: RuleKind::Percentage {
                value: dec!(120),
                max_discount: Some(dec!(0)),
            },
            conditions: RuleConditions::default(),
        };
        assert_eq!(bad_percentage.validate(0).len(), 2);

        let bad_bxgy = DiscountRule {
            kind: RuleKind::BuyXGetY {
                buy_quantity: 0,
                get_quantity: 0,
                service_type: None,
            },
            conditions: RuleConditions {
                min_order_value: Some(dec!(-1)),
                ..Default::default()
            },
        };
        let errors = bad_bxgy.validate(2);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("rules[2]"));

        let oversized = DiscountRule {
            kind: RuleKind::BuyXGetY {
                buy_quantity: u32::MAX,
                get_quantity: 1,
                service_type: None,
            },
            conditions: RuleConditions::default(),
        };
        let errors = oversized.validate(0);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("buy_quantity"));

        let huge_flat = DiscountRule {
            kind: RuleKind::Flat {
                value: Decimal::MAX,
            },
            conditions: RuleConditions {
                min_order_value: Some(Decimal::MAX),
                ..Default::default()
            },
        };
        assert_eq!(huge_flat.validate(0).len(), 2);

        let good_flat = DiscountRule {
            kind: RuleKind::Flat { value: dec!(50) },
            conditions: RuleConditions::default(),
        };
        assert!(good_flat.validate(0).is_empty());
    }
}
