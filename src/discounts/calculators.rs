//! Core discount calculation functions.
//!
//! Pure functions for discount math - no database access.
//! All arithmetic on order and rule values is checked.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use uuid::Uuid;

use super::models::{Discount, DiscountRule, OrderSnapshot, RuleKind};

/// Round to specified decimal places, halves away from zero.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use laundry_promotions::discounts::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(3));
/// assert_eq!(round_money(dec!(1.005), 2), dec!(1.01));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// A discount amount did not fit in a `Decimal`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Discount amount out of range for discount {discount_id}")]
pub struct AmountOverflow {
    pub discount_id: Uuid,
}

/// Raw amount a rule would take off the order, before rounding.
///
/// Returns `None` when the amount overflows.
pub fn rule_amount(kind: &RuleKind, order: &OrderSnapshot) -> Option<Decimal> {
    match kind {
        RuleKind::Percentage {
            value,
            max_discount,
        } => {
            let amount = order
                .order_value
                .checked_mul(*value)?
                .checked_div(Decimal::ONE_HUNDRED)?;
            Some(match max_discount {
                Some(cap) => amount.min(*cap),
                None => amount,
            })
        }
        RuleKind::Flat { value } => Some(*value),
        RuleKind::BuyXGetY {
            buy_quantity,
            get_quantity,
            service_type,
        } => {
            // No line quantity can fill a group wider than u32
            let Some(group) = buy_quantity.checked_add(*get_quantity) else {
                return Some(Decimal::ZERO);
            };
            if group == 0 {
                return Some(Decimal::ZERO);
            }

            order
                .items
                .iter()
                .filter(|item| item.unit_price > Decimal::ZERO)
                .filter(|item| match service_type {
                    Some(wanted) => item
                        .service_type
                        .as_deref()
                        .or(order.service_type.as_deref())
                        .is_some_and(|s| s.eq_ignore_ascii_case(wanted)),
                    None => true,
                })
                .try_fold(Decimal::ZERO, |total, item| {
                    let free_units = (item.quantity / group) * get_quantity;
                    total.checked_add(Decimal::from(free_units).checked_mul(item.unit_price)?)
                })
        }
    }
}

/// A discount that made it into the result, with the rule that matched
#[derive(Debug, Clone)]
pub struct AppliedDiscount<'a> {
    pub discount: &'a Discount,
    pub matched_rule: &'a DiscountRule,
    pub amount: Decimal,
}

/// Result of evaluating a tenancy's discounts against one order
#[derive(Debug, Clone)]
pub struct DiscountEvaluation<'a> {
    pub applicable: Vec<AppliedDiscount<'a>>,
    pub total_discount: Decimal,
    pub final_amount: Decimal,
}

/// First rule of the discount whose conditions hold and that yields a
/// positive amount. Later rules of the same discount are never combined.
fn first_matching_rule<'a>(
    discount: &'a Discount,
    order: &OrderSnapshot,
) -> Result<Option<(&'a DiscountRule, Decimal)>, AmountOverflow> {
    for rule in discount.rules.iter() {
        if !rule.conditions.matches(order) {
            continue;
        }
        let amount = rule_amount(&rule.kind, order).ok_or(AmountOverflow {
            discount_id: discount.id,
        })?;
        let amount = round_money(amount, 2);
        if amount > Decimal::ZERO {
            return Ok(Some((rule, amount)));
        }
    }
    Ok(None)
}

/// Evaluate discounts against a candidate order.
///
/// Discounts are visited by priority, highest first; ties keep their input
/// order. Each eligible discount contributes at most one rule. A matched
/// discount that cannot stack with others ends the evaluation.
///
/// # Arguments
/// * `discounts` - Candidate discounts, typically the tenancy's live set
/// * `order` - Order snapshot to test rules against
/// * `tenancy_id` - Tenancy the order belongs to
/// * `check_time` - Point in time for the validity window check
pub fn evaluate_discounts<'a>(
    discounts: &'a [Discount],
    order: &OrderSnapshot,
    tenancy_id: Uuid,
    check_time: DateTime<Utc>,
) -> Result<DiscountEvaluation<'a>, AmountOverflow> {
    let mut ordered: Vec<&Discount> = discounts.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut applicable = Vec::new();
    let mut total = Decimal::ZERO;

    for discount in ordered {
        if !discount.is_eligible_at(tenancy_id, check_time) {
            continue;
        }

        let Some((rule, amount)) = first_matching_rule(discount, order)? else {
            continue;
        };

        total = total.checked_add(amount).ok_or(AmountOverflow {
            discount_id: discount.id,
        })?;
        applicable.push(AppliedDiscount {
            discount,
            matched_rule: rule,
            amount,
        });

        if !discount.can_stack_with_other_discounts {
            break;
        }
    }

    let total_discount = round_money(total, 2);
    // A subtraction that overflows can only be below zero
    let final_amount = order
        .order_value
        .checked_sub(total_discount)
        .map_or(Decimal::ZERO, |amount| amount.max(Decimal::ZERO));

    Ok(DiscountEvaluation {
        applicable,
        total_discount,
        final_amount,
    })
}
