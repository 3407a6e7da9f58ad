//! Discount engine for tenancy promotions.
//!
//! Evaluates a tenancy's prioritized discounts against a candidate order and
//! exposes the admin endpoints that maintain them.

pub mod calculators;
pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

// Re-export commonly used items
pub use calculators::{
    evaluate_discounts, round_money, AmountOverflow, AppliedDiscount, DiscountEvaluation,
};
pub use models::{Discount, DiscountRule, OrderItem, OrderSnapshot, RuleConditions, RuleKind};
pub use routes::router;
