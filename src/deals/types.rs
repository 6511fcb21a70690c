// Domain type definitions for the deal evaluation system
// Provides shared types used across the evaluator, calculator and selector

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of promotional deal
///
/// Determines which type-specific benefit fields are meaningful for a deal.
/// The tag is stored both as a column (for filtering) and inside the JSONB
/// benefit payload (as the serde tag of [`crate::deals::DealBenefit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    /// Percentage taken off the order subtotal
    PercentageDiscount,

    /// Fixed currency amount taken off the order subtotal
    FixedDiscount,

    /// A set of items sold together at a flat price
    Combo,

    /// Buy N qualifying units, get M units free
    BuyXGetY,

    /// Discount gated on a minimum order subtotal
    MinimumPurchase,
}

impl fmt::Display for DealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealKind::PercentageDiscount => write!(f, "percentage_discount"),
            DealKind::FixedDiscount => write!(f, "fixed_discount"),
            DealKind::Combo => write!(f, "combo"),
            DealKind::BuyXGetY => write!(f, "buy_x_get_y"),
            DealKind::MinimumPurchase => write!(f, "minimum_purchase"),
        }
    }
}

impl std::str::FromStr for DealKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage_discount" => Ok(DealKind::PercentageDiscount),
            "fixed_discount" => Ok(DealKind::FixedDiscount),
            "combo" => Ok(DealKind::Combo),
            "buy_x_get_y" => Ok(DealKind::BuyXGetY),
            "minimum_purchase" => Ok(DealKind::MinimumPurchase),
            _ => Err(format!("Invalid deal kind: {}", s)),
        }
    }
}
