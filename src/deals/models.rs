// Deal domain models
//
// The benefit payload is a serde-tagged union stored as JSONB. The evaluator
// and the discount calculator both match on it exhaustively, so adding a deal
// kind is a compile-time-checked change in every place that interprets one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::deals::error::{DealError, DealResult};
use crate::deals::types::DealKind;

/// Type-specific benefit of a deal
///
/// Exactly one variant is populated per deal, matching its `deal_type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "deal_type", rename_all = "snake_case")]
pub enum DealBenefit {
    /// Percentage taken off the subtotal, 0-100
    PercentageDiscount { percent: Decimal },

    /// Fixed amount taken off the subtotal, capped at the subtotal
    FixedDiscount { amount: Decimal },

    /// A set of items sold together at a flat price replacing their sum
    Combo {
        item_ids: Vec<i32>,
        combo_price: Decimal,
    },

    /// Buy `buy_quantity` qualifying units, get `get_quantity` free
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
    },

    /// Gate on a minimum subtotal, optionally carrying its own discount.
    /// With neither `percent` nor `amount` set the deal has no monetary
    /// effect by itself (a pure gate).
    MinimumPurchase {
        threshold: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<Decimal>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Decimal>,
    },
}

impl DealBenefit {
    /// The kind tag matching this benefit variant
    pub fn kind(&self) -> DealKind {
        match self {
            DealBenefit::PercentageDiscount { .. } => DealKind::PercentageDiscount,
            DealBenefit::FixedDiscount { .. } => DealKind::FixedDiscount,
            DealBenefit::Combo { .. } => DealKind::Combo,
            DealBenefit::BuyXGetY { .. } => DealKind::BuyXGetY,
            DealBenefit::MinimumPurchase { .. } => DealKind::MinimumPurchase,
        }
    }

    /// Validate the benefit's value ranges
    ///
    /// Enforced at create/update time so the evaluator can assume well-formed
    /// input.
    pub fn validate(&self) -> DealResult<()> {
        let percent_in_range = |p: Decimal| p >= Decimal::ZERO && p <= Decimal::from(100);

        match self {
            DealBenefit::PercentageDiscount { percent } => {
                if !percent_in_range(*percent) {
                    return Err(DealError::InvalidDefinition(
                        "percent must be between 0 and 100".to_string(),
                    ));
                }
            }
            DealBenefit::FixedDiscount { amount } => {
                if *amount < Decimal::ZERO {
                    return Err(DealError::InvalidDefinition(
                        "amount must be non-negative".to_string(),
                    ));
                }
            }
            DealBenefit::Combo {
                item_ids,
                combo_price,
            } => {
                if item_ids.is_empty() {
                    return Err(DealError::InvalidDefinition(
                        "combo must reference at least one item".to_string(),
                    ));
                }
                if *combo_price < Decimal::ZERO {
                    return Err(DealError::InvalidDefinition(
                        "combo_price must be non-negative".to_string(),
                    ));
                }
            }
            DealBenefit::BuyXGetY {
                buy_quantity,
                get_quantity,
            } => {
                if *buy_quantity == 0 || *get_quantity == 0 {
                    return Err(DealError::InvalidDefinition(
                        "buy_quantity and get_quantity must be positive".to_string(),
                    ));
                }
            }
            DealBenefit::MinimumPurchase {
                threshold,
                percent,
                amount,
            } => {
                if *threshold < Decimal::ZERO {
                    return Err(DealError::InvalidDefinition(
                        "threshold must be non-negative".to_string(),
                    ));
                }
                if let Some(p) = percent {
                    if !percent_in_range(*p) {
                        return Err(DealError::InvalidDefinition(
                            "percent must be between 0 and 100".to_string(),
                        ));
                    }
                }
                if let Some(a) = amount {
                    if *a < Decimal::ZERO {
                        return Err(DealError::InvalidDefinition(
                            "amount must be non-negative".to_string(),
                        ));
                    }
                }
                if percent.is_none() && amount.is_none() {
                    tracing::warn!("minimum_purchase deal configured without a discount (gate only)");
                }
            }
        }

        Ok(())
    }
}

/// A promotional deal as evaluated by the engine
#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub badge_text: Option<String>,
    pub benefit: DealBenefit,
    /// Empty/absent sets mean unrestricted
    pub applicable_categories: Option<Vec<i32>>,
    pub applicable_items: Option<Vec<i32>>,
    pub applicable_branches: Option<Vec<i32>>,
    /// Inclusive calendar range
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Inclusive daily window in venue-local time; end < start wraps midnight
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// 0-6, Sunday = 0; empty or full set means every day
    pub days_of_week: Option<Vec<i16>>,
    pub max_usage_per_customer: Option<i32>,
    pub max_total_usage: Option<i32>,
    /// 0-100, higher wins selection tie-breaks
    pub priority: i32,
    pub allow_stacking: bool,
    pub is_active: bool,
    pub show_on_website: bool,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw deal row as stored in PostgreSQL, benefit still JSONB
#[derive(Debug, Clone, FromRow)]
pub struct DealRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub badge_text: Option<String>,
    pub deal_type: DealKind,
    pub benefit: serde_json::Value,
    pub applicable_categories: Option<Vec<i32>>,
    pub applicable_items: Option<Vec<i32>>,
    pub applicable_branches: Option<Vec<i32>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub days_of_week: Option<Vec<i16>>,
    pub max_usage_per_customer: Option<i32>,
    pub max_total_usage: Option<i32>,
    pub priority: i32,
    pub allow_stacking: bool,
    pub is_active: bool,
    pub show_on_website: bool,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DealRow> for Deal {
    type Error = DealError;

    /// Parse the JSONB benefit into its typed union and check it is
    /// consistent with the row's kind column
    fn try_from(row: DealRow) -> DealResult<Self> {
        let benefit: DealBenefit = serde_json::from_value(row.benefit)?;

        if benefit.kind() != row.deal_type {
            return Err(DealError::InvalidDefinition(format!(
                "deal {} benefit tag {} does not match deal_type {}",
                row.id,
                benefit.kind(),
                row.deal_type
            )));
        }

        Ok(Deal {
            id: row.id,
            name: row.name,
            description: row.description,
            badge_text: row.badge_text,
            benefit,
            applicable_categories: row.applicable_categories,
            applicable_items: row.applicable_items,
            applicable_branches: row.applicable_branches,
            start_date: row.start_date,
            end_date: row.end_date,
            start_time: row.start_time,
            end_time: row.end_time,
            days_of_week: row.days_of_week,
            max_usage_per_customer: row.max_usage_per_customer,
            max_total_usage: row.max_total_usage,
            priority: row.priority,
            allow_stacking: row.allow_stacking,
            is_active: row.is_active,
            show_on_website: row.show_on_website,
            usage_count: row.usage_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// One cart line as seen by the evaluator
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: i32,
    pub category_id: i32,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Candidate order context evaluated against deals
///
/// The evaluation timestamp is injected by the caller in venue-local wall
/// time; the evaluator never reads a clock.
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub lines: Vec<CartLine>,
    pub subtotal: Decimal,
    pub branch_id: i32,
    pub customer_id: Option<i32>,
    pub evaluated_at: NaiveDateTime,
}

impl OrderContext {
    /// Build a context from cart lines, computing the subtotal
    pub fn from_lines(
        lines: Vec<CartLine>,
        branch_id: i32,
        customer_id: Option<i32>,
        evaluated_at: NaiveDateTime,
    ) -> Self {
        let subtotal = lines
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();

        Self {
            lines,
            subtotal,
            branch_id,
            customer_id,
            evaluated_at,
        }
    }
}

/// Usage snapshot for one (deal, customer) pair, fetched before evaluation
/// so the eligibility check stays a pure predicate
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageCounts {
    /// Total recorded usages of the deal
    pub total: i64,
    /// Usages by the evaluating customer (0 for guests)
    pub by_customer: i64,
}

/// Append-only record of a deal applied to an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageRecord {
    pub id: i64,
    pub deal_id: Uuid,
    pub customer_id: Option<i32>,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub used_at: DateTime<Utc>,
}

/// Aggregated usage statistics for a deal
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_usage_count: i64,
    pub total_discount_given: Decimal,
    pub unique_customer_count: i64,
    pub average_discount: Decimal,
    pub recent_usage: Vec<UsageRecord>,
}

/// A deal chosen by the selector, with its computed discount
#[derive(Debug, Clone, Serialize)]
pub struct AppliedDeal {
    pub deal_id: Uuid,
    pub name: String,
    pub kind: DealKind,
    pub priority: i32,
    pub discount_amount: Decimal,
}

/// Result of evaluating a checkout against all deals
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutEvaluation {
    pub subtotal: Decimal,
    pub applied_deals: Vec<AppliedDeal>,
    pub discount_total: Decimal,
    pub final_total: Decimal,
}

impl CheckoutEvaluation {
    /// An evaluation with no applicable deals: total equals the subtotal
    pub fn unchanged(subtotal: Decimal) -> Self {
        Self {
            subtotal,
            applied_deals: Vec::new(),
            discount_total: Decimal::ZERO,
            final_total: subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_benefit_tag_round_trip() {
        let benefit = DealBenefit::BuyXGetY {
            buy_quantity: 2,
            get_quantity: 1,
        };
        let json = serde_json::to_value(&benefit).unwrap();
        assert_eq!(json["deal_type"], "buy_x_get_y");

        let parsed: DealBenefit = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, benefit);
    }

    #[test]
    fn test_benefit_kind_matches_variant() {
        assert_eq!(
            DealBenefit::FixedDiscount { amount: dec!(5) }.kind(),
            DealKind::FixedDiscount
        );
        assert_eq!(
            DealBenefit::MinimumPurchase {
                threshold: dec!(10),
                percent: None,
                amount: None,
            }
            .kind(),
            DealKind::MinimumPurchase
        );
    }

    #[test]
    fn test_benefit_validation_rejects_bad_percent() {
        let benefit = DealBenefit::PercentageDiscount {
            percent: dec!(150),
        };
        assert!(benefit.validate().is_err());

        let benefit = DealBenefit::PercentageDiscount { percent: dec!(100) };
        assert!(benefit.validate().is_ok());
    }

    #[test]
    fn test_benefit_validation_rejects_zero_quantities() {
        let benefit = DealBenefit::BuyXGetY {
            buy_quantity: 0,
            get_quantity: 1,
        };
        assert!(benefit.validate().is_err());
    }

    #[test]
    fn test_benefit_validation_rejects_empty_combo() {
        let benefit = DealBenefit::Combo {
            item_ids: vec![],
            combo_price: dec!(9.99),
        };
        assert!(benefit.validate().is_err());
    }

    #[test]
    fn test_gate_only_minimum_purchase_is_valid() {
        let benefit = DealBenefit::MinimumPurchase {
            threshold: dec!(1000),
            percent: None,
            amount: None,
        };
        assert!(benefit.validate().is_ok());
    }

    #[test]
    fn test_order_context_computes_subtotal() {
        let lines = vec![
            CartLine {
                item_id: 1,
                category_id: 10,
                quantity: 2,
                unit_price: dec!(4.50),
            },
            CartLine {
                item_id: 2,
                category_id: 11,
                quantity: 1,
                unit_price: dec!(8.00),
            },
        ];

        let ctx = OrderContext::from_lines(
            lines,
            1,
            None,
            NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );

        assert_eq!(ctx.subtotal, dec!(17.00));
    }

    #[test]
    fn test_checkout_evaluation_unchanged() {
        let eval = CheckoutEvaluation::unchanged(dec!(42.00));
        assert!(eval.applied_deals.is_empty());
        assert_eq!(eval.discount_total, Decimal::ZERO);
        assert_eq!(eval.final_total, dec!(42.00));
    }
}
