// Discount Calculator
//
// Computes the monetary effect of a deal that already passed eligibility.
// Callers must not invoke this for ineligible deals; the calculator assumes
// a well-formed deal and a qualifying cart.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::deals::eligibility::EligibilityEvaluator;
use crate::deals::models::{Deal, DealBenefit, OrderContext};

/// Currency minor-unit precision (2 decimals, round half up)
const MONEY_DP: u32 = 2;

/// Discount computation for eligible deals
pub struct DiscountCalculator;

impl DiscountCalculator {
    /// Compute the discount a deal grants against the full order subtotal
    pub fn compute(deal: &Deal, ctx: &OrderContext) -> Decimal {
        Self::compute_against(deal, ctx, ctx.subtotal)
    }

    /// Compute the discount against a given base amount
    ///
    /// The selector applies deals sequentially, so later deals are computed
    /// against the subtotal remaining after earlier discounts. The result is
    /// rounded to minor units and clamped to `[0, base]` so a chain of deals
    /// can never drive the total negative.
    pub fn compute_against(deal: &Deal, ctx: &OrderContext, base: Decimal) -> Decimal {
        let raw = match &deal.benefit {
            DealBenefit::PercentageDiscount { percent } => Self::percentage_of(base, *percent),

            DealBenefit::FixedDiscount { amount } => *amount,

            DealBenefit::Combo {
                item_ids,
                combo_price,
            } => Self::combo_discount(ctx, item_ids, *combo_price),

            DealBenefit::BuyXGetY {
                buy_quantity,
                get_quantity,
            } => Self::buy_x_get_y_discount(deal, ctx, *buy_quantity, *get_quantity),

            DealBenefit::MinimumPurchase {
                percent, amount, ..
            } => {
                // Threshold is checked by the evaluator; here only the
                // carried discount matters. A gate-only deal grants nothing.
                if let Some(p) = percent {
                    Self::percentage_of(base, *p)
                } else if let Some(a) = amount {
                    *a
                } else {
                    Decimal::ZERO
                }
            }
        };

        Self::round_money(raw).clamp(Decimal::ZERO, base)
    }

    /// Percentage of a base amount, rounded to minor units
    fn percentage_of(base: Decimal, percent: Decimal) -> Decimal {
        Self::round_money(base * percent / Decimal::from(100))
    }

    /// Combo: the member items' individual prices minus the flat combo price,
    /// counting one unit of each member
    fn combo_discount(ctx: &OrderContext, item_ids: &[i32], combo_price: Decimal) -> Decimal {
        let mut member_sum = Decimal::ZERO;
        for id in item_ids {
            match ctx.lines.iter().find(|line| line.item_id == *id) {
                Some(line) => member_sum += line.unit_price,
                // Eligibility guarantees presence; a missing member is a
                // caller contract violation, so grant nothing
                None => return Decimal::ZERO,
            }
        }
        member_sum - combo_price
    }

    /// Buy X get Y: every full group of (buy + get) qualifying units earns
    /// `get` free units, priced from the cheapest qualifying units first
    fn buy_x_get_y_discount(
        deal: &Deal,
        ctx: &OrderContext,
        buy_quantity: u32,
        get_quantity: u32,
    ) -> Decimal {
        let group_size = buy_quantity + get_quantity;
        if group_size == 0 {
            return Decimal::ZERO;
        }

        let mut unit_prices = EligibilityEvaluator::qualifying_unit_prices(deal, ctx);
        let groups = unit_prices.len() as u32 / group_size;
        let free_units = (groups * get_quantity) as usize;
        if free_units == 0 {
            return Decimal::ZERO;
        }

        unit_prices.sort();
        unit_prices.iter().take(free_units).sum()
    }

    fn round_money(amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::deals::models::CartLine;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn percent_deal(percent: Decimal) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            name: "prop".to_string(),
            description: None,
            badge_text: None,
            benefit: DealBenefit::PercentageDiscount { percent },
            applicable_categories: None,
            applicable_items: None,
            applicable_branches: None,
            start_date: None,
            end_date: None,
            start_time: None,
            end_time: None,
            days_of_week: None,
            max_usage_per_customer: None,
            max_total_usage: None,
            priority: 0,
            allow_stacking: true,
            is_active: true,
            show_on_website: true,
            usage_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn ctx_with_subtotal(cents: u64) -> OrderContext {
        OrderContext::from_lines(
            vec![CartLine {
                item_id: 1,
                category_id: 1,
                quantity: 1,
                unit_price: Decimal::new(cents as i64, 2),
            }],
            1,
            None,
            NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    proptest! {
        /// A percentage discount never exceeds the subtotal
        #[test]
        fn prop_percentage_never_exceeds_subtotal(
            cents in 0u64..10_000_000,
            percent in 0u32..=100,
        ) {
            let deal = percent_deal(Decimal::from(percent));
            let ctx = ctx_with_subtotal(cents);

            let discount = DiscountCalculator::compute(&deal, &ctx);
            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= ctx.subtotal);
        }

        /// A percentage discount is monotonically non-decreasing in subtotal
        #[test]
        fn prop_percentage_monotonic_in_subtotal(
            cents in 0u64..1_000_000,
            extra in 0u64..1_000_000,
            percent in 0u32..=100,
        ) {
            let deal = percent_deal(Decimal::from(percent));

            let smaller = DiscountCalculator::compute(&deal, &ctx_with_subtotal(cents));
            let larger = DiscountCalculator::compute(&deal, &ctx_with_subtotal(cents + extra));
            prop_assert!(larger >= smaller);
        }
    }
}
