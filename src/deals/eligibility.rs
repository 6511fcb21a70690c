// Eligibility Evaluator
//
// Decides whether a deal currently applies to a candidate order. A pure
// predicate over the deal, the order context and a usage snapshot; not
// eligible is a normal `false`, never an error.

use chrono::{Datelike, NaiveTime};
use rust_decimal::Decimal;

use crate::deals::models::{CartLine, Deal, DealBenefit, OrderContext, UsageCounts};

/// Eligibility checks for deals against an order context
pub struct EligibilityEvaluator;

impl EligibilityEvaluator {
    /// Check whether a deal applies to the given order context
    ///
    /// Runs the checks in order, short-circuiting on the first failure:
    /// active flag, calendar range, weekday set, daily clock window, branch,
    /// item/category applicability, type-specific cart requirements, and
    /// usage caps.
    pub fn is_eligible(deal: &Deal, ctx: &OrderContext, usage: &UsageCounts) -> bool {
        if !deal.is_active {
            return false;
        }

        let date = ctx.evaluated_at.date();
        if let Some(start) = deal.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = deal.end_date {
            if date > end {
                return false;
            }
        }

        if let Some(ref days) = deal.days_of_week {
            // Empty or full set means every day
            if !days.is_empty() && days.len() < 7 {
                let weekday = date.weekday().num_days_from_sunday() as i16;
                if !days.contains(&weekday) {
                    return false;
                }
            }
        }

        if let (Some(start), Some(end)) = (deal.start_time, deal.end_time) {
            if !Self::time_in_window(ctx.evaluated_at.time(), start, end) {
                return false;
            }
        }

        if let Some(ref branches) = deal.applicable_branches {
            if !branches.is_empty() && !branches.contains(&ctx.branch_id) {
                return false;
            }
        }

        // Any-item matching: one qualifying cart line is enough
        if Self::is_scoped(deal) && !ctx.lines.iter().any(|line| Self::line_matches(deal, line)) {
            return false;
        }

        match &deal.benefit {
            DealBenefit::MinimumPurchase { threshold, .. } => {
                if ctx.subtotal < *threshold {
                    return false;
                }
            }
            DealBenefit::BuyXGetY { buy_quantity, .. } => {
                if Self::qualifying_quantity(deal, ctx) < *buy_quantity {
                    return false;
                }
            }
            DealBenefit::Combo { item_ids, .. } => {
                let all_present = item_ids.iter().all(|id| {
                    ctx.lines
                        .iter()
                        .any(|line| line.item_id == *id && line.quantity > 0)
                });
                if !all_present {
                    return false;
                }
            }
            DealBenefit::PercentageDiscount { .. } | DealBenefit::FixedDiscount { .. } => {}
        }

        if let Some(cap) = deal.max_usage_per_customer {
            // Guests carry no identity to count against
            if ctx.customer_id.is_some() && usage.by_customer >= cap as i64 {
                return false;
            }
        }

        if let Some(cap) = deal.max_total_usage {
            if usage.total >= cap as i64 {
                return false;
            }
        }

        true
    }

    /// Whether the deal restricts applicability by item or category
    pub fn is_scoped(deal: &Deal) -> bool {
        let has_items = deal
            .applicable_items
            .as_ref()
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        let has_categories = deal
            .applicable_categories
            .as_ref()
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        has_items || has_categories
    }

    /// Whether a cart line falls inside the deal's applicability scope
    ///
    /// Matches against the union of `applicable_items` and
    /// `applicable_categories`. An unscoped deal matches every line.
    pub fn line_matches(deal: &Deal, line: &CartLine) -> bool {
        if !Self::is_scoped(deal) {
            return true;
        }

        if let Some(ref items) = deal.applicable_items {
            if items.contains(&line.item_id) {
                return true;
            }
        }
        if let Some(ref categories) = deal.applicable_categories {
            if categories.contains(&line.category_id) {
                return true;
            }
        }

        false
    }

    /// Total quantity of cart units inside the deal's applicability scope
    pub fn qualifying_quantity(deal: &Deal, ctx: &OrderContext) -> u32 {
        ctx.lines
            .iter()
            .filter(|line| Self::line_matches(deal, line))
            .map(|line| line.quantity)
            .sum()
    }

    /// Unit prices of all qualifying units, one entry per unit
    pub fn qualifying_unit_prices(deal: &Deal, ctx: &OrderContext) -> Vec<Decimal> {
        let mut prices = Vec::new();
        for line in ctx.lines.iter().filter(|line| Self::line_matches(deal, line)) {
            for _ in 0..line.quantity {
                prices.push(line.unit_price);
            }
        }
        prices
    }

    /// Inclusive daily clock window; end < start wraps past midnight
    /// (22:00-02:00 covers 22:00 to midnight and midnight to 02:00)
    fn time_in_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
        if start <= end {
            time >= start && time <= end
        } else {
            time >= start || time <= end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::types::DealKind;
    use chrono::{NaiveDate, NaiveDateTime, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn deal_with(benefit: DealBenefit) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            name: "Test deal".to_string(),
            description: None,
            badge_text: None,
            benefit,
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
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn percent_deal() -> Deal {
        deal_with(DealBenefit::PercentageDiscount { percent: dec!(10) })
    }

    fn ctx_at(evaluated_at: NaiveDateTime) -> OrderContext {
        OrderContext::from_lines(
            vec![CartLine {
                item_id: 1,
                category_id: 10,
                quantity: 2,
                unit_price: dec!(6.00),
            }],
            1,
            Some(42),
            evaluated_at,
        )
    }

    fn noon(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_inactive_deal_never_eligible() {
        let mut deal = percent_deal();
        deal.is_active = false;

        let ctx = ctx_at(noon(2025, 6, 2));
        assert!(!EligibilityEvaluator::is_eligible(
            &deal,
            &ctx,
            &UsageCounts::default()
        ));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let mut deal = percent_deal();
        deal.start_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        deal.end_date = NaiveDate::from_ymd_opt(2025, 6, 30);

        let counts = UsageCounts::default();
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 6, 1)), &counts));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 6, 30)), &counts));
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 5, 31)), &counts));
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 7, 1)), &counts));
    }

    #[test]
    fn test_weekday_deal_ineligible_on_sunday() {
        let mut deal = percent_deal();
        deal.days_of_week = Some(vec![1, 2, 3, 4, 5]);

        // 2025-06-01 is a Sunday, 2025-06-02 a Monday
        let counts = UsageCounts::default();
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 6, 1)), &counts));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 6, 2)), &counts));
    }

    #[test]
    fn test_full_weekday_set_means_every_day() {
        let mut deal = percent_deal();
        deal.days_of_week = Some(vec![0, 1, 2, 3, 4, 5, 6]);

        let counts = UsageCounts::default();
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(noon(2025, 6, 1)), &counts));
    }

    #[test]
    fn test_overnight_time_window_wraps_midnight() {
        let mut deal = percent_deal();
        deal.start_time = NaiveTime::from_hms_opt(22, 0, 0);
        deal.end_time = NaiveTime::from_hms_opt(2, 0, 0);

        let counts = UsageCounts::default();
        let at = |h, m| {
            NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };

        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(at(23, 30)), &counts));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(at(1, 15)), &counts));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(at(22, 0)), &counts));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx_at(at(2, 0)), &counts));
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx_at(at(12, 0)), &counts));
    }

    #[test]
    fn test_branch_restriction() {
        let mut deal = percent_deal();
        deal.applicable_branches = Some(vec![2, 3]);

        let ctx = ctx_at(noon(2025, 6, 2)); // branch_id = 1
        assert!(!EligibilityEvaluator::is_eligible(
            &deal,
            &ctx,
            &UsageCounts::default()
        ));
    }

    #[test]
    fn test_any_item_matching() {
        let mut deal = percent_deal();
        deal.applicable_items = Some(vec![99]);
        deal.applicable_categories = Some(vec![10]);

        // Cart has category 10, so the union matches even though item 99 is absent
        let ctx = ctx_at(noon(2025, 6, 2));
        assert!(EligibilityEvaluator::is_eligible(
            &deal,
            &ctx,
            &UsageCounts::default()
        ));

        deal.applicable_categories = Some(vec![77]);
        assert!(!EligibilityEvaluator::is_eligible(
            &deal,
            &ctx,
            &UsageCounts::default()
        ));
    }

    #[test]
    fn test_minimum_purchase_threshold_boundary() {
        let deal = deal_with(DealBenefit::MinimumPurchase {
            threshold: dec!(1000),
            percent: Some(dec!(10)),
            amount: None,
        });

        let mut ctx = ctx_at(noon(2025, 6, 2));
        ctx.subtotal = dec!(999);
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx, &UsageCounts::default()));

        ctx.subtotal = dec!(1000);
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx, &UsageCounts::default()));
    }

    #[test]
    fn test_buy_x_get_y_needs_buy_quantity_in_cart() {
        let deal = deal_with(DealBenefit::BuyXGetY {
            buy_quantity: 3,
            get_quantity: 1,
        });

        // Cart holds 2 units
        let ctx = ctx_at(noon(2025, 6, 2));
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx, &UsageCounts::default()));

        let mut bigger = ctx.clone();
        bigger.lines[0].quantity = 3;
        assert!(EligibilityEvaluator::is_eligible(&deal, &bigger, &UsageCounts::default()));
    }

    #[test]
    fn test_combo_requires_all_items_present() {
        let deal = deal_with(DealBenefit::Combo {
            item_ids: vec![1, 2],
            combo_price: dec!(10.00),
        });

        let ctx = ctx_at(noon(2025, 6, 2)); // only item 1
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx, &UsageCounts::default()));

        let mut full = ctx.clone();
        full.lines.push(CartLine {
            item_id: 2,
            category_id: 11,
            quantity: 1,
            unit_price: dec!(5.00),
        });
        assert!(EligibilityEvaluator::is_eligible(&deal, &full, &UsageCounts::default()));
    }

    #[test]
    fn test_total_usage_cap() {
        let mut deal = percent_deal();
        deal.max_total_usage = Some(1);

        let ctx = ctx_at(noon(2025, 6, 2));
        let exhausted = UsageCounts {
            total: 1,
            by_customer: 0,
        };
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx, &exhausted));
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx, &UsageCounts::default()));
    }

    #[test]
    fn test_per_customer_cap_skipped_for_guests() {
        let mut deal = percent_deal();
        deal.max_usage_per_customer = Some(1);

        let mut ctx = ctx_at(noon(2025, 6, 2));
        let used = UsageCounts {
            total: 5,
            by_customer: 1,
        };
        assert!(!EligibilityEvaluator::is_eligible(&deal, &ctx, &used));

        ctx.customer_id = None;
        assert!(EligibilityEvaluator::is_eligible(&deal, &ctx, &used));
    }

    #[test]
    fn test_eligibility_is_idempotent() {
        let deal = percent_deal();
        let ctx = ctx_at(noon(2025, 6, 2));
        let counts = UsageCounts::default();

        let first = EligibilityEvaluator::is_eligible(&deal, &ctx, &counts);
        let second = EligibilityEvaluator::is_eligible(&deal, &ctx, &counts);
        assert_eq!(first, second);
        assert_eq!(deal.benefit.kind(), DealKind::PercentageDiscount);
    }

    #[test]
    fn test_qualifying_unit_prices_expand_per_unit() {
        let mut deal = percent_deal();
        deal.applicable_items = Some(vec![1]);

        let ctx = ctx_at(noon(2025, 6, 2)); // 2 units of item 1 at 6.00
        let prices = EligibilityEvaluator::qualifying_unit_prices(&deal, &ctx);
        assert_eq!(prices, vec![dec!(6.00), dec!(6.00)]);
    }
}
