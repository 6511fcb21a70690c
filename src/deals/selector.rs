// Deal Selector
//
// Decides which eligible deals are actually applied to an order and in what
// order. Selection and application are fully deterministic: ties fall back to
// id order so two evaluations of the same inputs always produce the same
// total.

use rust_decimal::Decimal;

use crate::deals::discount::DiscountCalculator;
use crate::deals::models::{AppliedDeal, CheckoutEvaluation, Deal, OrderContext};

/// Selection over a set of eligible deals
pub struct DealSelector;

impl DealSelector {
    /// Select and apply deals, producing the ordered applied list and the
    /// adjusted total
    ///
    /// 1. Deals that disallow stacking are mutually exclusive: at most one is
    ///    kept - highest priority, then greatest discount against the full
    ///    subtotal, then smallest id.
    /// 2. All stacking-allowed deals join the winner unconditionally.
    /// 3. Discounts apply sequentially in descending priority (id ascending
    ///    on ties), each computed against the remaining subtotal, so the
    ///    final total never goes below zero.
    pub fn select(eligible: &[Deal], ctx: &OrderContext) -> CheckoutEvaluation {
        if eligible.is_empty() {
            return CheckoutEvaluation::unchanged(ctx.subtotal);
        }

        let (stacking, exclusive): (Vec<&Deal>, Vec<&Deal>) =
            eligible.iter().partition(|deal| deal.allow_stacking);

        let winner = exclusive.into_iter().max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| {
                    DiscountCalculator::compute(a, ctx).cmp(&DiscountCalculator::compute(b, ctx))
                })
                // Smallest id wins the final tie-break
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut chosen = stacking;
        if let Some(deal) = winner {
            chosen.push(deal);
        }

        chosen.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

        let mut remaining = ctx.subtotal;
        let mut applied = Vec::with_capacity(chosen.len());

        for deal in chosen {
            let discount = DiscountCalculator::compute_against(deal, ctx, remaining);
            remaining -= discount;

            applied.push(AppliedDeal {
                deal_id: deal.id,
                name: deal.name.clone(),
                kind: deal.benefit.kind(),
                priority: deal.priority,
                discount_amount: discount,
            });
        }

        let final_total = remaining.max(Decimal::ZERO);

        CheckoutEvaluation {
            subtotal: ctx.subtotal,
            discount_total: ctx.subtotal - final_total,
            applied_deals: applied,
            final_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::models::{CartLine, DealBenefit};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn deal(benefit: DealBenefit, priority: i32, allow_stacking: bool) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            name: format!("deal p{}", priority),
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
            priority,
            allow_stacking,
            is_active: true,
            show_on_website: true,
            usage_count: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn ctx(subtotal: Decimal) -> OrderContext {
        OrderContext::from_lines(
            vec![CartLine {
                item_id: 1,
                category_id: 1,
                quantity: 1,
                unit_price: subtotal,
            }],
            1,
            Some(9),
            NaiveDate::from_ymd_opt(2025, 6, 2)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_no_eligible_deals_leaves_total_unchanged() {
        let evaluation = DealSelector::select(&[], &ctx(dec!(75.00)));

        assert!(evaluation.applied_deals.is_empty());
        assert_eq!(evaluation.discount_total, Decimal::ZERO);
        assert_eq!(evaluation.final_total, dec!(75.00));
    }

    #[test]
    fn test_higher_priority_non_stacking_deal_wins() {
        let low = deal(
            DealBenefit::PercentageDiscount { percent: dec!(50) },
            50,
            false,
        );
        let high = deal(
            DealBenefit::PercentageDiscount { percent: dec!(10) },
            80,
            false,
        );

        let evaluation = DealSelector::select(&[low, high.clone()], &ctx(dec!(100.00)));

        assert_eq!(evaluation.applied_deals.len(), 1);
        assert_eq!(evaluation.applied_deals[0].deal_id, high.id);
        assert_eq!(evaluation.final_total, dec!(90.00));
    }

    #[test]
    fn test_priority_tie_broken_by_discount_then_id() {
        let small = deal(
            DealBenefit::PercentageDiscount { percent: dec!(5) },
            50,
            false,
        );
        let big = deal(
            DealBenefit::PercentageDiscount { percent: dec!(20) },
            50,
            false,
        );

        let evaluation = DealSelector::select(&[small, big.clone()], &ctx(dec!(100.00)));
        assert_eq!(evaluation.applied_deals[0].deal_id, big.id);

        // Identical priority and discount: smallest id wins deterministically
        let mut a = deal(
            DealBenefit::PercentageDiscount { percent: dec!(10) },
            50,
            false,
        );
        let mut b = a.clone();
        a.id = Uuid::from_u128(1);
        b.id = Uuid::from_u128(2);

        let forward = DealSelector::select(&[a.clone(), b.clone()], &ctx(dec!(100.00)));
        let reversed = DealSelector::select(&[b, a.clone()], &ctx(dec!(100.00)));
        assert_eq!(forward.applied_deals[0].deal_id, a.id);
        assert_eq!(reversed.applied_deals[0].deal_id, a.id);
    }

    #[test]
    fn test_stacking_deals_join_the_winner() {
        let exclusive = deal(
            DealBenefit::FixedDiscount { amount: dec!(10.00) },
            80,
            false,
        );
        let stackable = deal(
            DealBenefit::PercentageDiscount { percent: dec!(10) },
            20,
            true,
        );

        let evaluation =
            DealSelector::select(&[exclusive.clone(), stackable.clone()], &ctx(dec!(100.00)));

        assert_eq!(evaluation.applied_deals.len(), 2);
        // Applied in priority order: fixed 10 off first, then 10% of the 90 remainder
        assert_eq!(evaluation.applied_deals[0].deal_id, exclusive.id);
        assert_eq!(evaluation.applied_deals[0].discount_amount, dec!(10.00));
        assert_eq!(evaluation.applied_deals[1].deal_id, stackable.id);
        assert_eq!(evaluation.applied_deals[1].discount_amount, dec!(9.00));
        assert_eq!(evaluation.final_total, dec!(81.00));
    }

    #[test]
    fn test_sequential_discounting_is_multiplicative() {
        let first = deal(
            DealBenefit::PercentageDiscount { percent: dec!(10) },
            90,
            true,
        );
        let second = deal(
            DealBenefit::PercentageDiscount { percent: dec!(5) },
            10,
            true,
        );

        let evaluation = DealSelector::select(&[first, second], &ctx(dec!(100.00)));

        // 100 - 10% = 90, then 90 - 5% = 85.50 (not the additive 85)
        assert_eq!(evaluation.final_total, dec!(85.50));
        assert_eq!(evaluation.discount_total, dec!(14.50));
    }

    #[test]
    fn test_total_floored_at_zero() {
        let big_fixed = deal(
            DealBenefit::FixedDiscount { amount: dec!(500.00) },
            60,
            true,
        );
        let percent = deal(
            DealBenefit::PercentageDiscount { percent: dec!(25) },
            40,
            true,
        );

        let evaluation = DealSelector::select(&[big_fixed, percent], &ctx(dec!(300.00)));

        assert_eq!(evaluation.final_total, Decimal::ZERO);
        assert_eq!(evaluation.discount_total, dec!(300.00));
    }
}
