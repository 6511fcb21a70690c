use rust_decimal::Decimal;

/// Line-item arithmetic for orders
///
/// Deal discounts are computed by the deal engine; this only handles the
/// pre-discount item amounts.
pub struct PriceCalculator;

impl PriceCalculator {
    /// Subtotal for one order line: quantity times the price snapshot taken
    /// at checkout time
    pub fn line_subtotal(quantity: i32, price_snapshot: Decimal) -> Decimal {
        Decimal::from(quantity) * price_snapshot
    }

    /// Pre-discount order subtotal: sum of line subtotals
    pub fn order_subtotal(line_subtotals: &[Decimal]) -> Decimal {
        line_subtotals.iter().sum()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Line subtotal scales linearly with quantity
        #[test]
        fn prop_line_subtotal_linear(quantity in 1i32..10_000, cents in 0i64..1_000_000) {
            let price = Decimal::new(cents, 2);
            let subtotal = PriceCalculator::line_subtotal(quantity, price);
            prop_assert_eq!(subtotal, Decimal::from(quantity) * price);
        }

        /// Order subtotal is invariant under line reordering
        #[test]
        fn prop_order_subtotal_commutative(cents in proptest::collection::vec(0i64..1_000_000, 0..10)) {
            let lines: Vec<Decimal> = cents.iter().map(|c| Decimal::new(*c, 2)).collect();
            let mut reversed = lines.clone();
            reversed.reverse();

            prop_assert_eq!(
                PriceCalculator::order_subtotal(&lines),
                PriceCalculator::order_subtotal(&reversed)
            );
        }
    }
}
