use rust_decimal::{Decimal, RoundingStrategy};

use crate::database::models::OrderItem;

/// Totals derived from the priced order lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// 10% flat tax rate
pub fn tax_rate() -> Decimal {
    Decimal::new(1, 1)
}

/// Subtotals strictly above this ship free
pub fn free_shipping_threshold() -> Decimal {
    Decimal::ONE_HUNDRED
}

pub fn flat_shipping() -> Decimal {
    Decimal::TEN
}

/// `None` when the product overflows the decimal range
pub fn line_total(price: Decimal, quantity: u32) -> Option<Decimal> {
    price.checked_mul(Decimal::from(quantity))
}

/// Money amounts are kept to cents, half away from zero
fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices the order lines; `None` when any amount leaves the decimal range
pub fn compute_totals(items: &[OrderItem]) -> Option<OrderTotals> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total))?;
    let tax = round_money(subtotal.checked_mul(tax_rate())?);
    let shipping = if subtotal > free_shipping_threshold() {
        Decimal::ZERO
    } else {
        flat_shipping()
    };
    let discount = Decimal::ZERO;

    let total = subtotal
        .checked_add(tax)?
        .checked_add(shipping)?
        .checked_sub(discount)?;

    Some(OrderTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(price: Decimal, quantity: u32) -> OrderItem {
        OrderItem {
            product: Uuid::new_v4(),
            quantity,
            price,
            total: line_total(price, quantity).unwrap(),
        }
    }

    #[test]
    fn small_orders_pay_flat_shipping() {
        let totals = compute_totals(&[item(Decimal::from(20), 3)]).unwrap();
        assert_eq!(totals.subtotal, Decimal::from(60));
        assert_eq!(totals.tax, Decimal::from(6));
        assert_eq!(totals.shipping, Decimal::from(10));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::from(76));
    }

    #[test]
    fn shipping_is_free_only_above_one_hundred() {
        let at_threshold = compute_totals(&[item(Decimal::from(50), 2)]).unwrap();
        assert_eq!(at_threshold.shipping, Decimal::from(10));

        let above = compute_totals(&[item(Decimal::new(10001, 2), 1)]).unwrap();
        assert_eq!(above.shipping, Decimal::ZERO);
    }

    #[test]
    fn tax_rounds_to_cents() {
        // 10% of 0.15 is 0.015, rounded half away from zero
        let totals = compute_totals(&[item(Decimal::new(5, 2), 3)]).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(15, 2));
        assert_eq!(totals.tax, Decimal::new(2, 2));
        assert_eq!(totals.total, totals.subtotal + totals.tax + totals.shipping - totals.discount);
    }

    #[test]
    fn total_is_the_sum_of_its_parts() {
        let items = [item(Decimal::new(1999, 2), 2), item(Decimal::new(4550, 2), 3)];
        let totals = compute_totals(&items).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(17648, 2));
        assert_eq!(totals.tax, Decimal::new(1765, 2));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(19413, 2));
    }

    #[test]
    fn amounts_beyond_the_decimal_range_are_refused() {
        assert_eq!(line_total(Decimal::MAX, 2), None);
        assert_eq!(line_total(Decimal::MAX, 1), Some(Decimal::MAX));

        let huge = OrderItem {
            product: Uuid::new_v4(),
            quantity: 1,
            price: Decimal::MAX,
            total: Decimal::MAX,
        };
        assert!(compute_totals(&[huge.clone(), huge.clone()]).is_none());
        // Tax and shipping on top of the largest subtotal still overflow
        assert!(compute_totals(&[huge]).is_none());
    }
}
