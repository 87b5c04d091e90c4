use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// One product line, as held in the cart and frozen into an order summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl OrderLine {
    /// Saturates instead of overflowing; cart contents come from storage.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Shipping and tax rules applied when a summary is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub shipping_flat: Decimal,
    /// Orders at or above this subtotal ship free.
    pub free_shipping_threshold: Option<Decimal>,
    /// Fraction of the subtotal, e.g. `0.16` for 16% VAT.
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_flat: Decimal::ZERO,
            free_shipping_threshold: None,
            tax_rate: Decimal::ZERO,
        }
    }
}

/// Immutable snapshot of the cart at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderSummary {
    pub fn compute(items: Vec<OrderLine>, policy: &PricingPolicy) -> Self {
        let subtotal = items
            .iter()
            .map(OrderLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add);

        let shipping = match policy.free_shipping_threshold {
            _ if items.is_empty() => Decimal::ZERO,
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => policy.shipping_flat,
        };
        let tax = subtotal
            .saturating_mul(policy.tax_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Self {
            items,
            subtotal,
            shipping,
            tax,
            total: subtotal.saturating_add(shipping).saturating_add(tax),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().fold(0u32, |n, l| n.saturating_add(l.quantity))
    }

    /// M-Pesa only moves whole shillings; round the total up.
    pub fn amount_due(&self) -> u64 {
        match self.total.ceil().to_u64() {
            Some(amount) => amount,
            None if self.total.is_sign_positive() => u64::MAX,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn line(id: i64, qty: u32, price: Decimal) -> OrderLine {
        OrderLine {
            item_id: id,
            name: format!("item-{id}"),
            quantity: qty,
            unit_price: price,
            image_url: None,
        }
    }

    #[test]
    fn test_summary_with_default_policy() {
        let summary = OrderSummary::compute(
            vec![line(1, 2, dec!(150)), line(2, 1, dec!(200))],
            &PricingPolicy::default(),
        );
        assert_eq!(summary.subtotal, dec!(500));
        assert_eq!(summary.shipping, dec!(0));
        assert_eq!(summary.tax, dec!(0));
        assert_eq!(summary.total, dec!(500));
        assert_eq!(summary.item_count(), 3);
        assert_eq!(summary.amount_due(), 500);
    }

    #[test]
    fn test_summary_with_shipping_and_tax() {
        let policy = PricingPolicy {
            shipping_flat: dec!(100),
            free_shipping_threshold: Some(dec!(5000)),
            tax_rate: dec!(0.16),
        };
        let summary = OrderSummary::compute(vec![line(1, 1, dec!(999.99))], &policy);
        assert_eq!(summary.shipping, dec!(100));
        assert_eq!(summary.tax, dec!(160.00));
        assert_eq!(summary.total, dec!(1259.99));
        assert_eq!(summary.amount_due(), 1260);
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let policy = PricingPolicy {
            shipping_flat: dec!(100),
            free_shipping_threshold: Some(dec!(1000)),
            tax_rate: Decimal::ZERO,
        };
        let summary = OrderSummary::compute(vec![line(1, 4, dec!(250))], &policy);
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.total, dec!(1000));
    }

    #[test]
    fn test_huge_prices_saturate() {
        let policy = PricingPolicy {
            shipping_flat: dec!(100),
            free_shipping_threshold: None,
            tax_rate: dec!(0.16),
        };
        let summary = OrderSummary::compute(
            vec![line(1, u32::MAX, Decimal::MAX), line(2, 3, Decimal::MAX)],
            &policy,
        );
        assert_eq!(summary.subtotal, Decimal::MAX);
        assert_eq!(summary.total, Decimal::MAX);
        assert_eq!(summary.amount_due(), u64::MAX);
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let policy = PricingPolicy {
            shipping_flat: dec!(100),
            ..PricingPolicy::default()
        };
        let summary = OrderSummary::compute(vec![], &policy);
        assert!(summary.is_empty());
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.amount_due(), 0);
    }
}
