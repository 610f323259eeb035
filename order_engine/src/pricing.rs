//! Order pricing.
//!
//! Prices come from the catalog at the moment the order is built and are frozen into [`OrderLine`]s. Shipping is a
//! flat fee and tax a flat rate on the subtotal; neither depends on the destination.
use rust_decimal::Decimal;
use shop_common::{Money, DEFAULT_CURRENCY};
use thiserror::Error;

use crate::db_types::{Item, ItemQuantity, OrderLine};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    pub shipping_fee: Money,
    /// e.g. 0.14 for 14%
    pub tax_rate: Decimal,
    pub currency: String,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_fee: Money::from_minor_units(5_000),
            tax_rate: Decimal::new(14, 2),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Item {0} is not in the catalog")]
    MissingItem(i64),
    #[error("The order total is too large to be represented")]
    Overflow,
}

/// The priced snapshot of an order. `total == subtotal + shipping + tax - discount` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl PricingPolicy {
    pub fn new(shipping_fee: Money, tax_rate: Decimal, currency: &str) -> Self {
        Self { shipping_fee, tax_rate, currency: currency.to_string() }
    }

    /// Prices `requested` against `items`. Fails with [`PricingError::MissingItem`] for the first requested item
    /// missing from `items`, and with [`PricingError::Overflow`] if any amount cannot be represented.
    pub fn price(&self, requested: &[ItemQuantity], items: &[Item]) -> Result<PricedOrder, PricingError> {
        let lines = requested
            .iter()
            .map(|req| {
                let item = items
                    .iter()
                    .find(|item| item.id == req.item_id)
                    .ok_or(PricingError::MissingItem(req.item_id))?;
                OrderLine::from_item(item, req.quantity).ok_or(PricingError::Overflow)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.line_total))
            .ok_or(PricingError::Overflow)?;
        let shipping = self.shipping_fee;
        let tax = subtotal.apply_rate(self.tax_rate).ok_or(PricingError::Overflow)?;
        let discount = Money::zero();
        let total = subtotal
            .checked_add(shipping)
            .and_then(|v| v.checked_add(tax))
            .ok_or(PricingError::Overflow)?
            - discount;
        Ok(PricedOrder { lines, subtotal, shipping, tax, discount, total })
    }
}
