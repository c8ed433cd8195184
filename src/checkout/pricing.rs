//! Order totals: free-shipping threshold and the bank-transfer discount.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::PaymentMethod;
use crate::domain::value_objects::{Money, MoneyError, DEFAULT_CURRENCY};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub currency: String,
    /// Carts at or above this ship free.
    pub free_shipping_limit: Decimal,
    pub default_shipping_cost: Decimal,
    pub bank_transfer_discount_enabled: bool,
    pub bank_transfer_discount_percent: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            free_shipping_limit: Decimal::new(1500, 0),
            default_shipping_cost: Decimal::new(100, 0),
            bank_transfer_discount_enabled: true,
            bank_transfer_discount_percent: Decimal::new(2, 0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub cart_total: Money,
    pub shipping_cost: Money,
    pub grand_total: Money,
    pub discount: Option<Money>,
    pub final_total: Money,
}

impl PricingPolicy {
    pub fn shipping_cost(&self, cart_total: Decimal) -> Decimal {
        if cart_total >= self.free_shipping_limit { Decimal::ZERO } else { self.default_shipping_cost }
    }

    pub fn quote(&self, cart_total: Decimal, method: PaymentMethod) -> Result<PriceBreakdown, MoneyError> {
        let money = |amount: Decimal| Money::new(amount, &self.currency);
        let cart_total = money(cart_total);
        let shipping_cost = money(self.shipping_cost(cart_total.amount()));
        let grand_total = cart_total.add(&shipping_cost)?;
        // Discount applies to goods only, never to shipping.
        let discount = if method == PaymentMethod::Eft && self.bank_transfer_discount_enabled {
            Some(cart_total.percent(self.bank_transfer_discount_percent)?)
        } else {
            None
        };
        let final_total = match &discount {
            Some(d) => grand_total.subtract(d)?,
            None => grand_total.clone(),
        };
        Ok(PriceBreakdown { cart_total, shipping_cost, grand_total, discount, final_total })
    }
}

/// Time left to complete a bank transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentCountdown {
    pub deadline: DateTime<Utc>,
}

impl PaymentCountdown {
    pub fn starting(at: DateTime<Utc>, window: Duration) -> Self { Self { deadline: at + window } }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration { (self.deadline - now).max(Duration::zero()) }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.deadline }

    /// `HH:MM:SS`
    pub fn display(&self, now: DateTime<Utc>) -> String {
        let secs = self.remaining(now).num_seconds();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
