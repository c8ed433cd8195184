//! Shopping cart handed to checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::order::LineItem;
use crate::domain::value_objects::{Dimensions, Money, MoneyError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub image: Option<String>,
    pub weight_grams: Option<u32>,
    pub dimensions: Option<Dimensions>,
}

impl CartItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity) }

    /// Frozen copy for the order; price and quantity never change afterwards.
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            id: self.product_id.clone(),
            title: self.title.clone(),
            price: self.unit_price.clone(),
            quantity: self.quantity,
            image: self.image.clone(),
            weight_grams: self.weight_grams,
            dimensions: self.dimensions,
        }
    }
}

/// Lines are unique per product and priced in the cart's currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    currency: String,
    lines: Vec<CartItem>,
}

impl Cart {
    pub fn new(currency: &str) -> Self { Self { currency: currency.to_string(), lines: Vec::new() } }

    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn unit_count(&self) -> u32 { self.lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity)) }

    pub fn subtotal(&self) -> Result<Money, CartError> {
        checked_total(&self.lines).map(|amount| Money::new(amount, &self.currency))
    }

    pub fn line_items(&self) -> Vec<LineItem> { self.lines.iter().map(CartItem::to_line_item).collect() }

    /// Adds to an existing line for the same product. Zero quantities are ignored.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.unit_price.currency() != self.currency {
            return Err(CartError::Currency { expected: self.currency.clone(), found: item.unit_price.currency().to_string() });
        }
        if item.quantity == 0 {
            return Ok(());
        }
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => line.quantity = line.quantity.checked_add(item.quantity).ok_or(CartError::Overflow)?,
            None => lines.push(item),
        }
        self.replace_lines(lines)
    }

    /// Setting zero drops the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(product_id).map(|_| ());
        }
        let mut lines = self.lines.clone();
        let line = lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CartError::UnknownItem(product_id.to_string()))?;
        line.quantity = quantity;
        self.replace_lines(lines)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<CartItem, CartError> {
        let pos = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| CartError::UnknownItem(product_id.to_string()))?;
        Ok(self.lines.remove(pos))
    }

    pub fn clear(&mut self) { self.lines.clear(); }

    /// Commits `lines` only if their total is representable.
    fn replace_lines(&mut self, lines: Vec<CartItem>) -> Result<(), CartError> {
        checked_total(&lines)?;
        self.lines = lines;
        Ok(())
    }
}

fn checked_total(lines: &[CartItem]) -> Result<Decimal, CartError> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        let line_total = line.line_total()?;
        acc.checked_add(line_total.amount()).ok_or(CartError::Overflow)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("No cart line for product {0}")]
    UnknownItem(String),
    #[error("Cart is priced in {expected}, item in {found}")]
    Currency { expected: String, found: String },
    #[error("Cart quantity or total is out of range")]
    Overflow,
}

impl From<MoneyError> for CartError {
    fn from(_: MoneyError) -> Self { CartError::Overflow }
}
