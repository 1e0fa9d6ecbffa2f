//! The session-side cart mirror and its totals.

use serde::{Deserialize, Serialize};

use herbal_core::{CurrencyCode, Price, ProductId};

use crate::api::{CartDocument, LineItem, Product};

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Orders at or above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Price = Price::from_cents(5000, CurrencyCode::USD);

/// Flat shipping rate below the threshold.
pub const FLAT_SHIPPING_RATE: Price = Price::from_cents(599, CurrencyCode::USD);

/// Local copy of the visitor's cart.
///
/// Mutated optimistically and then overwritten by whatever the backend
/// returns on the next fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartState {
    items: Vec<LineItem>,
}

impl CartState {
    /// Lines in the order they were added.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add units of a product, merging into an existing line.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        let quantity = clamp_quantity(quantity);
        match self.line_mut(&product.id) {
            Some(line) => {
                line.quantity = (line.quantity + quantity).min(MAX_LINE_QUANTITY);
            }
            None => self.items.push(LineItem::from_product(product, quantity)),
        }
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
        } else if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
    }

    pub fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|line| &line.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .map(LineItem::line_total)
            .fold(Price::zero(CurrencyCode::USD), |acc, line| acc + line)
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        CartTotals::for_subtotal(self.subtotal(), self.item_count())
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }
}

impl From<CartDocument> for CartState {
    fn from(document: CartDocument) -> Self {
        Self {
            items: document
                .items
                .into_iter()
                .filter(|line| line.quantity > 0)
                .collect(),
        }
    }
}

/// Clamp a requested add quantity into `1..=MAX_LINE_QUANTITY`.
#[must_use]
pub fn clamp_quantity(quantity: u32) -> u32 {
    quantity.clamp(1, MAX_LINE_QUANTITY)
}

/// Order summary figures shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
}

impl CartTotals {
    /// Shipping is free at or above the threshold, flat below it. An empty
    /// cart ships nothing. Tax is settled by the backend and shown as zero.
    #[must_use]
    pub fn for_subtotal(subtotal: Price, item_count: u32) -> Self {
        let shipping = if item_count == 0 || subtotal.amount >= FREE_SHIPPING_THRESHOLD.amount {
            Price::zero(subtotal.currency_code)
        } else {
            FLAT_SHIPPING_RATE
        };
        let tax = Price::zero(subtotal.currency_code);

        Self {
            item_count,
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    /// How much more to spend for free shipping, if anything.
    #[must_use]
    pub fn remaining_for_free_shipping(&self) -> Option<Price> {
        (self.item_count > 0 && !self.shipping.is_zero()).then(|| {
            Price::new(
                FREE_SHIPPING_THRESHOLD.amount - self.subtotal.amount,
                self.subtotal.currency_code,
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Product {id}"),
            "price": price,
            "images": [format!("/img/{id}.jpg")],
        }))
        .unwrap()
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = CartState::default();
        let tea = product("tea", 12.5);
        cart.add(&tea, 1);
        cart.add(&tea, 2);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.items()[0].image.as_deref(), Some("/img/tea.jpg"));
    }

    #[test]
    fn test_add_clamps_quantity() {
        let mut cart = CartState::default();
        let tea = product("tea", 12.5);
        cart.add(&tea, 0);
        assert_eq!(cart.item_count(), 1);

        cart.add(&tea, 500);
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = CartState::default();
        let tea = product("tea", 12.5);
        let salve = product("salve", 8.0);
        cart.add(&tea, 1);
        cart.add(&salve, 1);

        cart.set_quantity(&tea.id, 4);
        assert_eq!(cart.item_count(), 5);

        cart.set_quantity(&tea.id, 0);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, salve.id);

        // Unknown ids are ignored
        cart.set_quantity(&ProductId::new("nope"), 3);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_subtotal_and_count() {
        let mut cart = CartState::default();
        cart.add(&product("tea", 12.5), 2);
        cart.add(&product("salve", 7.99), 3);

        assert_eq!(cart.subtotal().display(), "$48.97");
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_shipping_below_threshold() {
        let mut cart = CartState::default();
        cart.add(&product("tea", 49.99), 1);
        let totals = cart.totals();

        assert_eq!(totals.shipping.display(), "$5.99");
        assert_eq!(totals.total.display(), "$55.98");
        assert_eq!(
            totals.remaining_for_free_shipping().unwrap().display(),
            "$0.01"
        );
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let mut cart = CartState::default();
        cart.add(&product("tea", 25.0), 2);
        let totals = cart.totals();

        assert!(totals.shipping.is_zero());
        assert!(totals.tax.is_zero());
        assert_eq!(totals.total.display(), "$50.00");
        assert!(totals.remaining_for_free_shipping().is_none());
    }

    #[test]
    fn test_empty_cart_totals() {
        let totals = CartState::default().totals();
        assert_eq!(totals.item_count, 0);
        assert!(totals.shipping.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_from_document_drops_empty_lines() {
        let document: CartDocument = serde_json::from_value(serde_json::json!({
            "items": [
                {"productId": "a", "quantity": 2, "name": "A", "price": 3},
                {"productId": "b", "quantity": 0, "name": "B", "price": 4}
            ]
        }))
        .unwrap();
        let cart = CartState::from(document);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal().display(), "$6.00");
    }
}
