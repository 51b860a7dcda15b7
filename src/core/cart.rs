//! Quote cart
//!
//! A cart is built by the caller and handed to whatever needs it. It holds a
//! snapshot of each product at the time it was added and is never persisted.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::db::Product;

/// Snapshot of a product inside the cart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product_id: i64,
    pub category: String,
    pub sub_category: Option<String>,
    pub designation: String,
    pub dimensions: Option<String>,
    pub purchase_price: f64,
    pub supplier_reference: Option<String>,
    pub datasheet_path: Option<String>,
    pub quote_path: Option<String>,
}

impl From<&Product> for CartItem {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id,
            category: p.category.clone(),
            sub_category: p.sub_category.clone(),
            designation: p.designation.clone(),
            dimensions: p.dimensions.clone(),
            purchase_price: p.purchase_price,
            supplier_reference: p.supplier_reference.clone(),
            datasheet_path: p.datasheet_path.clone(),
            quote_path: p.quote_path.clone(),
        }
    }
}

/// A priced cart line
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine<'a> {
    pub item: &'a CartItem,
    pub sale_price: f64,
}

/// Products selected for a quote, keyed by product id
#[derive(Debug, Default, Clone)]
pub struct Cart {
    items: BTreeMap<i64, CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product; re-adding refreshes its snapshot. Returns true if it was new.
    pub fn add(&mut self, product: &Product) -> bool {
        self.items
            .insert(product.id, CartItem::from(product))
            .is_none()
    }

    pub fn remove(&mut self, product_id: i64) -> Option<CartItem> {
        self.items.remove(&product_id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.items.contains_key(&product_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items ordered by product id
    pub fn items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.values()
    }

    /// Sum of purchase prices
    pub fn total_purchase(&self) -> f64 {
        self.items.values().map(|i| i.purchase_price).sum()
    }

    /// Sum of sale prices at the given margin percentage
    pub fn total_sale(&self, margin: f64) -> f64 {
        self.items
            .values()
            .map(|i| sale_price(i.purchase_price, margin))
            .sum()
    }

    /// Priced lines for display or export
    pub fn lines(&self, margin: f64) -> Vec<QuoteLine<'_>> {
        self.items
            .values()
            .map(|item| QuoteLine {
                item,
                sale_price: sale_price(item.purchase_price, margin),
            })
            .collect()
    }
}

/// Sale price for a purchase price and a margin percentage
pub fn sale_price(purchase: f64, margin: f64) -> f64 {
    purchase * (1.0 + margin / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, price: f64) -> Product {
        Product {
            id,
            category: "Portes".into(),
            sub_category: None,
            designation: format!("Produit {}", id),
            dimensions: None,
            purchase_price: price,
            supplier_reference: None,
            active: true,
            datasheet_path: None,
            quote_path: None,
            created: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_total_is_sum_of_purchase_prices() {
        let mut cart = Cart::new();
        cart.add(&product(1, 100.0));
        cart.add(&product(2, 250.5));
        cart.add(&product(3, 49.5));

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.total_purchase(), 400.0);
    }

    #[test]
    fn test_readding_replaces_snapshot() {
        let mut cart = Cart::new();
        assert!(cart.add(&product(1, 100.0)));
        assert!(!cart.add(&product(1, 120.0)));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_purchase(), 120.0);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(&product(1, 10.0));
        cart.add(&product(2, 20.0));

        let removed = cart.remove(1).unwrap();
        assert_eq!(removed.product_id, 1);
        assert!(cart.remove(1).is_none());
        assert!(!cart.contains(1));
        assert_eq!(cart.total_purchase(), 20.0);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_purchase(), 0.0);
    }

    #[test]
    fn test_sale_prices_use_margin() {
        let mut cart = Cart::new();
        cart.add(&product(2, 200.0));
        cart.add(&product(1, 100.0));

        assert!((cart.total_sale(20.0) - 360.0).abs() < 1e-9);

        let lines = cart.lines(25.0);
        assert_eq!(lines[0].item.product_id, 1);
        assert!((lines[0].sale_price - 125.0).abs() < 1e-9);
        assert!((lines[1].sale_price - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_is_independent_of_product() {
        let mut cart = Cart::new();
        let mut p = product(7, 10.0);
        cart.add(&p);
        p.purchase_price = 99.0;
        assert_eq!(cart.total_purchase(), 10.0);
    }
}
