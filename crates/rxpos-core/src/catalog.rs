//! # Catalog Snapshot
//!
//! The products the register can sell, as loaded with the sale screen.
//! The cart looks products up here when re-pricing after a sale-mode switch.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CategoryId, Product, ProductId};

/// Read-only product list in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Catalog { products }
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Finds a product by its code or barcode (scanner input).
    pub fn find_by_code(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.products.iter().find(|p| {
            p.code.eq_ignore_ascii_case(code) || p.barcode.as_deref() == Some(code)
        })
    }

    /// Case-insensitive search over name and code, optionally limited to a
    /// category. An empty query matches everything.
    pub fn search<'a>(
        &'a self,
        query: &str,
        category: Option<&'a CategoryId>,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        let needle = query.trim().to_lowercase();
        self.products.iter().filter(move |p| {
            let in_category = category.map_or(true, |c| p.category_id.as_ref() == Some(c));
            let matches = needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.code.to_lowercase().contains(&needle);
            in_category && matches
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for Catalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Catalog::new(iter.into_iter().collect())
    }
}
