//! Product catalog returned by a product fetch.

use super::{Product, ProductId, ProductType};

/// Products known to the billing service, in vendor order.
///
/// A catalog is a plain value owned by the caller and passed to whatever
/// needs it; nothing in this crate keeps a process-wide copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Products in vendor order.
    products: Vec<Product>,
}

impl Catalog {
    /// Creates a catalog from products in vendor order.
    #[inline]
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Looks up a product by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.product_id == *id)
    }

    /// Returns `true` if the catalog lists the product.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates over products of one type.
    #[inline]
    pub fn by_type(&self, product_type: ProductType) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(move |product| product.product_type == product_type)
    }

    /// Iterates over all products.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Product> {
        self.products.iter()
    }

    /// Number of products.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Consumes the catalog and returns the products.
    #[inline]
    #[must_use]
    pub fn into_products(self) -> Vec<Product> {
        self.products
    }
}

impl<'catalog> IntoIterator for &'catalog Catalog {
    type Item = &'catalog Product;
    type IntoIter = core::slice::Iter<'catalog, Product>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}
