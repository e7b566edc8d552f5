//! Catalog service - categories and suppliers

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{Category, Supplier};
use crate::ports::CatalogRepository;

/// Catalog service
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub fn add_category(&self, name: &str) -> Result<Category> {
        let category = self.catalog.add_category(name)?;
        tracing::info!(category_id = category.id, "added category");
        Ok(category)
    }

    /// Add a supplier under an existing category
    pub fn add_supplier(&self, name: &str, category_id: i64) -> Result<Supplier> {
        let supplier = self.catalog.add_supplier(name, category_id)?;
        tracing::info!(supplier_id = supplier.id, category_id, "added supplier");
        Ok(supplier)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.catalog.list_categories()
    }

    pub fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        self.catalog.list_suppliers()
    }
}
