//! # Recent Products
//!
//! The products this register added most recently, for the quick-pick row.
//!
//! Stored as a JSON array of product ids, newest first. The list is a
//! convenience: a missing or corrupt file reads as empty, and a failed write
//! is logged and forgotten.

use rxpos_core::{Catalog, Product, ProductId};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ClientResult;

#[derive(Debug, Clone)]
pub struct RecentProducts {
    path: Option<PathBuf>,
    limit: usize,
    ids: Vec<ProductId>,
}

impl RecentProducts {
    /// Loads the list from `path`. Any read or parse failure yields an
    /// empty list.
    pub fn load(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let mut ids = read_ids(&path);
        ids.truncate(limit);
        RecentProducts {
            path: Some(path),
            limit,
            ids,
        }
    }

    /// A list that is never written to disk.
    pub fn in_memory(limit: usize) -> Self {
        RecentProducts {
            path: None,
            limit,
            ids: Vec::new(),
        }
    }

    /// Moves `product_id` to the front, dropping duplicates and anything
    /// past the limit, then persists.
    pub fn record(&mut self, product_id: &ProductId) {
        self.ids.retain(|id| id != product_id);
        self.ids.insert(0, product_id.clone());
        self.ids.truncate(self.limit);

        if let Err(e) = self.save() {
            warn!(error = %e, "Could not save recent products");
        }
    }

    /// Newest first.
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    /// Recent products still present in `catalog`, newest first.
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Product> {
        self.ids.iter().filter_map(|id| catalog.get(id)).collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        if let Err(e) = self.save() {
            warn!(error = %e, "Could not clear recent products");
        }
    }

    fn save(&self) -> ClientResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec(&self.ids)?)?;
        Ok(())
    }
}

fn read_ids(path: &Path) -> Vec<ProductId> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(?path, error = %e, "No recent products file");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<Vec<ProductId>>(&bytes) {
        Ok(mut ids) => {
            let mut seen = std::collections::HashSet::new();
            ids.retain(|id| seen.insert(id.clone()));
            ids
        }
        Err(e) => {
            warn!(?path, error = %e, "Ignoring unreadable recent products file");
            Vec::new()
        }
    }
}
