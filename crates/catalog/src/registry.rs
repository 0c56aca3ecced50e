//! Name → catalog lookup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{Catalog, MemoryCatalog};
use crate::error::{CatalogError, CatalogResult};

/// Catalogs available by name.
#[derive(Debug, Default, Clone)]
pub struct CatalogRegistry {
    catalogs: BTreeMap<String, Arc<dyn Catalog>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog under its own name, returning any catalog it replaces.
    pub fn register(&mut self, catalog: Arc<dyn Catalog>) -> Option<Arc<dyn Catalog>> {
        self.catalogs.insert(catalog.name().to_string(), catalog)
    }

    /// Open the catalog called `name`.
    pub fn get(&self, name: &str) -> CatalogResult<Arc<dyn Catalog>> {
        self.catalogs
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.catalogs.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Load every `*.json` file in `dir`, in file name order. Returns the
    /// number of catalogs loaded.
    pub fn load_dir(&mut self, dir: &Path) -> CatalogResult<usize> {
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<_, _>>()?;
        paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
        paths.sort();

        for path in &paths {
            let catalog = MemoryCatalog::load(path)?;
            debug!(path = %path.display(), catalog = %catalog.name(), "Registered catalog");
            self.register(Arc::new(catalog));
        }
        info!(dir = %dir.display(), catalogs = paths.len(), "Loaded catalog directory");
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry = CatalogRegistry::new();
        assert!(matches!(registry.get("dc2_object"), Err(CatalogError::NotFound(n)) if n == "dc2_object"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CatalogRegistry::new();
        let a = MemoryCatalog::from_json(r#"{"name": "a"}"#).unwrap();
        assert!(registry.register(Arc::new(a.clone())).is_none());
        assert!(registry.register(Arc::new(a)).is_some());
        assert_eq!(registry.names(), vec!["a"]);
    }
}
