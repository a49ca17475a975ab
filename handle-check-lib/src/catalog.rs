//! Site catalog loading.
//!
//! A catalog is a JSON object mapping site names to raw descriptor entries,
//! in the shape of Sherlock's `data.json`. Entries are kept in document order
//! so that fast scans check the same leading sites every time.

use crate::descriptor::SiteDescriptor;
use crate::error::HandleCheckError;
use crate::types::ScanMode;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// An ordered collection of usable site descriptors.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sites: Vec<SiteDescriptor>,
    skipped: Vec<HandleCheckError>,
}

impl Catalog {
    /// Wrap descriptors that were built programmatically.
    ///
    /// Duplicate names are kept; each entry is probed.
    pub fn from_descriptors(sites: Vec<SiteDescriptor>) -> Self {
        Self {
            sites,
            skipped: Vec::new(),
        }
    }

    /// Parse a catalog document.
    ///
    /// Keys starting with `$` (such as `$schema`) are metadata and ignored.
    /// Malformed entries are skipped and recorded; see [`Catalog::skipped`].
    ///
    /// # Errors
    ///
    /// Returns `HandleCheckError::CatalogLoad` if the document is not a JSON
    /// object.
    pub fn from_json_str(content: &str) -> Result<Self, HandleCheckError> {
        let document: Value = serde_json::from_str(content)?;

        let entries = document.as_object().ok_or_else(|| {
            HandleCheckError::catalog_load("<json>", "catalog root must be a JSON object")
        })?;

        let mut catalog = Catalog::default();

        for (name, entry) in entries {
            if name.starts_with('$') {
                continue;
            }

            match SiteDescriptor::from_entry(name, entry) {
                Ok(site) => catalog.sites.push(site),
                Err(e) => {
                    warn!(site = %name, error = %e, "skipping catalog entry");
                    catalog.skipped.push(e);
                }
            }
        }

        debug!(
            usable = catalog.sites.len(),
            skipped = catalog.skipped.len(),
            "parsed site catalog"
        );

        Ok(catalog)
    }

    /// Load a catalog from a local file.
    ///
    /// # Errors
    ///
    /// Returns `HandleCheckError::CatalogLoad` if the file cannot be read or
    /// parsed, or if not a single entry is usable.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, HandleCheckError> {
        let path = path.as_ref();
        let source = path.to_string_lossy();

        let content = fs::read_to_string(path)
            .map_err(|e| HandleCheckError::catalog_load(source.as_ref(), e.to_string()))?;

        let catalog = Self::from_json_str(&content).map_err(|e| match e {
            HandleCheckError::CatalogLoad { message, .. } => {
                HandleCheckError::catalog_load(source.as_ref(), message)
            }
            other => other,
        })?;

        if catalog.is_empty() {
            return Err(HandleCheckError::catalog_load(
                source.as_ref(),
                format!(
                    "no usable site descriptors ({} entries skipped)",
                    catalog.skipped.len()
                ),
            ));
        }

        Ok(catalog)
    }

    /// Usable descriptors, in catalog order.
    pub fn sites(&self) -> &[SiteDescriptor] {
        &self.sites
    }

    /// Errors for entries that were skipped while parsing.
    pub fn skipped(&self) -> &[HandleCheckError] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Descriptors covered by a scan in the given mode.
    pub fn select(&self, mode: ScanMode) -> &[SiteDescriptor] {
        mode.select(&self.sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "$schema": "data.schema.json",
        "Zeta": { "url": "https://zeta.test/{}", "errorType": "status_code" },
        "Alpha": { "url": "https://alpha.test/{}", "errorType": "message", "errorMsg": "Not Found" },
        "Broken": { "errorType": "status_code" },
        "Mid": { "url": "https://mid.test/{}", "errorType": "response_url" }
    }"#;

    #[test]
    fn test_parse_keeps_document_order_and_skips_bad_entries() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        let names: Vec<&str> = catalog.sites().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(catalog.skipped().len(), 1);
        assert!(catalog.skipped()[0].is_descriptor());
    }

    #[test]
    fn test_non_object_root_is_a_load_error() {
        let err = Catalog::from_json_str("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, HandleCheckError::CatalogLoad { .. }));

        let err = Catalog::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, HandleCheckError::CatalogLoad { .. }));
    }

    #[test]
    fn test_select_by_mode() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(catalog.select(ScanMode::Fast { limit: 2 }).len(), 2);
        assert_eq!(catalog.select(ScanMode::Full).len(), 3);
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let catalog = Catalog::load_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_file_without_usable_entries_fails() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "Only": { "url": "no placeholder", "errorType": "status_code" } }"#)
            .unwrap();
        file.flush().unwrap();

        let err = Catalog::load_file(file.path()).unwrap_err();
        match err {
            HandleCheckError::CatalogLoad { message, .. } => {
                assert!(message.contains("no usable site descriptors"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let err = Catalog::load_file("/definitely/not/here/sites.json").unwrap_err();
        assert!(matches!(err, HandleCheckError::CatalogLoad { .. }));
    }

    #[test]
    fn test_duplicates_are_kept_when_built_from_descriptors() {
        use crate::descriptor::DetectionRule;
        let site =
            SiteDescriptor::new("Dup", "https://dup.test/{}", DetectionRule::StatusCode).unwrap();
        let catalog = Catalog::from_descriptors(vec![site.clone(), site]);
        assert_eq!(catalog.len(), 2);
    }
}
