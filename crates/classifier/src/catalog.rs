use crate::error::CatalogLoadError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Ordered list of class names, index-aligned with the backbone's output
/// vector. Loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Load the catalog from a flat JSON array of unique strings.
    /// Order is significant: it defines index alignment with model output.
    pub fn load(path: &Path) -> Result<Self, CatalogLoadError> {
        let bytes = fs::read(path).map_err(|source| CatalogLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let labels: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| CatalogLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_labels(labels)
    }

    pub fn from_labels(labels: Vec<String>) -> Result<Self, CatalogLoadError> {
        if labels.is_empty() {
            return Err(CatalogLoadError::Empty);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(CatalogLoadError::Duplicate {
                    name: label.clone(),
                });
            }
        }

        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("class_names.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    /// Test that a valid catalog preserves file order
    #[test]
    fn test_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, r#"["Front Bumper", "Rear Trunk", "Windshield"]"#);

        let catalog = LabelCatalog::load(&path).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(0), Some("Front Bumper"));
        assert_eq!(catalog.name(1), Some("Rear Trunk"));
        assert_eq!(catalog.name(2), Some("Windshield"));
    }

    /// Test that a missing file is a read error
    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let result = LabelCatalog::load(&path);

        assert!(matches!(result, Err(CatalogLoadError::Read { .. })));
    }

    /// Test that non-array and non-string content is rejected
    #[test]
    fn test_malformed_content_fails() {
        let dir = tempfile::tempdir().unwrap();

        for contents in [r#"{"labels": []}"#, r#"[1, 2, 3]"#, "not json"] {
            let path = write_catalog(&dir, contents);
            let result = LabelCatalog::load(&path);
            assert!(
                matches!(result, Err(CatalogLoadError::Parse { .. })),
                "contents {contents:?} should fail to parse"
            );
        }
    }

    /// Test that duplicate class names are rejected
    #[test]
    fn test_duplicate_names_fail() {
        let result = LabelCatalog::from_labels(vec![
            "Bonnet".to_string(),
            "Windshield".to_string(),
            "Bonnet".to_string(),
        ]);

        assert!(matches!(
            result,
            Err(CatalogLoadError::Duplicate { name }) if name == "Bonnet"
        ));
    }

    /// Test that an empty catalog is rejected
    #[test]
    fn test_empty_catalog_fails() {
        let result = LabelCatalog::from_labels(Vec::new());
        assert!(matches!(result, Err(CatalogLoadError::Empty)));
    }
}
