//! Compile-time registry of permit dataset definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! A definition names the Socrata resource, the default exclusion set and
//! bounding box, and the page size to request.

use permit_map_permit_models::{BoundingBox, StatusExclusionSet};
use serde::Deserialize;

use crate::query::{FilterColumns, build_filter_with};

/// Dataset used when none is specified.
pub const DEFAULT_DATASET_ID: &str = "seattle_building_permits";

/// Number of registered datasets. Enforced by a test.
#[cfg(test)]
const EXPECTED_DATASET_COUNT: usize = 1;

/// Embedded TOML dataset definitions.
const DATASET_TOMLS: &[(&str, &str)] = &[(
    "seattle_building_permits",
    include_str!("../datasets/seattle_building_permits.toml"),
)];

/// A building permit dataset on a Socrata portal, deserialized from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"seattle_building_permits"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Socrata resource URL.
    pub endpoint: String,
    /// Page size for the fetch request.
    pub limit: u64,
    /// Status and location columns used in the filter.
    #[serde(default)]
    pub columns: FilterColumns,
    /// Statuses treated as inactive.
    pub exclusions: StatusExclusionSet,
    /// Default region.
    pub bbox: BoundingBox,
}

impl DatasetDefinition {
    /// Renders the filter for this dataset's columns with the given
    /// exclusions and region.
    #[must_use]
    pub fn filter(&self, exclusions: &StatusExclusionSet, bbox: &BoundingBox) -> String {
        build_filter_with(&self.columns, exclusions, bbox)
    }

    /// Renders the filter using this dataset's own defaults.
    #[must_use]
    pub fn default_filter(&self) -> String {
        self.filter(&self.exclusions, &self.bbox)
    }
}

/// Returns all registered datasets.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse permit dataset '{name}': {e}"))
        })
        .collect()
}

/// Looks up a dataset by id.
#[must_use]
pub fn find_dataset(id: &str) -> Option<DatasetDefinition> {
    all_datasets().into_iter().find(|d| d.id == id)
}
