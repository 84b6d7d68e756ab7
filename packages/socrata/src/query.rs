//! SoQL `$where` filter construction.
//!
//! Produces expressions of the form
//!
//! ```text
//! statuscurrent not in ('Completed', 'Withdrawn')
//!   AND within_box(location1, 47.712288, -122.327557, 47.704218, -122.301912)
//! ```

use permit_map_permit_models::{BoundingBox, StatusExclusionSet};
use serde::Deserialize;

/// Dataset columns referenced by the filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterColumns {
    /// Text column holding the current permit status.
    #[serde(default = "default_status_column")]
    pub status: String,
    /// Location column passed to `within_box`.
    #[serde(default = "default_location_column")]
    pub location: String,
}

fn default_status_column() -> String {
    "statuscurrent".to_string()
}

fn default_location_column() -> String {
    "location1".to_string()
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            status: default_status_column(),
            location: default_location_column(),
        }
    }
}

/// Builds the filter against the default `statuscurrent` and `location1`
/// columns.
#[must_use]
pub fn build_filter(exclusions: &StatusExclusionSet, bbox: &BoundingBox) -> String {
    build_filter_with(&FilterColumns::default(), exclusions, bbox)
}

/// Builds the filter against explicit columns.
///
/// Coordinates are always rendered with six fractional digits.
#[must_use]
pub fn build_filter_with(
    columns: &FilterColumns,
    exclusions: &StatusExclusionSet,
    bbox: &BoundingBox,
) -> String {
    let statuses = exclusions
        .labels()
        .iter()
        .map(|label| quote_literal(label))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{} not in ({statuses}) AND within_box({}, {:.6}, {:.6}, {:.6}, {:.6})",
        columns.status,
        columns.location,
        bbox.northwest.latitude,
        bbox.northwest.longitude,
        bbox.southeast.latitude,
        bbox.southeast.longitude,
    )
}

/// Single-quotes a SoQL string literal, doubling embedded quotes.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use permit_map_permit_models::GeoCoordinate;

    use super::*;

    fn reference_bbox() -> BoundingBox {
        BoundingBox::new(
            GeoCoordinate::new(47.712_288, -122.327_557),
            GeoCoordinate::new(47.704_218, -122.301_912),
        )
    }

    #[test]
    fn renders_reference_filter() {
        let exclusions = StatusExclusionSet::new(["Completed", "Withdrawn"]).unwrap();
        assert_eq!(
            build_filter(&exclusions, &reference_bbox()),
            "statuscurrent not in ('Completed', 'Withdrawn') AND \
             within_box(location1, 47.712288, -122.327557, 47.704218, -122.301912)"
        );
    }

    #[test]
    fn pads_coordinates_to_six_digits() {
        let exclusions = StatusExclusionSet::new(["Closed"]).unwrap();
        let bbox = BoundingBox::new(
            GeoCoordinate::new(47.7, -122.0),
            GeoCoordinate::new(47.0, -122.25),
        );
        assert!(
            build_filter(&exclusions, &bbox)
                .ends_with("within_box(location1, 47.700000, -122.000000, 47.000000, -122.250000)")
        );
    }

    #[test]
    fn rounds_extra_precision_to_six_digits() {
        let exclusions = StatusExclusionSet::new(["Closed"]).unwrap();
        let bbox = BoundingBox::new(
            GeoCoordinate::new(47.123_456_789, -122.1),
            GeoCoordinate::new(47.0, -122.0),
        );
        assert!(build_filter(&exclusions, &bbox).contains("(location1, 47.123457, -122.100000,"));
    }

    #[test]
    fn single_label_has_no_separator() {
        let exclusions = StatusExclusionSet::new(["Expired"]).unwrap();
        let filter = build_filter(&exclusions, &reference_bbox());
        assert!(filter.starts_with("statuscurrent not in ('Expired') AND "));
    }

    #[test]
    fn n_labels_have_n_minus_one_separators() {
        let labels = ["Completed", "Withdrawn", "Expired", "Canceled", "Closed"];
        let exclusions = StatusExclusionSet::new(labels).unwrap();
        let filter = build_filter(&exclusions, &reference_bbox());

        let list = filter
            .strip_prefix("statuscurrent not in (")
            .and_then(|rest| rest.split_once(") AND "))
            .map(|(list, _)| list)
            .unwrap();
        assert_eq!(list.matches("', '").count(), labels.len() - 1);
        assert!(!list.ends_with(", "));
        assert_eq!(
            list,
            "'Completed', 'Withdrawn', 'Expired', 'Canceled', 'Closed'"
        );
    }

    #[test]
    fn label_order_is_preserved() {
        let exclusions = StatusExclusionSet::new(["Withdrawn", "Completed"]).unwrap();
        assert!(
            build_filter(&exclusions, &reference_bbox())
                .starts_with("statuscurrent not in ('Withdrawn', 'Completed')")
        );
    }

    #[test]
    fn escapes_embedded_quotes() {
        let exclusions = StatusExclusionSet::new(["Owner's Hold"]).unwrap();
        assert!(
            build_filter(&exclusions, &reference_bbox())
                .starts_with("statuscurrent not in ('Owner''s Hold')")
        );
    }

    #[test]
    fn uses_custom_columns() {
        let columns = FilterColumns {
            status: "status".to_string(),
            location: "geom".to_string(),
        };
        let exclusions = StatusExclusionSet::new(["Closed"]).unwrap();
        let filter = build_filter_with(&columns, &exclusions, &reference_bbox());
        assert!(filter.starts_with("status not in ('Closed') AND within_box(geom, "));
    }

    #[test]
    fn rendering_is_deterministic() {
        let exclusions = StatusExclusionSet::new(["Completed", "Withdrawn"]).unwrap();
        let bbox = reference_bbox();
        assert_eq!(build_filter(&exclusions, &bbox), build_filter(&exclusions, &bbox));
    }
}
