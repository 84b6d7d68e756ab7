#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building permit record, bounding box, and query result types.
//!
//! These are the shapes shared between the Socrata query/retrieval layer
//! (`permit_map_socrata`) and whatever presents the results. Records are
//! decoded straight from the open data JSON and never mutated afterwards.

use serde::{Deserialize, Deserializer, Serialize};

/// Errors raised when constructing query inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A status exclusion set must name at least one status.
    #[error("status exclusion set must contain at least one status")]
    EmptyExclusions,
}

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A rectangular region given by its northwest and southeast corners.
///
/// The corners are taken as given: nothing checks that `northwest` is
/// actually north and west of `southeast`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northwest corner.
    pub northwest: GeoCoordinate,
    /// Southeast corner.
    pub southeast: GeoCoordinate,
}

impl BoundingBox {
    /// Creates a bounding box from its two corners.
    #[must_use]
    pub const fn new(northwest: GeoCoordinate, southeast: GeoCoordinate) -> Self {
        Self {
            northwest,
            southeast,
        }
    }
}

/// Ordered list of permit status labels to leave out of the results.
///
/// Order only affects how the filter is rendered. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusExclusionSet(Vec<String>);

impl StatusExclusionSet {
    /// Builds an exclusion set from the given labels, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyExclusions`] if no labels are given.
    pub fn new<I, S>(labels: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ModelError::EmptyExclusions);
        }
        Ok(Self(labels))
    }

    /// Returns the labels in rendering order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Number of excluded statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty. A constructed set never is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for StatusExclusionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let labels = Vec::<String>::deserialize(deserializer)?;
        Self::new(labels).map_err(serde::de::Error::custom)
    }
}

/// One building permit row as served by the open data portal.
///
/// Every field is text exactly as the portal returns it. Fields absent
/// from a row (or `null`) decode to an empty string and fields the
/// portal adds beyond these are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPermit {
    #[serde(rename = "permitnum", default, deserialize_with = "null_as_empty")]
    pub permit_num: String,
    #[serde(rename = "permitclass", default, deserialize_with = "null_as_empty")]
    pub permit_class: String,
    #[serde(
        rename = "permitclassmapped",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub permit_class_mapped: String,
    #[serde(
        rename = "permittypemapped",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub permit_type_mapped: String,
    #[serde(rename = "permittypedesc", default, deserialize_with = "null_as_empty")]
    pub permit_type_desc: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(rename = "applieddate", default, deserialize_with = "null_as_empty")]
    pub applied_date: String,
    #[serde(rename = "issueddate", default, deserialize_with = "null_as_empty")]
    pub issued_date: String,
    #[serde(rename = "expiresdate", default, deserialize_with = "null_as_empty")]
    pub expires_date: String,
    /// Current permit status (`statuscurrent`).
    #[serde(rename = "statuscurrent", default, deserialize_with = "null_as_empty")]
    pub status: String,
    /// Related master use permit, empty when there is none.
    #[serde(rename = "relatedmup", default, deserialize_with = "null_as_empty")]
    pub related_mup: String,
    /// Street address (`originaladdress1`). Results are ordered by this.
    #[serde(
        rename = "originaladdress1",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub latitude: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub longitude: String,
}

impl BuildingPermit {
    /// Parses the text latitude/longitude. Returns `None` if either is
    /// missing or not a number.
    #[must_use]
    pub fn coordinates(&self) -> Option<GeoCoordinate> {
        let latitude = self.latitude.trim().parse::<f64>().ok()?;
        let longitude = self.longitude.trim().parse::<f64>().ok()?;
        Some(GeoCoordinate::new(latitude, longitude))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Sorts permits by address using plain byte-wise string ordering.
///
/// `"100 Main St"` comes before `"20 Main St"`. The sort is stable, so
/// permits sharing an address keep their incoming order.
pub fn sort_by_address(permits: &mut [BuildingPermit]) {
    permits.sort_by(|a, b| a.address.cmp(&b.address));
}

/// A page of permits together with the server-side match count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Permits sorted by address. At most the requested page size.
    pub permits: Vec<BuildingPermit>,
    /// Total number of matching permits on the server, which can be
    /// larger than `permits.len()`.
    pub total_count: u64,
}

impl QueryResult {
    /// Whether the server reported more matches than were fetched.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.total_count > self.permits.len() as u64
    }
}
