//! Station records: the raw backend shape and the validated form
//!
//! Backend documents are loosely typed; every field may be missing or of the
//! wrong kind. `RawStation` mirrors that shape one-to-one, and `Station` is
//! the validated, immutable record the rest of the crate works with. Records
//! that fail validation are skipped at this boundary, never propagated.

use crate::utils;
use geo::Point;

/// Operational status of a charging station.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum StationStatus {
    Operational,
    UnderMaintenance,
    ComingSoon,
    /// Anything the backend sends that we do not recognize.
    #[default]
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

impl StationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::UnderMaintenance => "Under maintenance",
            Self::ComingSoon => "Coming soon",
            Self::Unknown => "Unknown",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Operational,
            Self::UnderMaintenance,
            Self::ComingSoon,
            Self::Unknown,
        ]
    }
}

/// A station record exactly as the backend export provides it.
///
/// All fields are optional; coordinates additionally tolerate numeric
/// strings, since older exports stored them that way.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct RawStation {
    pub id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_f64"))]
    pub latitude: Option<f64>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_f64"))]
    pub longitude: Option<f64>,
    pub status: Option<StationStatus>,
    pub connector_types: Vec<String>,
    pub price_per_kwh: Option<f64>,
    pub rating: Option<f32>,
}

/// Accept a JSON number, a numeric string, or anything else as `None`.
#[cfg(feature = "serde")]
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Number(v) => Some(v),
        Lenient::Text(s) => s.trim().parse().ok(),
        Lenient::Other(_) => None,
    })
}

/// A validated charging-station record.
///
/// Construction goes through [`Station::from_raw`], which guarantees a
/// non-empty identifier and finite, in-range coordinates. The Web Mercator
/// projection is computed once here so the index never re-projects.
#[derive(Clone, Debug)]
pub struct Station {
    id: String,
    /// WGS84 position: x = longitude, y = latitude
    position: Point<f64>,
    /// Cached Web Mercator projection in meters
    mercator: Point<f64>,
    name: String,
    address: String,
    status: StationStatus,
    connector_types: Vec<String>,
    price_per_kwh: Option<f64>,
    rating: Option<f32>,
}

impl Station {
    /// Validate a raw record, returning `None` for anything unusable.
    ///
    /// Skipping is silent by design: malformed records are a data-quality
    /// tolerance, not an error condition.
    pub fn from_raw(raw: RawStation) -> Option<Self> {
        let id = raw.id.filter(|id| !id.trim().is_empty())?;
        let lat = raw.latitude.filter(|v| v.is_finite())?;
        let lon = raw.longitude.filter(|v| v.is_finite())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            tracing::debug!(station = %id, lat, lon, "skipping station with out-of-range coordinates");
            return None;
        }

        Some(Self {
            id,
            position: Point::new(lon, lat),
            mercator: utils::wgs84_to_mercator(lat, lon),
            name: raw.name.unwrap_or_default(),
            address: raw.address.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            connector_types: raw.connector_types,
            price_per_kwh: raw.price_per_kwh,
            rating: raw.rating,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// WGS84 position, x = longitude, y = latitude
    #[inline]
    pub fn position(&self) -> Point<f64> {
        self.position
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    /// Cached Web Mercator projection in meters
    #[inline]
    pub fn mercator(&self) -> Point<f64> {
        self.mercator
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn status(&self) -> StationStatus {
        self.status
    }

    #[inline]
    pub fn connector_types(&self) -> &[String] {
        &self.connector_types
    }

    #[inline]
    pub fn price_per_kwh(&self) -> Option<f64> {
        self.price_per_kwh
    }

    #[inline]
    pub fn rating(&self) -> Option<f32> {
        self.rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, lat: f64, lon: f64) -> RawStation {
        RawStation {
            id: Some(id.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record_is_accepted() {
        let station = Station::from_raw(RawStation {
            name: Some("Tata Power - Khan Market".to_string()),
            address: Some("Khan Market, New Delhi".to_string()),
            status: Some(StationStatus::Operational),
            connector_types: vec!["CCS2".to_string(), "Type2".to_string()],
            price_per_kwh: Some(18.5),
            rating: Some(4.2),
            ..raw("st-001", 28.6004, 77.2272)
        })
        .unwrap();

        assert_eq!(station.id(), "st-001");
        assert_eq!(station.latitude(), 28.6004);
        assert_eq!(station.longitude(), 77.2272);
        assert_eq!(station.status(), StationStatus::Operational);
        assert_eq!(station.connector_types().len(), 2);
    }

    #[test]
    fn test_missing_coordinates_are_skipped() {
        let mut no_lat = raw("a", 0.0, 77.0);
        no_lat.latitude = None;
        assert!(Station::from_raw(no_lat).is_none());

        let mut no_lon = raw("b", 28.0, 0.0);
        no_lon.longitude = None;
        assert!(Station::from_raw(no_lon).is_none());
    }

    #[test]
    fn test_non_finite_coordinates_are_skipped() {
        assert!(Station::from_raw(raw("a", f64::NAN, 77.0)).is_none());
        assert!(Station::from_raw(raw("b", 28.0, f64::INFINITY)).is_none());
    }

    #[test]
    fn test_out_of_range_coordinates_are_skipped() {
        assert!(Station::from_raw(raw("a", 91.0, 77.0)).is_none());
        assert!(Station::from_raw(raw("b", 28.0, -181.0)).is_none());
    }

    #[test]
    fn test_missing_or_blank_id_is_skipped() {
        let mut no_id = raw("x", 28.0, 77.0);
        no_id.id = None;
        assert!(Station::from_raw(no_id).is_none());

        assert!(Station::from_raw(raw("  ", 28.0, 77.0)).is_none());
    }

    #[test]
    fn test_display_fields_default_when_missing() {
        let station = Station::from_raw(raw("st-002", 19.076, 72.8777)).unwrap();
        assert_eq!(station.name(), "");
        assert_eq!(station.address(), "");
        assert_eq!(station.status(), StationStatus::Unknown);
        assert!(station.connector_types().is_empty());
        assert!(station.price_per_kwh().is_none());
        assert!(station.rating().is_none());
    }

    #[test]
    fn test_mercator_projection_is_cached_consistently() {
        let station = Station::from_raw(raw("st-003", 12.9716, 77.5946)).unwrap();
        let expected = utils::wgs84_to_mercator(12.9716, 77.5946);
        assert_eq!(station.mercator(), expected);
    }
}
