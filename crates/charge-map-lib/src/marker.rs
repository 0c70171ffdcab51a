//! Marker types produced by viewport queries
//!
//! A query over the cluster index yields a flat list of [`Marker`]s, each
//! either a single station pin or a cluster badge with a station count.
//! Cluster identifiers carry the index generation they were minted in, so a
//! stale identifier from a previous render pass can be recognized instead of
//! silently naming the wrong cluster.

use crate::station::Station;
use geo::Point;
use std::sync::Arc;

/// Stable handle to one cluster of the current index generation.
///
/// Identifiers become invalid when the station set or the clustering
/// configuration changes; [`crate::StationCollection::expand_cluster`]
/// rejects them with [`crate::IndexError::UnknownCluster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClusterId {
    pub(crate) generation: u32,
    pub(crate) zoom: u8,
    pub(crate) slot: u32,
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}/z{}/{}", self.generation, self.zoom, self.slot)
    }
}

/// A group of two or more stations rendered as one badge.
#[derive(Clone, Debug)]
pub struct ClusterMarker {
    pub id: ClusterId,
    /// Mean WGS84 position of the covered stations, x = longitude, y = latitude
    pub position: Point<f64>,
    /// Number of stations covered, always at least 2
    pub count: usize,
}

/// One drawable map marker.
#[derive(Clone, Debug)]
pub enum Marker {
    Cluster(ClusterMarker),
    Station(Arc<Station>),
}

impl Marker {
    /// Number of stations this marker stands for.
    pub fn covered(&self) -> usize {
        match self {
            Self::Cluster(cluster) => cluster.count,
            Self::Station(_) => 1,
        }
    }

    /// WGS84 position, x = longitude, y = latitude
    pub fn position(&self) -> Point<f64> {
        match self {
            Self::Cluster(cluster) => cluster.position,
            Self::Station(station) => station.position(),
        }
    }
}

/// Where the map should animate when a cluster is expanded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpandTarget {
    /// Cluster position in WGS84, x = longitude, y = latitude
    pub position: Point<f64>,
    /// Smallest zoom level at which the cluster splits apart,
    /// capped at [`crate::MAX_SUPPORTED_ZOOM`]
    pub zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::RawStation;

    #[test]
    fn test_marker_covered_counts() {
        let station = Station::from_raw(RawStation {
            id: Some("st-1".to_string()),
            latitude: Some(28.6),
            longitude: Some(77.2),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(Marker::Station(Arc::new(station)).covered(), 1);

        let cluster = Marker::Cluster(ClusterMarker {
            id: ClusterId {
                generation: 1,
                zoom: 10,
                slot: 0,
            },
            position: Point::new(77.2, 28.6),
            count: 5,
        });
        assert_eq!(cluster.covered(), 5);
    }

    #[test]
    fn test_cluster_id_display() {
        let id = ClusterId {
            generation: 3,
            zoom: 12,
            slot: 41,
        };
        assert_eq!(id.to_string(), "g3/z12/41");
    }
}
