//! Per-zoom cluster index over the full station set
//!
//! The index precomputes one clustering per integer zoom level between the
//! configured minimum and maximum. The deepest level groups stations whose
//! projected positions fall within the pixel radius at that zoom; every
//! shallower level then groups the entries of the level below it. Queries
//! pick the level for the viewport's zoom and scan its entries against the
//! viewport rectangle, so panning never changes how stations are grouped.
//!
//! Above the maximum clustering zoom the index answers with the stations
//! themselves, one pin per record.

use crate::collection::Config;
use crate::marker::{ClusterId, ClusterMarker, ExpandTarget, Marker};
use crate::station::Station;
use crate::utils;
use crate::viewport::Viewport;
use crate::{IndexError, MAX_SUPPORTED_ZOOM, Result};
use geo::{Point, Rect};
use smallvec::{SmallVec, smallvec};
use std::collections::HashMap;
use std::sync::Arc;

/// One entry of a zoom level: either a station passed through unchanged or a
/// cluster of entries from the next-deeper level.
#[derive(Clone, Debug)]
enum EntryKind {
    /// Index into the station list
    Station(u32),
    /// Indices into the next-deeper level's entries, or into the station
    /// list at the deepest level. A single child marks a pass-through link
    /// in a chain of levels where the cluster never merged with anything.
    Cluster { children: SmallVec<[u32; 4]> },
}

#[derive(Clone, Debug)]
struct LevelEntry {
    /// Web Mercator position in meters, count-weighted mean for clusters
    x: f64,
    y: f64,
    /// Stations covered, at least 2 for `Cluster` entries
    count: u32,
    kind: EntryKind,
}

#[derive(Clone, Debug, Default)]
struct Level {
    entries: Vec<LevelEntry>,
}

/// Spatial clustering of all valid stations, one grouping per zoom level.
///
/// The index is immutable once built; [`crate::StationCollection`] rebuilds
/// it wholesale whenever the station set or the configuration changes and
/// bumps the generation so identifiers from the old index stop resolving.
#[derive(Clone, Debug)]
pub struct ClusterIndex {
    stations: Vec<Arc<Station>>,
    /// `levels[i]` holds the clustering for zoom `min_zoom + i`
    levels: Vec<Level>,
    min_zoom: u8,
    max_zoom: u8,
    generation: u32,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ClusterIndex {
    /// Build the full per-zoom index over `stations`.
    ///
    /// `config` must have passed [`Config::validate`].
    pub fn build(stations: Vec<Arc<Station>>, config: &Config, generation: u32) -> Self {
        let zoom_count = (config.max_zoom - config.min_zoom) as usize + 1;
        let mut levels = Vec::with_capacity(zoom_count);

        // Deepest level straight from the stations.
        let points: Vec<(f64, f64, u32)> = stations
            .iter()
            .map(|station| (station.mercator().x(), station.mercator().y(), 1))
            .collect();
        let radius = cluster_radius_meters(config, config.max_zoom);
        let deepest = group_points(&points, radius)
            .into_iter()
            .map(|group| {
                let kind = if group.members.len() == 1 {
                    EntryKind::Station(group.members[0])
                } else {
                    EntryKind::Cluster {
                        children: group.members,
                    }
                };
                LevelEntry {
                    x: group.x,
                    y: group.y,
                    count: group.count,
                    kind,
                }
            })
            .collect();
        levels.push(Level { entries: deepest });

        // Each shallower level groups the entries of the level below it.
        for zoom in (config.min_zoom..config.max_zoom).rev() {
            let below: &Level = levels.last().unwrap_or(&EMPTY_LEVEL);
            let points: Vec<(f64, f64, u32)> = below
                .entries
                .iter()
                .map(|entry| (entry.x, entry.y, entry.count))
                .collect();
            let radius = cluster_radius_meters(config, zoom);
            let entries = group_points(&points, radius)
                .into_iter()
                .map(|group| {
                    let kind = if group.members.len() == 1 {
                        // Pass-throughs keep single stations as stations and
                        // link unmerged clusters down to the level below.
                        match &below.entries[group.members[0] as usize].kind {
                            EntryKind::Station(idx) => EntryKind::Station(*idx),
                            EntryKind::Cluster { .. } => EntryKind::Cluster {
                                children: smallvec![group.members[0]],
                            },
                        }
                    } else {
                        EntryKind::Cluster {
                            children: group.members,
                        }
                    };
                    LevelEntry {
                        x: group.x,
                        y: group.y,
                        count: group.count,
                        kind,
                    }
                })
                .collect();
            levels.push(Level { entries });
        }

        // Built deepest-first; store shallowest-first so that
        // `levels[zoom - min_zoom]` addresses the right level.
        levels.reverse();

        tracing::debug!(
            stations = stations.len(),
            zoom_levels = zoom_count,
            generation,
            "built cluster index"
        );

        Self {
            stations,
            levels,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            generation,
        }
    }

    /// All markers visible in the viewport at its zoom level.
    ///
    /// Fractional zooms use the level for `floor(zoom)`. Zooms beyond the
    /// maximum clustering level yield individual station pins. A degenerate
    /// viewport yields an empty list, never an error.
    pub fn query(&self, viewport: &Viewport) -> Vec<Marker> {
        let Some(rect) = viewport.mercator_rect() else {
            return Vec::new();
        };
        if self.stations.is_empty() {
            return Vec::new();
        }

        let floor = viewport.zoom.floor();
        if floor > self.max_zoom as f64 {
            return self
                .stations
                .iter()
                .filter(|station| rect_contains(&rect, station.mercator()))
                .map(|station| Marker::Station(station.clone()))
                .collect();
        }

        let zoom = (floor as i32).clamp(self.min_zoom as i32, self.max_zoom as i32) as u8;
        let level = &self.levels[(zoom - self.min_zoom) as usize];
        level
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| rect_contains(&rect, Point::new(entry.x, entry.y)))
            .map(|(slot, entry)| match &entry.kind {
                EntryKind::Station(idx) => Marker::Station(self.stations[*idx as usize].clone()),
                EntryKind::Cluster { .. } => {
                    let (lat, lon) = utils::mercator_to_wgs84(entry.x, entry.y);
                    Marker::Cluster(ClusterMarker {
                        id: ClusterId {
                            generation: self.generation,
                            zoom,
                            slot: slot as u32,
                        },
                        position: Point::new(lon, lat),
                        count: entry.count as usize,
                    })
                }
            })
            .collect()
    }

    /// Resolve a cluster to the position and smallest zoom at which it
    /// splits into more than one marker, capped at [`MAX_SUPPORTED_ZOOM`].
    ///
    /// The cap can defeat the split: when `max_zoom` is configured at the
    /// cap, a deepest-level cluster expands to its own zoom and stays
    /// merged after the move. Stations that close together share a marker
    /// at every supported zoom.
    ///
    /// Identifiers minted by an earlier index generation, or that never
    /// named a cluster, yield [`IndexError::UnknownCluster`].
    pub fn expansion_target(&self, id: ClusterId) -> Result<ExpandTarget> {
        if id.generation != self.generation
            || id.zoom < self.min_zoom
            || id.zoom > self.max_zoom
        {
            return Err(IndexError::UnknownCluster(id));
        }
        let entry = self.levels[(id.zoom - self.min_zoom) as usize]
            .entries
            .get(id.slot as usize)
            .ok_or(IndexError::UnknownCluster(id))?;

        let mut children = match &entry.kind {
            EntryKind::Cluster { children } => children,
            EntryKind::Station(_) => return Err(IndexError::UnknownCluster(id)),
        };
        let (lat, lon) = utils::mercator_to_wgs84(entry.x, entry.y);
        let position = Point::new(lon, lat);

        // Follow pass-through links until the level where the cluster
        // actually holds more than one member.
        let mut zoom = id.zoom;
        loop {
            if zoom == self.max_zoom || children.len() > 1 {
                return Ok(ExpandTarget {
                    position,
                    zoom: (zoom + 1).min(MAX_SUPPORTED_ZOOM),
                });
            }
            let next = &self.levels[(zoom + 1 - self.min_zoom) as usize].entries
                [children[0] as usize];
            zoom += 1;
            children = match &next.kind {
                EntryKind::Cluster { children } => children,
                EntryKind::Station(_) => return Err(IndexError::UnknownCluster(id)),
            };
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn stations(&self) -> &[Arc<Station>] {
        &self.stations
    }

    #[inline]
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

static EMPTY_LEVEL: Level = Level {
    entries: Vec::new(),
};

/// Clustering radius in Web Mercator meters at a zoom level.
fn cluster_radius_meters(config: &Config, zoom: u8) -> f64 {
    config.cluster_radius_px * utils::meters_per_pixel(zoom as f64, config.tile_size)
}

#[inline(always)]
fn rect_contains(rect: &Rect<f64>, point: Point<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
}

struct Group {
    x: f64,
    y: f64,
    count: u32,
    /// Indices into the input slice; a single member is a pass-through
    members: SmallVec<[u32; 4]>,
}

/// Greedily group `(x, y, count)` points that lie within `radius` meters of
/// each other, scanning in input order for determinism.
///
/// Points are bucketed into a grid of `radius`-sized cells so each point
/// only checks its 3x3 cell neighborhood. Merged groups sit at the
/// count-weighted mean of their members.
fn group_points(points: &[(f64, f64, u32)], radius: f64) -> Vec<Group> {
    let mut cells: HashMap<(i64, i64), SmallVec<[u32; 2]>> = HashMap::new();
    for (i, &(x, y, _)) in points.iter().enumerate() {
        cells
            .entry(grid_cell(x, y, radius))
            .or_default()
            .push(i as u32);
    }

    let radius_sq = radius * radius;
    let mut grouped = vec![false; points.len()];
    let mut groups = Vec::new();

    for (i, &(x, y, count)) in points.iter().enumerate() {
        if grouped[i] {
            continue;
        }
        grouped[i] = true;

        let mut members: SmallVec<[u32; 4]> = smallvec![i as u32];
        let (cx, cy) = grid_cell(x, y, radius);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(cell) = cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &j in cell {
                    if grouped[j as usize] {
                        continue;
                    }
                    let (jx, jy, _) = points[j as usize];
                    let (ddx, ddy) = (jx - x, jy - y);
                    if ddx * ddx + ddy * ddy <= radius_sq {
                        grouped[j as usize] = true;
                        members.push(j);
                    }
                }
            }
        }

        if members.len() == 1 {
            groups.push(Group {
                x,
                y,
                count,
                members,
            });
        } else {
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            let mut total = 0u32;
            for &m in &members {
                let (mx, my, mcount) = points[m as usize];
                sum_x += mx * mcount as f64;
                sum_y += my * mcount as f64;
                total += mcount;
            }
            groups.push(Group {
                x: sum_x / total as f64,
                y: sum_y / total as f64,
                count: total,
                members,
            });
        }
    }

    groups
}

#[inline(always)]
fn grid_cell(x: f64, y: f64, radius: f64) -> (i64, i64) {
    ((x / radius).floor() as i64, (y / radius).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::RawStation;

    fn station(id: &str, lat: f64, lon: f64) -> Arc<Station> {
        Arc::new(
            Station::from_raw(RawStation {
                id: Some(id.to_string()),
                latitude: Some(lat),
                longitude: Some(lon),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    /// Two stations about 150 m apart in central Delhi plus one far away in
    /// Mumbai. The close pair merges at city zooms and splits at street
    /// zooms.
    fn delhi_pair_plus_mumbai() -> Vec<Arc<Station>> {
        vec![
            station("delhi-a", 28.6000, 77.2000),
            station("delhi-b", 28.60135, 77.2000),
            station("mumbai", 19.0760, 72.8777),
        ]
    }

    fn build(stations: Vec<Arc<Station>>) -> ClusterIndex {
        ClusterIndex::build(stations, &Config::default(), 1)
    }

    #[test]
    fn test_empty_index_yields_no_markers() {
        let index = build(Vec::new());
        assert!(index.query(&Viewport::world(5.0)).is_empty());
    }

    #[test]
    fn test_nearby_pair_clusters_at_city_zoom() {
        let index = build(delhi_pair_plus_mumbai());
        let delhi = Viewport::new(77.0, 28.4, 77.4, 28.8, 10.0);
        let markers = index.query(&delhi);

        assert_eq!(markers.len(), 1);
        match &markers[0] {
            Marker::Cluster(cluster) => assert_eq!(cluster.count, 2),
            Marker::Station(_) => panic!("expected a cluster at zoom 10"),
        }
    }

    #[test]
    fn test_nearby_pair_splits_at_street_zoom() {
        let index = build(delhi_pair_plus_mumbai());
        let delhi = Viewport::new(77.19, 28.59, 77.21, 28.62, 18.0);
        let markers = index.query(&delhi);

        assert_eq!(markers.len(), 2);
        assert!(
            markers
                .iter()
                .all(|m| matches!(m, Marker::Station(_)))
        );
    }

    #[test]
    fn test_far_apart_stations_stay_separate() {
        let index = build(vec![
            station("delhi", 28.6, 77.2),
            station("chennai", 13.0827, 80.2707),
        ]);
        let markers = index.query(&Viewport::world(6.0));
        assert_eq!(markers.len(), 2);
    }

    #[test]
    fn test_conservation_over_world_viewport() {
        let index = build(delhi_pair_plus_mumbai());
        for zoom in [0.0, 5.0, 10.0, 14.0, 17.0, 19.0] {
            let covered: usize = index
                .query(&Viewport::world(zoom))
                .iter()
                .map(Marker::covered)
                .sum();
            assert_eq!(covered, 3, "conservation broken at zoom {zoom}");
        }
    }

    #[test]
    fn test_query_is_deterministic() {
        let index = build(delhi_pair_plus_mumbai());
        let viewport = Viewport::world(9.0);

        let first = index.query(&viewport);
        let second = index.query(&viewport);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            match (a, b) {
                (Marker::Cluster(ca), Marker::Cluster(cb)) => {
                    assert_eq!(ca.id, cb.id);
                    assert_eq!(ca.count, cb.count);
                }
                (Marker::Station(sa), Marker::Station(sb)) => {
                    assert_eq!(sa.id(), sb.id());
                }
                _ => panic!("marker kinds diverged between identical queries"),
            }
        }
    }

    #[test]
    fn test_fractional_zoom_uses_floor_level() {
        let index = build(delhi_pair_plus_mumbai());
        let delhi = Viewport::new(77.0, 28.4, 77.4, 28.8, 10.7);
        let markers = index.query(&delhi);
        assert_eq!(markers.len(), 1);
        assert!(matches!(markers[0], Marker::Cluster(_)));
    }

    #[test]
    fn test_expansion_target_zoom_splits_the_cluster() {
        let index = build(delhi_pair_plus_mumbai());
        let delhi = Viewport::new(77.0, 28.4, 77.4, 28.8, 10.0);
        let markers = index.query(&delhi);
        let Marker::Cluster(cluster) = &markers[0] else {
            panic!("expected a cluster at zoom 10");
        };

        let target = index.expansion_target(cluster.id).unwrap();
        assert!(target.zoom > 10);
        assert!(target.zoom <= MAX_SUPPORTED_ZOOM);

        // Querying at the target zoom around the cluster shows more than
        // one marker where there was one.
        let after = Viewport::new(
            target.position.x() - 0.01,
            target.position.y() - 0.01,
            target.position.x() + 0.01,
            target.position.y() + 0.01,
            target.zoom as f64,
        );
        assert!(index.query(&after).len() > 1);
    }

    #[test]
    fn test_expansion_target_is_capped_at_supported_zoom() {
        // Two chargers a couple of meters apart (same forecourt) cluster
        // even at the deepest supported zoom.
        let config = Config {
            max_zoom: MAX_SUPPORTED_ZOOM,
            ..Config::default()
        };
        let index = ClusterIndex::build(
            vec![
                station("bay-1", 28.600000, 77.2000),
                station("bay-2", 28.600018, 77.2000),
            ],
            &config,
            1,
        );

        let delhi = Viewport::new(77.19, 28.59, 77.21, 28.61, MAX_SUPPORTED_ZOOM as f64);
        let markers = index.query(&delhi);
        assert_eq!(markers.len(), 1);
        let Marker::Cluster(cluster) = &markers[0] else {
            panic!("expected a cluster at the deepest zoom");
        };

        // The target cannot exceed the cap, so it is the cluster's own
        // zoom and the pair stays merged there.
        let target = index.expansion_target(cluster.id).unwrap();
        assert_eq!(target.zoom, MAX_SUPPORTED_ZOOM);

        let after = Viewport::new(77.19, 28.59, 77.21, 28.61, target.zoom as f64);
        assert_eq!(after.zoom, MAX_SUPPORTED_ZOOM as f64);
        assert_eq!(index.query(&after).len(), 1);
    }

    #[test]
    fn test_stale_generation_is_rejected() {
        let stations = delhi_pair_plus_mumbai();
        let old = ClusterIndex::build(stations.clone(), &Config::default(), 1);
        let new = ClusterIndex::build(stations, &Config::default(), 2);

        let delhi = Viewport::new(77.0, 28.4, 77.4, 28.8, 10.0);
        let Marker::Cluster(cluster) = &old.query(&delhi)[0] else {
            panic!("expected a cluster at zoom 10");
        };

        assert!(matches!(
            new.expansion_target(cluster.id),
            Err(IndexError::UnknownCluster(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_slot_is_rejected() {
        let index = build(delhi_pair_plus_mumbai());
        let bogus = ClusterId {
            generation: index.generation(),
            zoom: 10,
            slot: 9999,
        };
        assert!(matches!(
            index.expansion_target(bogus),
            Err(IndexError::UnknownCluster(_))
        ));
    }

    #[test]
    fn test_degenerate_viewport_yields_empty() {
        let index = build(delhi_pair_plus_mumbai());
        assert!(
            index
                .query(&Viewport::new(77.4, 28.4, 77.0, 28.8, 10.0))
                .is_empty()
        );
        assert!(
            index
                .query(&Viewport::new(f64::NAN, 28.4, 77.4, 28.8, 10.0))
                .is_empty()
        );
    }
}
