//! High-level manager for station data and viewport queries
//!
//! `StationCollection` owns the validated station list and the cluster index
//! built over it. Replacing the stations or changing the configuration
//! rebuilds the index wholesale and bumps its generation, which invalidates
//! every cluster identifier handed out by earlier queries.

use crate::index::ClusterIndex;
use crate::marker::{ClusterId, ExpandTarget, Marker};
use crate::station::{RawStation, Station};
use crate::viewport::Viewport;
use crate::{IndexError, MAX_SUPPORTED_ZOOM, Result};
use geo::{Coord, Point, Rect};
use rayon::prelude::*;
use std::sync::Arc;

/// Clustering configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Screen-space grouping radius in pixels
    pub cluster_radius_px: f64,
    /// Map tile edge length in pixels, used for zoom arithmetic
    pub tile_size: u32,
    /// Shallowest zoom level with a precomputed clustering
    pub min_zoom: u8,
    /// Deepest zoom level with a precomputed clustering; beyond it every
    /// station renders as its own pin
    pub max_zoom: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster_radius_px: 40.0,
            tile_size: 256,
            min_zoom: 0,
            max_zoom: 17,
        }
    }
}

impl Config {
    /// Check the configuration is usable for building an index.
    pub fn validate(&self) -> Result<()> {
        if !self.cluster_radius_px.is_finite() || self.cluster_radius_px <= 0.0 {
            return Err(IndexError::InvalidConfig(format!(
                "cluster radius must be positive, got {}",
                self.cluster_radius_px
            )));
        }
        if self.tile_size == 0 {
            return Err(IndexError::InvalidConfig(
                "tile size must be positive".to_string(),
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(IndexError::InvalidConfig(format!(
                "min zoom {} exceeds max zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(IndexError::InvalidConfig(format!(
                "max zoom {} exceeds supported limit {}",
                self.max_zoom, MAX_SUPPORTED_ZOOM
            )));
        }
        Ok(())
    }
}

/// Summary statistics about the collection, cheap to copy into UI code.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollectionInfo {
    pub station_count: usize,
    pub skipped_records: usize,
    pub generation: u32,
    /// WGS84 bounding box over all stations, `None` while empty
    pub bounding_box: Option<Rect<f64>>,
}

/// Owns the station set and answers viewport queries against it.
#[derive(Clone, Debug)]
pub struct StationCollection {
    config: Config,
    index: ClusterIndex,
    skipped_records: usize,
    generation: u32,
    /// WGS84 bounding box over all stations, cached at replace time
    bounding_box: Option<Rect<f64>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl StationCollection {
    /// Create an empty collection.
    ///
    /// An invalid configuration is replaced by the default one; the fallible
    /// path for reconfiguration is [`Self::set_config`].
    pub fn new(config: Config) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(error) => {
                tracing::warn!(%error, "falling back to default clustering configuration");
                Config::default()
            }
        };
        let generation = 1;
        Self {
            index: ClusterIndex::build(Vec::new(), &config, generation),
            config,
            skipped_records: 0,
            generation,
            bounding_box: None,
        }
    }

    /// Replace the entire station set with a fresh batch of raw records.
    ///
    /// Records that fail validation are skipped silently and only counted;
    /// the rest are indexed. The previous index generation is retired, so
    /// cluster identifiers from before this call stop resolving.
    pub fn replace_stations(&mut self, raw: Vec<RawStation>) {
        let total = raw.len();
        let stations: Vec<Arc<Station>> = raw
            .into_par_iter()
            .filter_map(Station::from_raw)
            .map(Arc::new)
            .collect();

        self.skipped_records = total - stations.len();
        self.bounding_box = bounding_box(&stations);
        self.generation += 1;
        self.index = ClusterIndex::build(stations, &self.config, self.generation);

        tracing::info!(
            accepted = self.index.station_count(),
            skipped = self.skipped_records,
            "replaced station set"
        );
    }

    /// All markers visible in the viewport, clusters and single stations
    /// mixed. Degenerate viewports yield an empty list.
    pub fn visible_markers(&self, viewport: &Viewport) -> Vec<Marker> {
        self.index.query(viewport)
    }

    /// Where the map should animate to split the given cluster apart.
    pub fn expand_cluster(&self, id: ClusterId) -> Result<ExpandTarget> {
        self.index.expansion_target(id)
    }

    /// Apply a new clustering configuration and rebuild the index over the
    /// current stations. The old configuration stays in effect on error.
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        self.config = config;
        self.generation += 1;
        self.index = ClusterIndex::build(
            self.index.stations().to_vec(),
            &self.config,
            self.generation,
        );
        Ok(())
    }

    /// Drop all stations, keeping the configuration.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.index = ClusterIndex::build(Vec::new(), &self.config, self.generation);
        self.skipped_records = 0;
        self.bounding_box = None;
    }

    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    #[inline]
    pub fn stations(&self) -> &[Arc<Station>] {
        self.index.stations()
    }

    #[inline]
    pub fn station_count(&self) -> usize {
        self.index.station_count()
    }

    #[inline]
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.station_count() == 0
    }

    /// WGS84 bounding box over all stations, x = longitude, y = latitude
    pub fn bounding_box_wgs84(&self) -> Option<Rect<f64>> {
        self.bounding_box
    }

    /// WGS84 center of the bounding box, x = longitude, y = latitude
    pub fn center_wgs84(&self) -> Option<Point<f64>> {
        self.bounding_box.map(|bbox| bbox.center().into())
    }

    pub fn get_info(&self) -> CollectionInfo {
        CollectionInfo {
            station_count: self.station_count(),
            skipped_records: self.skipped_records,
            generation: self.generation,
            bounding_box: self.bounding_box,
        }
    }
}

impl Default for StationCollection {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn bounding_box(stations: &[Arc<Station>]) -> Option<Rect<f64>> {
    let mut iter = stations.iter();
    let first = iter.next()?.position();
    let (mut min, mut max) = (first, first);
    for station in iter {
        let p = station.position();
        min = Point::new(min.x().min(p.x()), min.y().min(p.y()));
        max = Point::new(max.x().max(p.x()), max.y().max(p.y()));
    }
    Some(Rect::new(
        Coord {
            x: min.x(),
            y: min.y(),
        },
        Coord {
            x: max.x(),
            y: max.y(),
        },
    ))
}
