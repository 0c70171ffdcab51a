//! Application state management
//!
//! This module manages the application state: the station collection, the
//! debounced viewport, the cached marker list the map plugin draws, UI
//! settings, and file loading.

use crate::app::settings::Settings;
use charge_map_lib::{
    Config, Marker, RawStation, Station, StationCollection, StationStatus, Viewport,
    ViewportDebouncer,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Main application state
pub struct AppState {
    /// Station collection with the cluster index
    pub collection: Arc<RwLock<StationCollection>>,

    /// Markers from the last settled viewport query, drawn by the plugin
    pub markers: Arc<RwLock<Vec<Marker>>>,

    /// Coalesces per-frame viewport updates into settled ones
    pub debouncer: ViewportDebouncer,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// File loading state
    pub file_loader: StationLoader,

    /// Statistics about loaded data and the last query
    pub stats: Stats,

    /// Station whose details are shown in the sidebar
    pub selected_station: Option<Arc<Station>>,

    /// Fit the map to the station bounding box on the next frame
    pub pending_fit_bounds: bool,

    /// Viewport the current marker list was computed for
    pub last_viewport: Option<Viewport>,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Station pin radius in pixels
    pub marker_radius: f32,

    /// Clustering radius in screen pixels
    pub cluster_radius_px: f64,

    /// Statuses currently shown on the map
    pub status_filter: HashSet<StationStatus>,

    /// Connector type substring filter, empty shows everything
    pub connector_filter: String,

    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarTab {
    Stations,
    Settings,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
        }
    }
}

/// File loading state and operations
pub struct StationLoader {
    /// Files pending load
    pub pending_files: Vec<PathBuf>,

    /// Currently loading file
    pub loading_file: Option<PathBuf>,

    /// Load errors
    pub errors: Vec<(PathBuf, String)>,

    /// Successfully loaded files with their raw records, kept so the
    /// collection can be rebuilt when files are removed or filters change
    pub loaded_files: Vec<(PathBuf, Vec<RawStation>)>,

    /// Show file picker dialog
    pub show_picker: bool,
}

/// Statistics about loaded data and the last marker query
#[derive(Default)]
pub struct Stats {
    /// Stations indexed after validation and filtering
    pub station_count: usize,

    /// Records skipped because they were malformed
    pub skipped_records: usize,

    /// Records hidden by the status/connector filters
    pub filtered_out: usize,

    /// Last query time in milliseconds
    pub last_query_time_ms: f64,

    /// Markers in the last query result
    pub visible_markers: usize,

    /// How many of those markers are clusters
    pub visible_clusters: usize,
}

impl AppState {
    /// Create new application state from CLI settings
    pub fn new(settings: &Settings) -> Self {
        let config = Config {
            cluster_radius_px: settings.cluster_radius,
            max_zoom: settings.max_cluster_zoom,
            ..Config::default()
        };

        let ui_settings = UiSettings {
            marker_radius: settings.marker_radius,
            cluster_radius_px: settings.cluster_radius,
            status_filter: StationStatus::all().iter().copied().collect(),
            connector_filter: String::new(),
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
            active_tab: SidebarTab::Stations,
        };

        let file_loader = StationLoader {
            pending_files: settings.station_files.clone(),
            loading_file: None,
            errors: Vec::new(),
            loaded_files: Vec::new(),
            show_picker: false,
        };

        Self {
            collection: Arc::new(RwLock::new(StationCollection::new(config))),
            markers: Arc::new(RwLock::new(Vec::new())),
            debouncer: ViewportDebouncer::new(Duration::from_millis(settings.debounce_ms)),
            ui_settings,
            file_loader,
            stats: Stats::default(),
            selected_station: None,
            pending_fit_bounds: false,
            last_viewport: None,
        }
    }

    /// Load a station JSON file into the collection
    pub fn load_station_file(&mut self, path: PathBuf) -> Result<(), String> {
        profiling::scope!("load_station_file");

        self.file_loader.loading_file = Some(path.clone());

        // Read and parse the JSON file outside of the lock
        let parse_result = (|| -> Result<Vec<RawStation>, String> {
            let file =
                std::fs::File::open(&path).map_err(|e| format!("Failed to open file: {}", e))?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).map_err(|e| format!("Failed to parse JSON: {}", e))
        })();

        self.file_loader.loading_file = None;

        match parse_result {
            Ok(records) => {
                tracing::info!(file = %path.display(), records = records.len(), "loaded station file");
                self.file_loader.loaded_files.push((path, records));
                self.rebuild_collection();
                Ok(())
            }
            Err(e) => {
                self.file_loader.errors.push((path, e.clone()));
                Err(e)
            }
        }
    }

    /// Process pending file loads, one per frame to keep the UI responsive
    pub fn process_pending_files(&mut self) {
        if let Some(path) = self.file_loader.pending_files.pop() {
            let _ = self.load_station_file(path);
        }
    }

    /// Add a file to the pending load queue
    pub fn queue_file(&mut self, path: PathBuf) {
        let already_loaded = self
            .file_loader
            .loaded_files
            .iter()
            .any(|(p, _)| p == &path);
        if !self.file_loader.pending_files.contains(&path) && !already_loaded {
            self.file_loader.pending_files.push(path);
        }
    }

    /// Remove a loaded file by index
    pub fn remove_file(&mut self, index: usize) {
        if index < self.file_loader.loaded_files.len() {
            self.file_loader.loaded_files.remove(index);
            self.rebuild_collection();
        }
    }

    /// Rebuild the collection from all loaded files with the current filters
    /// applied, then requery the last settled viewport.
    pub fn rebuild_collection(&mut self) {
        profiling::scope!("rebuild_collection");

        let mut total = 0;
        let mut kept: Vec<RawStation> = Vec::new();
        for (_, records) in &self.file_loader.loaded_files {
            total += records.len();
            kept.extend(
                records
                    .iter()
                    .filter(|r| self.passes_filters(r))
                    .cloned(),
            );
        }
        self.stats.filtered_out = total - kept.len();

        {
            let mut collection = self.collection.write().unwrap();
            collection.replace_stations(kept);
        }

        self.update_stats();
        self.requery();
    }

    /// Whether a record survives the status and connector filters.
    ///
    /// Records without a status count as `Unknown`, matching how validation
    /// defaults them.
    fn passes_filters(&self, raw: &RawStation) -> bool {
        let status = raw.status.unwrap_or_default();
        if !self.ui_settings.status_filter.contains(&status) {
            return false;
        }

        let query = self.ui_settings.connector_filter.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        raw.connector_types
            .iter()
            .any(|c| c.to_lowercase().contains(&query))
    }

    /// Apply a new clustering radius, rebuilding the index over the current
    /// stations.
    pub fn set_cluster_radius(&mut self, radius: f64) {
        self.ui_settings.cluster_radius_px = radius;

        let result = {
            let mut collection = self.collection.write().unwrap();
            let config = Config {
                cluster_radius_px: radius,
                ..collection.config()
            };
            collection.set_config(config)
        };

        if let Err(error) = result {
            tracing::warn!(%error, "rejected clustering radius change");
            return;
        }
        self.requery();
    }

    /// Query markers for a settled viewport and cache them for the plugin.
    pub fn recompute_markers(&mut self, viewport: Viewport) {
        profiling::scope!("recompute_markers");

        let query_start = instant::Instant::now();
        let markers = {
            let collection = self.collection.read().unwrap();
            collection.visible_markers(&viewport)
        };
        self.stats.last_query_time_ms = query_start.elapsed().as_secs_f64() * 1000.0;
        self.stats.visible_markers = markers.len();
        self.stats.visible_clusters = markers
            .iter()
            .filter(|m| matches!(m, Marker::Cluster(_)))
            .count();
        self.last_viewport = Some(viewport);

        *self.markers.write().unwrap() = markers;
    }

    /// Feed the viewport the plugin reported this frame into the debouncer
    /// and requery once it settles. Returns true when the marker cache was
    /// swapped, so the caller schedules one more frame to draw it (the map
    /// has already painted from the old cache by the time this runs).
    pub fn process_viewport(
        &mut self,
        viewport: Option<Viewport>,
        now: instant::Instant,
    ) -> bool {
        if let Some(viewport) = viewport {
            if self.last_viewport == Some(viewport) {
                // Back on the viewport the current markers were computed
                // for; a pending requery would only reproduce them
                self.debouncer.flush();
            } else {
                self.debouncer.observe(viewport, now);
            }
        }

        if let Some(viewport) = self.debouncer.poll(now) {
            self.recompute_markers(viewport);
            return true;
        }
        false
    }

    /// Requery the viewport the current markers were computed for, used
    /// after the station set or configuration changed under it.
    fn requery(&mut self) {
        if let Some(viewport) = self.last_viewport {
            self.recompute_markers(viewport);
        }
    }

    /// Clear all loaded stations
    pub fn clear_stations(&mut self) {
        {
            let mut collection = self.collection.write().unwrap();
            collection.clear();
        }
        self.file_loader.loaded_files.clear();
        self.file_loader.errors.clear();
        self.file_loader.pending_files.clear();
        self.markers.write().unwrap().clear();
        self.selected_station = None;
        self.stats = Stats::default();
    }

    /// Update statistics from the collection
    pub fn update_stats(&mut self) {
        let collection = self.collection.read().unwrap();
        let info = collection.get_info();

        self.stats.station_count = info.station_count;
        self.stats.skipped_records = info.skipped_records;
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            marker_radius: 8.0,
            cluster_radius_px: 40.0,
            status_filter: StationStatus::all().iter().copied().collect(),
            connector_filter: String::new(),
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
            active_tab: SidebarTab::Stations,
        }
    }
}

impl StationLoader {
    /// Check if any files are being processed
    pub fn is_busy(&self) -> bool {
        self.loading_file.is_some() || !self.pending_files.is_empty()
    }
}

impl Stats {
    /// Format station count with thousands separators
    pub fn format_stations(&self) -> String {
        format_number_with_commas(self.station_count)
    }
}

/// Helper to format numbers with comma separators
fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn state() -> AppState {
        AppState::new(&Settings::parse_from(["charge-map-viewer"]))
    }

    fn raw(id: &str, status: StationStatus, connectors: &[&str]) -> RawStation {
        RawStation {
            id: Some(id.to_string()),
            latitude: Some(28.6),
            longitude: Some(77.2),
            status: Some(status),
            connector_types: connectors.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_data_parses_and_indexes() {
        let records: Vec<RawStation> =
            serde_json::from_str(include_str!("../../data/sample-stations.json")).unwrap();
        assert!(records.len() >= 10);

        let mut state = state();
        state
            .file_loader
            .loaded_files
            .push((PathBuf::from("sample-stations.json"), records));
        state.rebuild_collection();

        assert!(state.stats.station_count >= 10);
        assert_eq!(state.stats.filtered_out, 0);
    }

    #[test]
    fn test_status_filter_hides_stations() {
        let mut state = state();
        state.file_loader.loaded_files.push((
            PathBuf::from("test.json"),
            vec![
                raw("a", StationStatus::Operational, &["CCS2"]),
                raw("b", StationStatus::ComingSoon, &["Type2"]),
            ],
        ));

        state.ui_settings.status_filter.remove(&StationStatus::ComingSoon);
        state.rebuild_collection();

        assert_eq!(state.stats.station_count, 1);
        assert_eq!(state.stats.filtered_out, 1);
    }

    #[test]
    fn test_connector_filter_matches_substring() {
        let mut state = state();
        state.file_loader.loaded_files.push((
            PathBuf::from("test.json"),
            vec![
                raw("a", StationStatus::Operational, &["CCS2", "Type2"]),
                raw("b", StationStatus::Operational, &["CHAdeMO"]),
            ],
        ));

        state.ui_settings.connector_filter = "ccs".to_string();
        state.rebuild_collection();

        assert_eq!(state.stats.station_count, 1);
        assert_eq!(state.stats.filtered_out, 1);
    }

    #[test]
    fn test_rebuild_requeries_last_viewport() {
        let mut state = state();
        state.recompute_markers(Viewport::world(5.0));
        assert_eq!(state.stats.visible_markers, 0);

        state.file_loader.loaded_files.push((
            PathBuf::from("test.json"),
            vec![raw("a", StationStatus::Operational, &[])],
        ));
        state.rebuild_collection();

        assert_eq!(state.stats.visible_markers, 1);
        assert_eq!(state.markers.read().unwrap().len(), 1);
    }

    #[test]
    fn test_settled_viewport_swaps_cache_and_asks_for_redraw() {
        let mut state = state();
        state.file_loader.loaded_files.push((
            PathBuf::from("test.json"),
            vec![raw("a", StationStatus::Operational, &[])],
        ));
        state.rebuild_collection();

        let start = instant::Instant::now();
        let viewport = Viewport::world(5.0);

        // While the viewport is still settling nothing is recomputed
        assert!(!state.process_viewport(Some(viewport), start));
        assert!(state.debouncer.is_pending());
        assert!(state.markers.read().unwrap().is_empty());

        // On settle the cache is swapped and the caller must repaint,
        // since the frame already drew from the old cache
        assert!(state.process_viewport(Some(viewport), start + Duration::from_millis(150)));
        assert_eq!(state.markers.read().unwrap().len(), 1);
        assert_eq!(state.stats.visible_markers, 1);
    }

    #[test]
    fn test_re_reported_viewport_does_not_rearm_debouncer() {
        let mut state = state();
        let viewport = Viewport::world(5.0);
        let start = instant::Instant::now();

        state.process_viewport(Some(viewport), start);
        assert!(state.process_viewport(Some(viewport), start + Duration::from_millis(150)));

        // The plugin re-reports the settled viewport on later frames; the
        // markers already cover it, so no requery gets scheduled
        assert!(!state.process_viewport(Some(viewport), start + Duration::from_millis(160)));
        assert!(!state.debouncer.is_pending());
        assert!(!state.process_viewport(Some(viewport), start + Duration::from_millis(400)));
        assert!(!state.debouncer.is_pending());
    }

    #[test]
    fn test_returning_to_computed_viewport_cancels_pending_requery() {
        let mut state = state();
        let home = Viewport::world(5.0);
        let away = Viewport::world(8.0);
        let start = instant::Instant::now();

        state.process_viewport(Some(home), start);
        assert!(state.process_viewport(Some(home), start + Duration::from_millis(150)));

        // Pan away and back within the settle delay
        state.process_viewport(Some(away), start + Duration::from_millis(200));
        assert!(state.debouncer.is_pending());
        assert!(!state.process_viewport(Some(home), start + Duration::from_millis(220)));
        assert!(!state.debouncer.is_pending());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut state = state();
        state.file_loader.loaded_files.push((
            PathBuf::from("test.json"),
            vec![raw("a", StationStatus::Operational, &[])],
        ));
        state.rebuild_collection();
        state.clear_stations();

        assert_eq!(state.stats.station_count, 0);
        assert!(state.markers.read().unwrap().is_empty());
        assert!(state.file_loader.loaded_files.is_empty());
    }
}
