//! Application module
//!
//! This module provides the main application structure with a clean UI:
//! - Full-screen map view with clustered station markers
//! - Toggleable sidebar with tabs (Stations and Settings)
//! - Drag-and-drop support for station JSON files
//! - Click a cluster to zoom to where it splits apart
//! - Responsive layout (sidebar from bottom on portrait displays)

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::{MarkerHit, PluginFeedback, StationPlugin};
use crate::app::settings::Settings;
use crate::app::state::{AppState, SidebarTab, TilesProvider};
use eframe::egui;
use std::sync::{Arc, RwLock};
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Custom OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17 // OpenTopoMap has max zoom of 17
    }
}

/// Persisted settings (lightweight, no station data)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    marker_radius: f32,
    cluster_radius_px: f64,
    sidebar_open: bool,
    active_tab: String,
    tiles_provider: String,
    /// File paths that were loaded (will need to be reloaded)
    loaded_file_paths: Vec<String>,
}

/// Main application structure
pub struct ChargeMapApp {
    /// Application state (stations, UI settings, etc.)
    state: AppState,

    /// Map tiles provider (OpenStreetMap)
    tiles_osm: HttpTiles,

    /// Map tiles provider (OpenTopoMap)
    tiles_otm: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Show help overlay
    show_help: bool,

    /// Per-frame plugin results (viewport seen, marker clicked)
    feedback: Arc<RwLock<PluginFeedback>>,

    /// Whether we've fitted the view after restoring persisted files
    restored_persisted_state: bool,
}

impl ChargeMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();

        // Try to restore persisted settings (not station data)
        let mut state = if !cli_args.ignore_persisted {
            if let Some(storage) = cc.storage {
                Self::load_persisted_settings(storage, &cli_args)
            } else {
                AppState::new(&cli_args)
            }
        } else {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            AppState::new(&cli_args)
        };

        // Add any CLI-specified files to pending (they take priority)
        for file in &cli_args.station_files {
            state.queue_file(file.clone());
        }

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());

        tracing::info!(
            "Initialized with {} files to load",
            state.file_loader.pending_files.len()
        );

        Self {
            state,
            tiles_osm,
            tiles_otm,
            map_memory: MapMemory::default(),
            show_help: false,
            feedback: Arc::new(RwLock::new(PluginFeedback::default())),
            restored_persisted_state: false,
        }
    }

    /// Load persisted settings from storage (fast, no station data)
    fn load_persisted_settings(storage: &dyn eframe::Storage, cli_args: &Settings) -> AppState {
        if let Some(json) = storage.get_string("persisted_settings")
            && !json.is_empty()
            && let Ok(settings) = serde_json::from_str::<PersistedSettings>(&json)
        {
            tracing::info!("Restored settings, will reload files");
            return Self::state_from_persisted_settings(settings, cli_args);
        }

        tracing::info!("No persisted settings found, starting fresh");
        AppState::new(cli_args)
    }

    /// Create AppState from persisted settings
    fn state_from_persisted_settings(settings: PersistedSettings, cli_args: &Settings) -> AppState {
        let mut state = AppState::new(cli_args);

        state.ui_settings.marker_radius = settings.marker_radius;
        state.ui_settings.sidebar_open = settings.sidebar_open;
        state.ui_settings.active_tab = match settings.active_tab.as_str() {
            "Settings" => SidebarTab::Settings,
            _ => SidebarTab::Stations,
        };
        state.ui_settings.tiles_provider = match settings.tiles_provider.as_str() {
            "OpenTopoMap" => TilesProvider::OpenTopoMap,
            _ => TilesProvider::OpenStreetMap,
        };
        state.set_cluster_radius(settings.cluster_radius_px);

        // Queue persisted files for reloading; queue_file deduplicates
        // against anything the CLI already added
        for path_str in &settings.loaded_file_paths {
            let path = std::path::PathBuf::from(path_str);
            if path.exists() {
                state.queue_file(path);
            }
        }

        state
    }

    /// Fit the map view to the bounding box of all loaded stations
    fn fit_to_bounds(&mut self) {
        // Use try_read for non-blocking UI polling.
        let Ok(collection) = self.state.collection.try_read() else {
            return;
        };

        if let Some(bbox) = collection.bounding_box_wgs84() {
            let center = bbox.center();
            let lat_span = bbox.height();
            let lon_span = bbox.width();
            let max_span = lat_span.max(lon_span);

            let zoom = if max_span > 0.0 {
                let zoom_estimate = (4.0 * 360.0 / max_span).log2();
                (zoom_estimate - 0.5).clamp(1.0, 18.0)
            } else {
                12.0
            };

            self.map_memory.center_at(walkers::lat_lon(center.y, center.x));
            let _ = self.map_memory.set_zoom(zoom);

            tracing::trace!(
                "Fitted view to bounds: ({:.4}, {:.4}) - ({:.4}, {:.4}), zoom: {:.1}",
                bbox.min().y,
                bbox.min().x,
                bbox.max().y,
                bbox.max().x,
                zoom
            );
        }
    }

    /// Act on what the plugin reported last frame: feed the viewport into
    /// the debouncer and resolve marker clicks.
    fn process_plugin_feedback(&mut self, ctx: &egui::Context) {
        let (viewport, clicked) = {
            let mut feedback = self.feedback.write().unwrap();
            (feedback.viewport.take(), feedback.clicked.take())
        };

        let now = instant::Instant::now();
        if self.state.process_viewport(viewport, now) {
            // This frame's map was painted from the old cache, so draw the
            // recomputed markers on the next one
            ctx.request_repaint();
        } else if self.state.debouncer.is_pending() {
            // Keep repainting until the viewport settles and the requery runs
            ctx.request_repaint_after(std::time::Duration::from_millis(30));
        }

        match clicked {
            Some(MarkerHit::Cluster(id)) => {
                let target = {
                    let Ok(collection) = self.state.collection.try_read() else {
                        return;
                    };
                    collection.expand_cluster(id)
                };
                match target {
                    Ok(target) => {
                        self.map_memory.center_at(walkers::lat_lon(
                            target.position.y(),
                            target.position.x(),
                        ));
                        let _ = self.map_memory.set_zoom(target.zoom as f64);
                    }
                    Err(error) => {
                        // Stale identifier from a rebuilt index, nothing to do
                        tracing::debug!(%error, "ignored cluster click");
                    }
                }
            }
            Some(MarkerHit::Station(station)) => {
                self.state.selected_station = Some(station);
                self.state.ui_settings.sidebar_open = true;
                self.state.ui_settings.active_tab = SidebarTab::Stations;
            }
            None => {}
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl eframe::App for ChargeMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle keyboard shortcuts
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::H) && i.modifiers.ctrl {
                self.show_help = !self.show_help;
            }
        });

        // Fit view to loaded stations if requested
        if self.state.pending_fit_bounds {
            self.state.pending_fit_bounds = false;
            self.fit_to_bounds();
        }

        // Handle drag and drop
        ui_panels::handle_drag_and_drop(ctx, &mut self.state);

        // Handle file picker
        ui_panels::show_file_picker(&mut self.state);

        // Show help overlay if enabled
        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        // Render the main sidebar (responsive: side or bottom based on orientation)
        ui_panels::render_sidebar(ctx, &mut self.state);

        // Capture values we need before the closure
        let markers = self.state.markers.clone();
        let feedback = self.feedback.clone();
        let marker_radius = self.state.ui_settings.marker_radius;
        let selected_id = self
            .state
            .selected_station
            .as_ref()
            .map(|s| s.id().to_string());
        let tiles_provider = self.state.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();

        // Central panel: Map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let station_plugin =
                    StationPlugin::new(markers, feedback, marker_radius, selected_id);

                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                };

                // Default view: roughly centered on India until stations load
                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(22.0, 79.0),
                )
                .with_plugin(station_plugin);

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        // React to the viewport and clicks the plugin just reported
        self.process_plugin_feedback(ctx);

        // Process pending files one at a time to keep the UI responsive
        if self.state.file_loader.is_busy() {
            self.state.process_pending_files();
            ctx.request_repaint();
        }

        // After all startup files are loaded, fit to bounds once
        if !self.restored_persisted_state
            && !self.state.file_loader.is_busy()
            && !self.state.file_loader.loaded_files.is_empty()
        {
            self.restored_persisted_state = true;
            self.fit_to_bounds();
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        // Save settings only (no station data - fast)
        // Include pending and loading files too, so nothing is lost if the
        // app is closed mid-load
        let mut loaded_file_paths: Vec<String> = self
            .state
            .file_loader
            .loaded_files
            .iter()
            .map(|(path, _)| path.to_string_lossy().to_string())
            .collect();

        for path in &self.state.file_loader.pending_files {
            let path_str = path.to_string_lossy().to_string();
            if !loaded_file_paths.contains(&path_str) {
                loaded_file_paths.push(path_str);
            }
        }

        if let Some(ref path) = self.state.file_loader.loading_file {
            let path_str = path.to_string_lossy().to_string();
            if !loaded_file_paths.contains(&path_str) {
                loaded_file_paths.push(path_str);
            }
        }

        let settings = PersistedSettings {
            marker_radius: self.state.ui_settings.marker_radius,
            cluster_radius_px: self.state.ui_settings.cluster_radius_px,
            sidebar_open: self.state.ui_settings.sidebar_open,
            active_tab: format!("{:?}", self.state.ui_settings.active_tab),
            tiles_provider: format!("{:?}", self.state.ui_settings.tiles_provider),
            loaded_file_paths,
        };

        if let Ok(json) = serde_json::to_string(&settings) {
            storage.set_string("persisted_settings", json);
            tracing::debug!("Saved settings on exit");
        }
    }
}
