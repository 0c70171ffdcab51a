//! Walkers plugin for drawing station markers on the map view
//!
//! The plugin draws the cached marker list from the last settled viewport
//! query and reports two things back to the application: the viewport the
//! map is currently showing (fed into the debouncer) and any marker the
//! user clicked.

use charge_map_lib::{ClusterId, Marker, Station, StationStatus, Viewport, utils};
use egui::{Color32, Stroke};
use std::sync::{Arc, RwLock};
use walkers::{Plugin, Projector};

/// A marker the user clicked on
pub enum MarkerHit {
    Cluster(ClusterId),
    Station(Arc<Station>),
}

/// Per-frame results the plugin hands back to the application
#[derive(Default)]
pub struct PluginFeedback {
    /// Viewport the map showed this frame
    pub viewport: Option<Viewport>,

    /// Marker clicked this frame, consumed by the application
    pub clicked: Option<MarkerHit>,
}

/// Plugin for rendering station and cluster markers on the map
pub struct StationPlugin {
    /// Markers from the last settled query
    markers: Arc<RwLock<Vec<Marker>>>,

    /// Feedback channel back to the application
    feedback: Arc<RwLock<PluginFeedback>>,

    /// Station pin radius in pixels
    marker_radius: f32,

    /// Identifier of the station highlighted in the sidebar
    selected_id: Option<String>,
}

impl StationPlugin {
    pub fn new(
        markers: Arc<RwLock<Vec<Marker>>>,
        feedback: Arc<RwLock<PluginFeedback>>,
        marker_radius: f32,
        selected_id: Option<String>,
    ) -> Self {
        Self {
            markers,
            feedback,
            marker_radius,
            selected_id,
        }
    }

    fn status_color(status: StationStatus) -> Color32 {
        match status {
            StationStatus::Operational => Color32::from_rgb(60, 160, 75),
            StationStatus::UnderMaintenance => Color32::from_rgb(230, 150, 40),
            StationStatus::ComingSoon => Color32::from_rgb(70, 130, 220),
            StationStatus::Unknown => Color32::from_rgb(130, 130, 130),
        }
    }

    fn cluster_radius(&self, count: usize) -> f32 {
        // Badges grow slowly with the covered station count
        self.marker_radius + 4.0 + (count as f32).log10() * 6.0
    }

    fn screen_pos(projector: &Projector, marker: &Marker) -> egui::Pos2 {
        let position = marker.position();
        let screen_vec = projector.project(walkers::lat_lon(position.y(), position.x()));
        egui::Pos2::new(screen_vec.x, screen_vec.y)
    }
}

impl Plugin for StationPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("StationPlugin::run");

        let painter = ui.painter();
        let viewport_rect = response.rect;

        // Convert screen corners to geographic positions; the debouncer and
        // the index work in WGS84 plus zoom.
        let top_left =
            projector.unproject(egui::Vec2::new(viewport_rect.min.x, viewport_rect.min.y));
        let bottom_right =
            projector.unproject(egui::Vec2::new(viewport_rect.max.x, viewport_rect.max.y));

        let viewport = Viewport::new(
            top_left.x().min(bottom_right.x()),
            top_left
                .y()
                .min(bottom_right.y())
                .max(-utils::MAX_LATITUDE),
            top_left.x().max(bottom_right.x()),
            top_left.y().max(bottom_right.y()).min(utils::MAX_LATITUDE),
            map_memory.zoom(),
        );

        let click_pos = if response.clicked() {
            response.interact_pointer_pos()
        } else {
            None
        };
        let mut clicked: Option<MarkerHit> = None;

        {
            profiling::scope!("draw_markers");
            let markers = self.markers.read().unwrap();

            for marker in markers.iter() {
                let pos = Self::screen_pos(projector, marker);

                match marker {
                    Marker::Cluster(cluster) => {
                        let radius = self.cluster_radius(cluster.count);
                        painter.circle_filled(pos, radius, Color32::from_rgb(40, 90, 180));
                        painter.circle_stroke(pos, radius, Stroke::new(2.0, Color32::WHITE));
                        painter.text(
                            pos,
                            egui::Align2::CENTER_CENTER,
                            format!("{}", cluster.count),
                            egui::FontId::proportional((radius * 0.9).clamp(10.0, 18.0)),
                            Color32::WHITE,
                        );

                        if let Some(click) = click_pos
                            && click.distance(pos) <= radius
                        {
                            clicked = Some(MarkerHit::Cluster(cluster.id));
                        }
                    }
                    Marker::Station(station) => {
                        let radius = self.marker_radius;
                        let selected = self
                            .selected_id
                            .as_deref()
                            .is_some_and(|id| id == station.id());

                        painter.circle_filled(pos, radius, Self::status_color(station.status()));
                        painter.circle_stroke(
                            pos,
                            radius,
                            Stroke::new(1.5, Color32::from_black_alpha(160)),
                        );
                        if selected {
                            painter.circle_stroke(
                                pos,
                                radius + 3.0,
                                Stroke::new(2.0, Color32::WHITE),
                            );
                        }

                        if let Some(click) = click_pos
                            && click.distance(pos) <= radius + 2.0
                        {
                            clicked = Some(MarkerHit::Station(station.clone()));
                        }
                    }
                }
            }
        }

        let mut feedback = self.feedback.write().unwrap();
        feedback.viewport = Some(viewport);
        if clicked.is_some() {
            feedback.clicked = clicked;
        }
    }
}
