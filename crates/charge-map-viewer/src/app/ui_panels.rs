//! UI panels for the application
//!
//! This module provides reusable UI components for the sidebar design
//! with tabs, station filters, and drag-and-drop support.

use crate::app::state::{AppState, SidebarTab, TilesProvider};
use charge_map_lib::StationStatus;
use egui::{Color32, RichText, Ui};

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    // Position button in top-right corner
    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    let is_portrait = screen_size.y > screen_size.x;

    if is_portrait {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| {
                render_sidebar_content(ui, state, true);
            });
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(300.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| {
                render_sidebar_content(ui, state, false);
            });
    }
}

/// Render the sidebar content (shared between portrait and landscape)
fn render_sidebar_content(ui: &mut Ui, state: &mut AppState, is_portrait: bool) {
    ui.horizontal(|ui| {
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Stations,
            "⚡ Stations",
        );
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Settings,
            "⚙ Settings",
        );
    });

    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match state.ui_settings.active_tab {
            SidebarTab::Stations => render_stations_tab(ui, state, is_portrait),
            SidebarTab::Settings => render_settings_tab(ui, state),
        });
}

/// Render the Stations tab
fn render_stations_tab(ui: &mut Ui, state: &mut AppState, is_portrait: bool) {
    // Action buttons at top
    if is_portrait {
        ui.vertical(|ui| {
            if ui.button("📂 Load Station Files...").clicked() {
                state.file_loader.show_picker = true;
            }
            ui.horizontal(|ui| {
                if ui.button("🎯 Fit to Bounds").clicked() {
                    state.pending_fit_bounds = true;
                }
                if ui.button("🗑 Clear All").clicked() {
                    state.clear_stations();
                }
            });
        });
    } else {
        ui.horizontal(|ui| {
            if ui.button("📂 Load Station Files...").clicked() {
                state.file_loader.show_picker = true;
            }
            if ui.button("🎯 Fit to Bounds").clicked() {
                state.pending_fit_bounds = true;
            }
            if ui.button("🗑 Clear All").clicked() {
                state.clear_stations();
            }
        });
    }

    ui.add_space(8.0);

    // Loading progress
    if state.file_loader.is_busy() {
        ui.separator();
        let remaining = state.file_loader.pending_files.len()
            + usize::from(state.file_loader.loading_file.is_some());
        ui.label(
            RichText::new(format!("⏳ Loading files... ({} remaining)", remaining))
                .strong()
                .color(ui.visuals().warn_fg_color),
        );
        ui.add_space(8.0);
    }

    ui.separator();

    render_stats_section(ui, state);

    ui.add_space(8.0);
    ui.separator();

    render_filters_section(ui, state);

    // Selected station details
    if state.selected_station.is_some() {
        ui.add_space(8.0);
        ui.separator();
        render_selected_station(ui, state);
    }

    // Error list (shown BEFORE loaded files, with fixed height)
    if !state.file_loader.errors.is_empty() {
        ui.add_space(8.0);
        ui.separator();
        ui.label(
            RichText::new(format!(
                "⚠ Errors ({} files)",
                state.file_loader.errors.len()
            ))
            .strong()
            .color(Color32::RED),
        );
        ui.add_space(4.0);

        egui::ScrollArea::vertical()
            .id_salt("errors_scroll")
            .max_height(100.0)
            .show(ui, |ui| {
                for (file, error) in &state.file_loader.errors {
                    ui.label(
                        RichText::new(format!(
                            "• {}: {}",
                            file.file_name().unwrap_or_default().to_string_lossy(),
                            error
                        ))
                        .small()
                        .color(Color32::RED),
                    );
                }
            });

        ui.add_space(4.0);
        if ui.button("Clear Errors").clicked() {
            state.file_loader.errors.clear();
        }
    }

    // Loaded files list (expands to fill remaining available space)
    if !state.file_loader.loaded_files.is_empty() {
        ui.add_space(8.0);
        ui.separator();
        ui.label(
            RichText::new("✓ Loaded Files")
                .strong()
                .color(Color32::GREEN),
        );
        ui.add_space(4.0);

        let mut to_remove = None;
        let available_height = ui.available_height().max(80.0);

        egui::ScrollArea::vertical()
            .id_salt("loaded_files_scroll")
            .max_height(available_height - 8.0)
            .show(ui, |ui| {
                for (idx, (path, records)) in state.file_loader.loaded_files.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!(
                                "📄 {} ({} records)",
                                path.file_name().unwrap_or_default().to_string_lossy(),
                                records.len()
                            ))
                            .small(),
                        );

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("🗑").clicked() {
                                to_remove = Some(idx);
                            }
                        });
                    });
                }
            });

        if let Some(idx) = to_remove {
            state.remove_file(idx);
        }
    }
}

/// Render statistics section (used in Stations tab)
fn render_stats_section(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("📊 Statistics").strong());
    ui.add_space(4.0);

    egui::Grid::new("stats_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Files:");
            ui.label(RichText::new(format!("{}", state.file_loader.loaded_files.len())).strong());
            ui.end_row();

            ui.label("Stations:");
            ui.label(RichText::new(state.stats.format_stations()).strong());
            ui.end_row();

            if state.stats.skipped_records > 0 {
                ui.label("Skipped records:");
                ui.label(
                    RichText::new(format!("{}", state.stats.skipped_records))
                        .color(Color32::YELLOW),
                );
                ui.end_row();
            }

            if state.stats.filtered_out > 0 {
                ui.label("Hidden by filters:");
                ui.label(RichText::new(format!("{}", state.stats.filtered_out)).weak());
                ui.end_row();
            }

            // Query stats (once a viewport has settled)
            if state.last_viewport.is_some() {
                ui.separator();
                ui.separator();
                ui.end_row();

                ui.label("Markers:");
                ui.label(
                    RichText::new(format!(
                        "{} ({} clusters)",
                        state.stats.visible_markers, state.stats.visible_clusters
                    ))
                    .strong(),
                );
                ui.end_row();

                ui.label("Query time:");
                let time_color = if state.stats.last_query_time_ms < 16.0 {
                    Color32::GREEN
                } else if state.stats.last_query_time_ms < 50.0 {
                    Color32::YELLOW
                } else {
                    Color32::RED
                };
                ui.label(
                    RichText::new(format!("{:.1} ms", state.stats.last_query_time_ms))
                        .color(time_color),
                );
                ui.end_row();
            }
        });
}

/// Render the status and connector filters
fn render_filters_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🔍 Filters").strong());
    ui.add_space(4.0);

    let mut changed = false;

    for status in StationStatus::all() {
        let mut enabled = state.ui_settings.status_filter.contains(status);
        if ui.checkbox(&mut enabled, status.label()).changed() {
            if enabled {
                state.ui_settings.status_filter.insert(*status);
            } else {
                state.ui_settings.status_filter.remove(status);
            }
            changed = true;
        }
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        ui.label("Connector:");
        if ui
            .text_edit_singleline(&mut state.ui_settings.connector_filter)
            .changed()
        {
            changed = true;
        }
    });
    ui.label(
        RichText::new("e.g. CCS2, CHAdeMO, Type2")
            .small()
            .weak(),
    );

    if changed {
        state.rebuild_collection();
    }
}

/// Render details of the station selected on the map
fn render_selected_station(ui: &mut Ui, state: &mut AppState) {
    let Some(station) = state.selected_station.clone() else {
        return;
    };

    ui.label(RichText::new("📍 Selected Station").strong());
    ui.add_space(4.0);

    let name = if station.name().is_empty() {
        station.id()
    } else {
        station.name()
    };
    ui.label(RichText::new(name).strong());

    if !station.address().is_empty() {
        ui.label(RichText::new(station.address()).small().weak());
    }

    ui.add_space(4.0);
    egui::Grid::new("selected_station_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Status:");
            let status_color = match station.status() {
                StationStatus::Operational => Color32::GREEN,
                StationStatus::UnderMaintenance => Color32::YELLOW,
                StationStatus::ComingSoon => Color32::LIGHT_BLUE,
                StationStatus::Unknown => Color32::GRAY,
            };
            ui.label(RichText::new(station.status().label()).color(status_color));
            ui.end_row();

            if !station.connector_types().is_empty() {
                ui.label("Connectors:");
                ui.label(RichText::new(station.connector_types().join(", ")).strong());
                ui.end_row();
            }

            if let Some(price) = station.price_per_kwh() {
                ui.label("Price:");
                ui.label(RichText::new(format!("₹{:.1}/kWh", price)).strong());
                ui.end_row();
            }

            if let Some(rating) = station.rating() {
                ui.label("Rating:");
                ui.label(RichText::new(format!("{:.1} ★", rating)).strong());
                ui.end_row();
            }

            ui.label("Location:");
            ui.label(
                RichText::new(format!(
                    "{:.4}, {:.4}",
                    station.latitude(),
                    station.longitude()
                ))
                .small(),
            );
            ui.end_row();
        });

    ui.add_space(4.0);
    if ui.button("Clear Selection").clicked() {
        state.selected_station = None;
    }
}

/// Render the Settings tab
fn render_settings_tab(ui: &mut Ui, state: &mut AppState) {
    // Clustering section
    ui.label(RichText::new("🔵 Clustering").strong());
    ui.add_space(6.0);

    ui.label("Grouping Radius (screen pixels):");
    ui.add_space(4.0);

    let mut radius = state.ui_settings.cluster_radius_px;
    let radius_changed = ui
        .add(
            egui::Slider::new(&mut radius, 10.0..=120.0)
                .suffix(" px")
                .step_by(5.0),
        )
        .changed();
    if radius_changed {
        state.set_cluster_radius(radius);
    }

    ui.add_space(4.0);
    ui.label(
        RichText::new("Stations closer than this on screen merge into one badge")
            .small()
            .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    // Marker appearance section
    ui.label(RichText::new("🎨 Markers").strong());
    ui.add_space(6.0);

    egui::Grid::new("markers_grid")
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.label("Pin Radius:");
            ui.add(
                egui::Slider::new(&mut state.ui_settings.marker_radius, 4.0..=16.0)
                    .suffix(" px")
                    .step_by(0.5),
            );
            ui.end_row();
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    // Map Tiles section
    ui.label(RichText::new("🗺 Map Tiles").strong());
    ui.add_space(6.0);

    for provider in TilesProvider::all() {
        let selected = state.ui_settings.tiles_provider == *provider;
        if ui.selectable_label(selected, provider.name()).clicked() {
            state.ui_settings.tiles_provider = *provider;
        }
    }

    ui.add_space(4.0);
    ui.label(
        RichText::new(state.ui_settings.tiles_provider.attribution())
            .small()
            .italics()
            .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    // About section
    ui.label(RichText::new("ℹ About").strong());
    ui.add_space(4.0);
    ui.label(RichText::new("Charge Map").small());
    ui.label(
        RichText::new("Find EV charging stations across India")
            .small()
            .weak(),
    );
    ui.add_space(4.0);
    ui.label(RichText::new("Keyboard shortcuts:").small());
    ui.label(RichText::new("  F1 / Ctrl+H - Toggle help").small().weak());
    ui.label(RichText::new("  Ctrl + Scroll - Zoom map").small().weak());
}

/// Show file picker dialog
pub fn show_file_picker(state: &mut AppState) {
    if state.file_loader.show_picker {
        state.file_loader.show_picker = false;

        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Station JSON Files", &["json"])
            .set_title("Select Station Files")
            .pick_files()
        {
            for path in paths {
                state.queue_file(path);
            }
        }
    }
}

/// Help overlay
pub fn help_overlay(ctx: &egui::Context, show_help: &mut bool) {
    egui::Window::new("Help")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("Charge Map");
            ui.add_space(8.0);

            ui.label("An interactive map of EV charging stations.");
            ui.add_space(12.0);

            ui.label(RichText::new("Loading Stations").strong());
            ui.label("• Click 'Load Station Files...' in the sidebar");
            ui.label("• Or drag and drop station JSON files onto the window");
            ui.add_space(8.0);

            ui.label(RichText::new("Navigation").strong());
            ui.label("• Ctrl + Scroll wheel to zoom");
            ui.label("• Click and drag to pan");
            ui.label("• Click a numbered badge to zoom into that group");
            ui.label("• Click a pin to see station details");
            ui.add_space(8.0);

            ui.label(RichText::new("Keyboard Shortcuts").strong());
            ui.label("• F1 or Ctrl+H - Toggle this help");
            ui.add_space(12.0);

            if ui.button("Close").clicked() {
                *show_help = false;
            }
        });
}

/// Handle drag and drop of station JSON files
pub fn handle_drag_and_drop(ctx: &egui::Context, state: &mut AppState) {
    // Only read input state inside ctx.input
    let hovered_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
    let dropped_files: Vec<_> = ctx.input(|i| i.raw.dropped_files.clone());

    // Show drop preview if files are hovered
    if hovered_files {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop_preview"),
        ));
        let screen_rect = ctx.content_rect();
        let bg_size = egui::vec2(340.0, 80.0);
        let bg_rect = egui::Rect::from_center_size(screen_rect.center(), bg_size);
        painter.rect_filled(bg_rect, 16.0, egui::Color32::from_black_alpha(180));
        painter.text(
            screen_rect.center(),
            egui::Align2::CENTER_CENTER,
            "⚡ Drop station files here",
            egui::FontId::proportional(32.0),
            egui::Color32::WHITE,
        );
    }

    // Handle dropped files outside of ctx.input
    for dropped_file in dropped_files {
        if let Some(path) = dropped_file.path
            && path.extension().map(|e| e == "json").unwrap_or(false)
        {
            state.queue_file(path);
        }
    }
}
