#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use charge_map_viewer::ChargeMapApp;

fn main() {
    setup_logging();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    rt.block_on(async {
        let native_options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("Charge Map")
                .with_inner_size([1280.0, 720.0]),
            ..Default::default()
        };

        let _ = eframe::run_native(
            "Charge Map",
            native_options,
            Box::new(|cc| Ok(Box::new(ChargeMapApp::new(cc)))),
        );
    });
}

fn setup_logging() {
    use tracing_subscriber::prelude::*;

    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            // Nicer default logs
            std::env::set_var("RUST_LOG", "info,wgpu_hal=warn,eframe=warn");
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_filter(tracing_subscriber::EnvFilter::from_default_env());

    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!(
        "{} v{} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}
