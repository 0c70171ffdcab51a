use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Charge Map - An interactive map of EV charging stations
pub struct Settings {
    /// Station JSON files to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub station_files: Vec<PathBuf>,

    /// Clustering radius in screen pixels
    #[clap(long, default_value = "40.0")]
    pub cluster_radius: f64,

    /// Deepest zoom level at which stations are still clustered
    #[clap(long, default_value = "17")]
    pub max_cluster_zoom: u8,

    /// Viewport settle delay in milliseconds before markers are requeried
    #[clap(long, default_value = "150")]
    pub debounce_ms: u64,

    /// Station pin radius in pixels
    #[clap(long, default_value = "8.0")]
    pub marker_radius: f32,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

impl Settings {
    pub fn from_cli() -> Self {
        Settings::parse()
    }
}
