//! Charge Map - Application Library
//!
//! This is the main application crate that wires the station clustering
//! library into an interactive map UI.

mod app;

pub use app::ChargeMapApp;
