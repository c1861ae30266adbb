pub mod client;
pub mod config;
pub mod models;
pub mod service;

pub use client::HttpAnalysisBackend;
pub use config::{LogFormat, ServiceConfig};
pub use service::{AppState, build_router, create_app};
