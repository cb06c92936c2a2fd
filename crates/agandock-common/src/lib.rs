//! agandock-common - Shared errors, configuration and naming rules used across all AGanDock crates.

pub mod error;
pub mod config;
pub mod naming;

// Re-export commonly used types
pub use config::{DashboardConfig, ServerConfig, PipelineConfig, ResultsConfig};
pub use error::{AgandockError, ApiError, Result};
