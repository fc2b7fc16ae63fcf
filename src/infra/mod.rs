//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, validation)
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, WakeMode};
pub use metrics::{Metrics, MetricsSummary};
