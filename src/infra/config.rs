//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. None: built-in defaults (capacity 6, the classic timing ranges)
//!
//! Every key is optional; missing keys take their default.

use anyhow::{ensure, Context};
use serde::Deserialize;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;

/// How the barber notices new customers while dozing
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeMode {
    /// Sleep a fixed interval, then re-check the waiting room
    Poll,
    /// Sleep until the interval elapses or an admission wakes the barber
    Notify,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Slots in the receptionist's incoming channel
    #[serde(default = "default_arrival_buffer")]
    pub arrival_buffer: usize,
}

fn default_capacity() -> usize {
    6
}

fn default_arrival_buffer() -> usize {
    1
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self { capacity: default_capacity(), arrival_buffer: default_arrival_buffer() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarberConfig {
    #[serde(default = "default_service_min_ms")]
    pub service_min_ms: u64,
    #[serde(default = "default_service_max_ms")]
    pub service_max_ms: u64,
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    #[serde(default = "default_wake_mode")]
    pub wake_mode: WakeMode,
}

fn default_service_min_ms() -> u64 {
    2000
}

fn default_service_max_ms() -> u64 {
    6000
}

fn default_idle_interval_ms() -> u64 {
    1000
}

fn default_wake_mode() -> WakeMode {
    WakeMode::Poll
}

impl Default for BarberConfig {
    fn default() -> Self {
        Self {
            service_min_ms: default_service_min_ms(),
            service_max_ms: default_service_max_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            wake_mode: default_wake_mode(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_arrival_min_ms")]
    pub arrival_min_ms: u64,
    #[serde(default = "default_arrival_max_ms")]
    pub arrival_max_ms: u64,
    /// Stop after this many arrivals (runs forever when absent)
    #[serde(default)]
    pub max_customers: Option<u64>,
    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_arrival_min_ms() -> u64 {
    500
}

fn default_arrival_max_ms() -> u64 {
    5500
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            arrival_min_ms: default_arrival_min_ms(),
            arrival_max_ms: default_arrival_max_ms(),
            max_customers: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    10
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default)]
    pub barber: BarberConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    capacity: usize,
    arrival_buffer: usize,
    service_min_ms: u64,
    service_max_ms: u64,
    idle_interval_ms: u64,
    wake_mode: WakeMode,
    arrival_min_ms: u64,
    arrival_max_ms: u64,
    max_customers: Option<u64>,
    seed: Option<u64>,
    metrics_interval_secs: u64,
    log_level: String,
    log_json: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            capacity: toml_config.shop.capacity,
            arrival_buffer: toml_config.shop.arrival_buffer,
            service_min_ms: toml_config.barber.service_min_ms,
            service_max_ms: toml_config.barber.service_max_ms,
            idle_interval_ms: toml_config.barber.idle_interval_ms,
            wake_mode: toml_config.barber.wake_mode,
            arrival_min_ms: toml_config.generator.arrival_min_ms,
            arrival_max_ms: toml_config.generator.arrival_max_ms,
            max_customers: toml_config.generator.max_customers,
            seed: toml_config.generator.seed,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            log_level: toml_config.logging.level,
            log_json: toml_config.logging.json,
            config_file,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = Self::from_toml(toml_config, path.display().to_string());
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Check ranges and sizes that the simulation relies on
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.capacity >= 1, "shop.capacity must be at least 1");
        ensure!(self.arrival_buffer >= 1, "shop.arrival_buffer must be at least 1");
        ensure!(
            self.service_min_ms < self.service_max_ms,
            "barber.service_min_ms ({}) must be below barber.service_max_ms ({})",
            self.service_min_ms,
            self.service_max_ms
        );
        ensure!(self.idle_interval_ms > 0, "barber.idle_interval_ms must be positive");
        ensure!(
            self.arrival_min_ms < self.arrival_max_ms,
            "generator.arrival_min_ms ({}) must be below generator.arrival_max_ms ({})",
            self.arrival_min_ms,
            self.arrival_max_ms
        );
        ensure!(self.metrics_interval_secs > 0, "metrics.interval_secs must be positive");
        Ok(())
    }

    // Getters for all config fields
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn arrival_buffer(&self) -> usize {
        self.arrival_buffer
    }

    /// Haircut duration range in milliseconds (half-open)
    pub fn service_range_ms(&self) -> Range<u64> {
        self.service_min_ms..self.service_max_ms
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn wake_mode(&self) -> WakeMode {
        self.wake_mode
    }

    /// Gap between arrivals in milliseconds (half-open)
    pub fn arrival_range_ms(&self) -> Range<u64> {
        self.arrival_min_ms..self.arrival_max_ms
    }

    pub fn max_customers(&self) -> Option<u64> {
        self.max_customers
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn log_json(&self) -> bool {
        self.log_json
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    // Builder methods, mostly used to shape scenarios in tests
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_service_range_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.service_min_ms = min_ms;
        self.service_max_ms = max_ms;
        self
    }

    pub fn with_idle_interval_ms(mut self, ms: u64) -> Self {
        self.idle_interval_ms = ms;
        self
    }

    pub fn with_wake_mode(mut self, mode: WakeMode) -> Self {
        self.wake_mode = mode;
        self
    }

    pub fn with_arrival_range_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.arrival_min_ms = min_ms;
        self.arrival_max_ms = max_ms;
        self
    }

    pub fn with_max_customers(mut self, max: u64) -> Self {
        self.max_customers = Some(max);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capacity(), 6);
        assert_eq!(config.arrival_buffer(), 1);
        assert_eq!(config.service_range_ms(), 2000..6000);
        assert_eq!(config.idle_interval(), Duration::from_millis(1000));
        assert_eq!(config.arrival_range_ms(), 500..5500);
        assert_eq!(config.wake_mode(), WakeMode::Poll);
        assert_eq!(config.max_customers(), None);
        assert_eq!(config.seed(), None);
        assert_eq!(config.metrics_interval_secs(), 10);
        assert_eq!(config.log_level(), "info");
        assert!(!config.log_json());
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let err = Config::default().with_capacity(0).validate().unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_validate_rejects_empty_ranges() {
        assert!(Config::default().with_service_range_ms(3000, 3000).validate().is_err());
        assert!(Config::default().with_arrival_range_ms(900, 100).validate().is_err());
        assert!(Config::default().with_idle_interval_ms(0).validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_config: TomlConfig = toml::from_str("[shop]\ncapacity = 3\n").unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.capacity(), 3);
        assert_eq!(config.arrival_buffer(), 1);
        assert_eq!(config.service_range_ms(), 2000..6000);
    }

    #[test]
    fn test_wake_mode_parses_lowercase() {
        let toml_config: TomlConfig =
            toml::from_str("[barber]\nwake_mode = \"notify\"\n").unwrap();
        assert_eq!(toml_config.barber.wake_mode, WakeMode::Notify);
    }
}
