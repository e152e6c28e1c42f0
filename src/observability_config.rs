//! # Observability Configuration
//!
//! Environment-specific settings for logging and metrics export.

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for this crate's targets
    pub log_level: String,
    /// Log output format: "pretty" or "json"
    pub log_format: String,
    /// Whether to serve Prometheus metrics
    pub enable_metrics_export: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            enable_metrics_export: true,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            enable_metrics_export: lookup("ENABLE_METRICS_EXPORT")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.enable_metrics_export),
        }
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Whether log lines should be human readable rather than JSON
    pub fn use_pretty_logs(&self) -> bool {
        self.is_development() || self.log_format == "pretty"
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!("Invalid log level: {}", self.log_level));
        }

        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(format!("Invalid log format: {}", self.log_format));
        }

        if self.environment.trim().is_empty() {
            return Err("Environment name cannot be empty".to_string());
        }

        Ok(())
    }
}
