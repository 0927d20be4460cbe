//! Configuration management for the `CarbonTrip` service
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::CarbonTripError;
use crate::availability::AvailabilityPolicyKind;
use crate::emissions::{BreakdownStrategy, EmissionDisplay};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `CarbonTrip` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonTripConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Remote service endpoints and credentials
    pub services: ServicesConfig,
    /// Planning behaviour
    pub planning: PlanningConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the built frontend, served as fallback
    pub static_dir: String,
    pub request_timeout_seconds: u32,
    pub body_limit_bytes: usize,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
}

/// Remote service configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Photon geocoding endpoint
    pub city_search_url: String,
    /// ImpactCO2 transport endpoint
    pub transport_url: String,
    /// OpenRouteService base URL
    pub routing_url: String,
    pub routing_api_key: Option<String>,
    /// Firebase Identity Toolkit base URL
    pub identity_url: String,
    pub identity_api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Client-side cap on route probes
    pub routing_requests_per_minute: u32,
    /// Language requested from the transport service
    pub language: String,
}

/// Planning behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// `route-probe` or `distance`; unset picks based on the routing key
    pub availability_policy: Option<AvailabilityPolicyKind>,
    /// `footprint-catalog` or `inline-details`
    pub breakdown_strategy: BreakdownStrategy,
    /// `kilograms` or `whole`
    pub emission_display: EmissionDisplay,
    /// Quiet window for as-you-type city search
    pub search_debounce_ms: u64,
    /// Queries shorter than this never reach the city search service
    pub min_query_length: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector endpoint, tracing export is off when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "frontend/dist".to_string()
}

fn default_request_timeout() -> u32 {
    30
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn default_city_search_url() -> String {
    "https://photon.komoot.io/api/".to_string()
}

fn default_transport_url() -> String {
    "https://impactco2.fr/api/v1/transport".to_string()
}

fn default_routing_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_services_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_routing_rate() -> u32 {
    40
}

fn default_language() -> String {
    "en".to_string()
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_min_query_length() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            city_search_url: default_city_search_url(),
            transport_url: default_transport_url(),
            routing_url: default_routing_url(),
            routing_api_key: None,
            identity_url: default_identity_url(),
            identity_api_key: None,
            timeout_seconds: default_services_timeout(),
            max_retries: default_max_retries(),
            routing_requests_per_minute: default_routing_rate(),
            language: default_language(),
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            availability_policy: None,
            breakdown_strategy: BreakdownStrategy::default(),
            emission_display: EmissionDisplay::default(),
            search_debounce_ms: default_search_debounce_ms(),
            min_query_length: default_min_query_length(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl CarbonTripConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // CARBONTRIP_SERVICES__ROUTING_API_KEY -> services.routing_api_key
        builder = builder.add_source(
            Environment::with_prefix("CARBONTRIP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: CarbonTripConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("carbontrip").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.body_limit_bytes == 0 {
            self.server.body_limit_bytes = default_body_limit();
        }
        if self.services.timeout_seconds == 0 {
            self.services.timeout_seconds = default_services_timeout();
        }
        if self.services.routing_requests_per_minute == 0 {
            self.services.routing_requests_per_minute = default_routing_rate();
        }
        if self.services.language.is_empty() {
            self.services.language = default_language();
        }
        if self.planning.availability_policy.is_none() {
            self.planning.availability_policy = Some(if self.services.routing_api_key.is_some() {
                AvailabilityPolicyKind::RouteProbe
            } else {
                AvailabilityPolicyKind::Distance
            });
        }
        if self.planning.search_debounce_ms == 0 {
            self.planning.search_debounce_ms = default_search_debounce_ms();
        }
        if self.planning.min_query_length == 0 {
            self.planning.min_query_length = default_min_query_length();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        for (label, key) in [
            ("Routing", &self.services.routing_api_key),
            ("Identity", &self.services.identity_api_key),
        ] {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(CarbonTripError::config(format!(
                        "{label} API key cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
            }
        }

        if self.planning.availability_policy == Some(AvailabilityPolicyKind::RouteProbe)
            && self.services.routing_api_key.is_none()
        {
            return Err(CarbonTripError::config(
                "The route-probe availability policy needs services.routing_api_key",
            )
            .into());
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(CarbonTripError::config("Server port cannot be 0").into());
        }

        if self.services.timeout_seconds > 300 {
            return Err(
                CarbonTripError::config("Service timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.services.max_retries > 10 {
            return Err(CarbonTripError::config("Service max retries cannot exceed 10").into());
        }

        if !(50..=5000).contains(&self.planning.search_debounce_ms) {
            return Err(CarbonTripError::config(
                "Search debounce must be between 50 and 5000 milliseconds",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let checks: [(&str, &str, &[&str]); 2] = [
            (
                "log level",
                self.logging.level.as_str(),
                &["error", "warn", "info", "debug", "trace"],
            ),
            ("log format", self.logging.format.as_str(), &["pretty", "json"]),
        ];

        for (label, value, valid) in checks {
            if !valid.contains(&value) {
                return Err(CarbonTripError::config(format!(
                    "Invalid {label} '{value}'. Must be one of: {}",
                    valid.join(", ")
                ))
                .into());
            }
        }

        for (label, url) in [
            ("City search", &self.services.city_search_url),
            ("Transport", &self.services.transport_url),
            ("Routing", &self.services.routing_url),
            ("Identity", &self.services.identity_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CarbonTripError::config(format!(
                    "{label} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied_default() -> CarbonTripConfig {
        let mut config = CarbonTripConfig::default();
        config.apply_defaults();
        config
    }

    #[test]
    fn test_default_config() {
        let config = applied_default();
        assert_eq!(config.services.city_search_url, "https://photon.komoot.io/api/");
        assert_eq!(config.services.timeout_seconds, 30);
        assert_eq!(config.planning.search_debounce_ms, 300);
        assert_eq!(
            config.planning.availability_policy,
            Some(AvailabilityPolicyKind::Distance)
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.services.routing_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_routing_key_selects_route_probe() {
        let mut config = CarbonTripConfig::default();
        config.services.routing_api_key = Some("ors-key-123".to_string());
        config.apply_defaults();
        assert_eq!(
            config.planning.availability_policy,
            Some(AvailabilityPolicyKind::RouteProbe)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_route_probe_without_key_is_rejected() {
        let mut config = applied_default();
        config.planning.availability_policy = Some(AvailabilityPolicyKind::RouteProbe);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("routing_api_key"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = applied_default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = applied_default();
        config.services.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let mut config = applied_default();
        config.services.identity_api_key = Some("  ".to_string());
        assert!(config.validate_api_keys().is_err());
    }

    fn from_toml(toml: &str) -> std::result::Result<CarbonTripConfig, config::ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_planning_strategies_from_toml() {
        let config = from_toml(
            "[planning]\navailability_policy = \"distance\"\nbreakdown_strategy = \"inline-details\"\nemission_display = \"whole\"\n",
        )
        .unwrap();
        assert_eq!(
            config.planning.availability_policy,
            Some(AvailabilityPolicyKind::Distance)
        );
        assert_eq!(config.planning.breakdown_strategy, BreakdownStrategy::InlineDetails);
        assert_eq!(config.planning.emission_display, EmissionDisplay::Whole);
    }

    #[test]
    fn test_unknown_planning_strategy_rejected() {
        assert!(from_toml("[planning]\nemission_display = \"tonnes\"\n").is_err());
        assert!(from_toml("[planning]\navailability_policy = \"random\"\n").is_err());
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let config =
            CarbonTripConfig::load_from_path(Some(PathBuf::from("/nonexistent/carbontrip.toml")))
                .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.planning.breakdown_strategy, BreakdownStrategy::FootprintCatalog);
    }

    #[test]
    fn test_config_path_generation() {
        let path = CarbonTripConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("carbontrip"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
