use crate::error::{Result, VegwatchError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Which imagery backend adapter serves the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process catalog, loaded from a fixture file
    #[default]
    Memory,
    /// Google Earth Engine REST API
    EarthEngine,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::EarthEngine => "earthengine",
        }
    }
}

pub const DEFAULT_EARTHENGINE_ENDPOINT: &str = "https://earthengine.googleapis.com/v1";

/// Layered configuration for the VegWatch service
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub port: ConfigValue<u16>,
    pub cors_origin: ConfigValue<String>,
    pub backend: ConfigValue<BackendKind>,
    pub request_timeout_secs: ConfigValue<u64>,
    pub public_base_url: ConfigValue<String>,
    pub memory_fixture: ConfigValue<Option<PathBuf>>,
    pub earthengine_project: ConfigValue<Option<String>>,
    pub earthengine_endpoint: ConfigValue<String>,
    pub earthengine_token_file: ConfigValue<Option<PathBuf>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            port: ConfigValue::new(3001, ConfigSource::Default),
            cors_origin: ConfigValue::new(
                "http://localhost:3000".to_string(),
                ConfigSource::Default,
            ),
            backend: ConfigValue::new(BackendKind::Memory, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(60, ConfigSource::Default),
            public_base_url: ConfigValue::new(
                "http://localhost:3001".to_string(),
                ConfigSource::Default,
            ),
            memory_fixture: ConfigValue::new(None, ConfigSource::Default),
            earthengine_project: ConfigValue::new(None, ConfigSource::Default),
            earthengine_endpoint: ConfigValue::new(
                DEFAULT_EARTHENGINE_ENDPOINT.to_string(),
                ConfigSource::Default,
            ),
            earthengine_token_file: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| VegwatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| VegwatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(port) = file_config.port {
            self.port.update(port, ConfigSource::File);
        }

        if let Some(origin) = file_config.cors_origin {
            self.cors_origin.update(origin, ConfigSource::File);
        }

        if let Some(backend) = file_config.backend {
            self.backend.update(backend, ConfigSource::File);
        }

        if let Some(timeout) = file_config.request_timeout_secs {
            let timeout = validate_timeout_secs(timeout)?;
            self.request_timeout_secs.update(timeout, ConfigSource::File);
        }

        if let Some(url) = file_config.public_base_url {
            self.public_base_url.update(url, ConfigSource::File);
        }

        if let Some(fixture) = file_config.memory_fixture {
            self.memory_fixture.update(Some(fixture), ConfigSource::File);
        }

        if let Some(earthengine) = file_config.earthengine {
            if let Some(project) = earthengine.project {
                self.earthengine_project.update(Some(project), ConfigSource::File);
            }
            if let Some(endpoint) = earthengine.endpoint {
                self.earthengine_endpoint.update(endpoint, ConfigSource::File);
            }
            if let Some(token_file) = earthengine.token_file {
                self.earthengine_token_file.update(Some(token_file), ConfigSource::File);
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // VEGWATCH_PORT
        if let Ok(port_str) = env::var("VEGWATCH_PORT") {
            match port_str.parse::<u16>() {
                Ok(port) => self.port.update(port, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid VEGWATCH_PORT value '{}': expected a port number",
                    port_str
                ),
            }
        }

        // VEGWATCH_CORS_ORIGIN
        if let Ok(origin) = env::var("VEGWATCH_CORS_ORIGIN") {
            self.cors_origin.update(origin, ConfigSource::Environment);
        }

        // VEGWATCH_BACKEND
        if let Ok(backend_str) = env::var("VEGWATCH_BACKEND") {
            match parse_backend_kind(&backend_str) {
                Ok(backend) => self.backend.update(backend, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid VEGWATCH_BACKEND value '{}': expected memory or earthengine",
                    backend_str
                ),
            }
        }

        // VEGWATCH_REQUEST_TIMEOUT_SECS
        if let Ok(timeout_str) = env::var("VEGWATCH_REQUEST_TIMEOUT_SECS") {
            match parse_timeout_secs(&timeout_str) {
                Ok(timeout) => {
                    self.request_timeout_secs.update(timeout, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid VEGWATCH_REQUEST_TIMEOUT_SECS value '{}': expected a positive integer",
                    timeout_str
                ),
            }
        }

        // VEGWATCH_PUBLIC_BASE_URL
        if let Ok(url) = env::var("VEGWATCH_PUBLIC_BASE_URL") {
            self.public_base_url.update(url, ConfigSource::Environment);
        }

        // VEGWATCH_MEMORY_FIXTURE
        if let Ok(path) = env::var("VEGWATCH_MEMORY_FIXTURE") {
            self.memory_fixture.update(Some(PathBuf::from(path)), ConfigSource::Environment);
        }

        // VEGWATCH_EE_PROJECT
        if let Ok(project) = env::var("VEGWATCH_EE_PROJECT") {
            self.earthengine_project.update(Some(project), ConfigSource::Environment);
        }

        // VEGWATCH_EE_ENDPOINT
        if let Ok(endpoint) = env::var("VEGWATCH_EE_ENDPOINT") {
            self.earthengine_endpoint.update(endpoint, ConfigSource::Environment);
        }

        // VEGWATCH_EE_TOKEN_FILE
        if let Ok(path) = env::var("VEGWATCH_EE_TOKEN_FILE") {
            self.earthengine_token_file
                .update(Some(PathBuf::from(path)), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port.update(port, ConfigSource::Cli);
        }

        if let Some(origin) = overrides.cors_origin {
            self.cors_origin.update(origin, ConfigSource::Cli);
        }

        if let Some(backend) = overrides.backend {
            self.backend.update(backend, ConfigSource::Cli);
        }

        if let Some(timeout) = overrides.request_timeout_secs {
            self.request_timeout_secs.update(timeout, ConfigSource::Cli);
        }

        if let Some(url) = overrides.public_base_url {
            self.public_base_url.update(url, ConfigSource::Cli);
        }

        if let Some(fixture) = overrides.memory_fixture {
            self.memory_fixture.update(Some(fixture), ConfigSource::Cli);
        }

        if let Some(project) = overrides.earthengine_project {
            self.earthengine_project.update(Some(project), ConfigSource::Cli);
        }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("port".to_string(), (self.port.value.to_string(), self.port.source));
        map.insert(
            "cors_origin".to_string(),
            (self.cors_origin.value.clone(), self.cors_origin.source),
        );
        map.insert(
            "backend".to_string(),
            (self.backend.value.as_str().to_string(), self.backend.source),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            (self.request_timeout_secs.value.to_string(), self.request_timeout_secs.source),
        );
        map.insert(
            "public_base_url".to_string(),
            (self.public_base_url.value.clone(), self.public_base_url.source),
        );
        map.insert(
            "memory_fixture".to_string(),
            (display_optional_path(&self.memory_fixture.value), self.memory_fixture.source),
        );
        map.insert(
            "earthengine_project".to_string(),
            (
                self.earthengine_project.value.clone().unwrap_or_else(|| "-".to_string()),
                self.earthengine_project.source,
            ),
        );
        map.insert(
            "earthengine_endpoint".to_string(),
            (self.earthengine_endpoint.value.clone(), self.earthengine_endpoint.source),
        );
        map.insert(
            "earthengine_token_file".to_string(),
            (
                display_optional_path(&self.earthengine_token_file.value),
                self.earthengine_token_file.source,
            ),
        );

        map
    }
}

fn display_optional_path(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string())
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    port: Option<u16>,
    cors_origin: Option<String>,
    backend: Option<BackendKind>,
    request_timeout_secs: Option<u64>,
    public_base_url: Option<String>,
    memory_fixture: Option<PathBuf>,
    earthengine: Option<EarthEngineFileConfig>,
}

/// `[earthengine]` table of the config file
#[derive(Debug, Deserialize, Serialize)]
struct EarthEngineFileConfig {
    project: Option<String>,
    endpoint: Option<String>,
    token_file: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub port: Option<u16>,
    pub cors_origin: Option<String>,
    pub backend: Option<BackendKind>,
    pub request_timeout_secs: Option<u64>,
    pub public_base_url: Option<String>,
    pub memory_fixture: Option<PathBuf>,
    pub earthengine_project: Option<String>,
}

/// Parse backend kind from string
pub fn parse_backend_kind(s: &str) -> Result<BackendKind> {
    match s.to_lowercase().as_str() {
        "memory" | "mem" => Ok(BackendKind::Memory),
        "earthengine" | "earth-engine" | "ee" => Ok(BackendKind::EarthEngine),
        _ => Err(VegwatchError::ConfigInvalid {
            key: "backend".to_string(),
            reason: format!("Invalid backend: {}. Use memory or earthengine", s),
        }),
    }
}

/// Parse a request timeout in whole seconds; zero is rejected
pub fn parse_timeout_secs(s: &str) -> Result<u64> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| invalid_timeout(s))
        .and_then(validate_timeout_secs)
}

/// Reject a zero timeout, which would fail every backend call immediately
pub fn validate_timeout_secs(secs: u64) -> Result<u64> {
    if secs == 0 {
        return Err(invalid_timeout(&secs.to_string()));
    }
    Ok(secs)
}

fn invalid_timeout(value: &str) -> VegwatchError {
    VegwatchError::ConfigInvalid {
        key: "request_timeout_secs".to_string(),
        reason: format!("Invalid timeout: {}. Use a positive number of seconds", value),
    }
}
