use clap::Parser;
use std::path::PathBuf;
use vegwatch_core::config::{
    parse_backend_kind, parse_timeout_secs, BackendKind, CliConfigOverrides, LayeredConfig,
};

/// Server command-line arguments; every flag overrides file and environment values
#[derive(Parser, Debug, Default)]
#[command(name = "vegwatch-api")]
#[command(about = "Vegetation loss detection API server", long_about = None)]
#[command(version)]
pub struct ServerArgs {
    /// TOML configuration file
    #[arg(long, env = "VEGWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Allowed CORS origin
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// Imagery backend (memory or earthengine)
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Timeout for each imagery backend call, in seconds
    #[arg(long, value_parser = parse_timeout)]
    pub request_timeout_secs: Option<u64>,

    /// Base URL used in thumbnail links served by this process
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// JSON scene catalog for the memory backend
    #[arg(long)]
    pub memory_fixture: Option<PathBuf>,

    /// Earth Engine cloud project
    #[arg(long = "ee-project")]
    pub earthengine_project: Option<String>,
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    parse_backend_kind(s).map_err(|e| e.to_string())
}

fn parse_timeout(s: &str) -> Result<u64, String> {
    parse_timeout_secs(s).map_err(|e| e.to_string())
}

impl ServerArgs {
    fn overrides(&self) -> CliConfigOverrides {
        CliConfigOverrides {
            port: self.port,
            cors_origin: self.cors_origin.clone(),
            backend: self.backend,
            request_timeout_secs: self.request_timeout_secs,
            public_base_url: self.public_base_url.clone(),
            memory_fixture: self.memory_fixture.clone(),
            earthengine_project: self.earthengine_project.clone(),
        }
    }

    /// Resolve the layered configuration: defaults, file, environment, then flags
    pub fn load_config(&self) -> vegwatch_core::Result<LayeredConfig> {
        let mut config = LayeredConfig::with_defaults();

        if let Some(path) = &self.config {
            config = config.load_from_file(path)?;
        }

        let mut config = config.load_from_env();
        config.update_from_cli(self.overrides());
        Ok(config)
    }
}
