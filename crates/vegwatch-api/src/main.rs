use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vegwatch_core::config::{BackendKind, LayeredConfig};
use vegwatch_core::ports::ImageryBackend;
use vegwatch_imagery::earthengine::{CredentialSource, EarthEngineBackend, EarthEngineConfig};
use vegwatch_imagery::memory::{MemoryImageryBackend, RasterGrid};

use vegwatch_api::router::create_router;
use vegwatch_api::state::AppState;
use vegwatch_api::ServerArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vegwatch_api=info,vegwatch_detect=info,vegwatch_imagery=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();
    let config = args.load_config().context("Failed to load configuration")?;

    let mut settings: Vec<_> = config.to_inspection_map().into_iter().collect();
    settings.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, (value, source)) in settings {
        tracing::info!(key = %key, value = %value, source = ?source, "Configuration");
    }

    let backend = init_backend(&config).await?;

    tracing::info!(
        port = config.port.value,
        backend = backend.name(),
        "Starting VegWatch API server"
    );

    let state = Arc::new(AppState::new(backend));

    let origin = config
        .cors_origin
        .value
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin '{}'", config.cors_origin.value))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = create_router(state).layer(cors).layer(TraceLayer::new_for_http());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", config.cors_origin.value);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Build the configured imagery backend.
///
/// Earth Engine credentials are resolved here once; a failure is logged and the
/// server still starts, with analysis requests answered as backend-unavailable.
async fn init_backend(config: &LayeredConfig) -> anyhow::Result<Arc<dyn ImageryBackend>> {
    match config.backend.value {
        BackendKind::Memory => {
            let base_url = config.public_base_url.value.clone();
            let backend = match &config.memory_fixture.value {
                Some(path) => {
                    let backend = MemoryImageryBackend::load_fixture(path, base_url)
                        .with_context(|| format!("Failed to load fixture {}", path.display()))?;
                    tracing::info!(
                        fixture = %path.display(),
                        scenes = backend.scene_count(),
                        "Using in-memory imagery backend"
                    );
                    backend
                }
                None => {
                    tracing::warn!(
                        "No memory fixture configured; the scene catalog is empty \
                         (set VEGWATCH_MEMORY_FIXTURE or --memory-fixture)"
                    );
                    MemoryImageryBackend::new(RasterGrid::global(), base_url)
                }
            };
            Ok(Arc::new(backend))
        }
        BackendKind::EarthEngine => {
            let project = config.earthengine_project.value.clone().unwrap_or_default();
            let credentials = match &config.earthengine_token_file.value {
                Some(path) => CredentialSource::TokenFile(path.clone()),
                None => CredentialSource::default(),
            };

            let ee_config = EarthEngineConfig::new(project)
                .with_endpoint(config.earthengine_endpoint.value.clone())
                .with_credentials(credentials)
                .with_timeout(Duration::from_secs(config.request_timeout_secs.value));

            let backend = EarthEngineBackend::new(ee_config)
                .context("Failed to configure Earth Engine backend")?;

            if let Err(e) = backend.initialize().await {
                tracing::error!(
                    error = %e,
                    "Earth Engine initialization failed; analysis requests will be rejected"
                );
            }

            Ok(Arc::new(backend))
        }
    }
}
