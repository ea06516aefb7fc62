//! Google Earth Engine REST adapter
//!
//! Recipes are translated into expression graphs ([`expression`]) and evaluated with
//! `value:compute`; thumbnails go through the `thumbnails` resource and come back as
//! `getPixels` URLs the client fetches directly.

pub mod expression;
pub mod session;

pub use expression::ExpressionGraph;
pub use session::{CredentialSource, EarthEngineSession, SessionState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use vegwatch_core::config::DEFAULT_EARTHENGINE_ENDPOINT;
use vegwatch_core::error::{Result, VegwatchError};
use vegwatch_core::models::{ImageExpr, Region, SceneQuery, ThumbnailParams};
use vegwatch_core::ports::ImageryBackend;

/// Earth Engine adapter configuration
#[derive(Debug, Clone)]
pub struct EarthEngineConfig {
    /// Cloud project the requests are billed to
    pub project: String,
    /// API root, e.g. `https://earthengine.googleapis.com/v1`
    pub endpoint: String,
    pub credentials: CredentialSource,
    /// Bound on every remote call
    pub request_timeout: Duration,
}

impl EarthEngineConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            endpoint: DEFAULT_EARTHENGINE_ENDPOINT.to_string(),
            credentials: CredentialSource::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialSource) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn project_url(&self, method: &str) -> String {
        format!("{}/projects/{}/{}", self.endpoint.trim_end_matches('/'), self.project, method)
    }
}

/// Earth Engine implementation of [`ImageryBackend`]
pub struct EarthEngineBackend {
    config: EarthEngineConfig,
    session: EarthEngineSession,
    client: reqwest::Client,
}

impl EarthEngineBackend {
    /// Create a new adapter. The session is not initialized yet.
    pub fn new(config: EarthEngineConfig) -> Result<Self> {
        if config.project.trim().is_empty() {
            return Err(VegwatchError::ConfigMissing {
                key: "earthengine_project".to_string(),
            });
        }

        let client = reqwest::Client::builder().timeout(config.request_timeout).build().map_err(
            |e| VegwatchError::ConfigInvalid {
                key: "earthengine".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            },
        )?;

        let session = EarthEngineSession::new(config.credentials.clone());

        Ok(Self {
            config,
            session,
            client,
        })
    }

    pub fn session(&self) -> &EarthEngineSession {
        &self.session
    }

    /// Resolve credentials now; the server calls this once at startup
    pub async fn initialize(&self) -> Result<()> {
        self.session.initialize().await
    }

    /// Evaluate an expression graph with `value:compute`
    async fn compute(&self, operation: &str, expression: Value) -> Result<Value> {
        let request = ComputeRequest { expression };
        let response: ComputeResponse =
            self.post(operation, &self.config.project_url("value:compute"), &request).await?;
        Ok(response.result)
    }

    async fn post<B, R>(&self, operation: &str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let token = self.session.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token.secret())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VegwatchError::backend(
                operation,
                format!("Earth Engine API error ({}): {}", status, error_text),
            ));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.request_error(operation, e)
            } else {
                VegwatchError::backend(
                    operation,
                    format!("Failed to parse Earth Engine response: {}", e),
                )
            }
        })
    }

    fn request_error(&self, operation: &str, error: reqwest::Error) -> VegwatchError {
        if error.is_timeout() {
            VegwatchError::BackendTimeout {
                operation: operation.to_string(),
                timeout_secs: self.config.request_timeout.as_secs(),
            }
        } else {
            VegwatchError::backend(operation, format!("Failed to reach Earth Engine: {}", error))
        }
    }
}

#[async_trait]
impl ImageryBackend for EarthEngineBackend {
    fn name(&self) -> &'static str {
        "earthengine"
    }

    async fn count_scenes(&self, query: &SceneQuery) -> Result<usize> {
        let mut graph = ExpressionGraph::new();
        let node = graph.scene_count(query);
        let result = self.compute("count_scenes", graph.finish(node)).await?;

        result.as_u64().map(|n| n as usize).ok_or_else(|| {
            VegwatchError::backend("count_scenes", format!("expected a count, got {}", result))
        })
    }

    async fn reduce_mean(
        &self,
        image: &ImageExpr,
        region: &Region,
        scale: f64,
    ) -> Result<Option<f64>> {
        let band = image.band_name().ok_or_else(|| {
            VegwatchError::backend("reduce_mean", "image must have a single named band")
        })?;

        let mut graph = ExpressionGraph::new();
        let node = graph.mean_over_region(image, region, scale);
        let result = self.compute("reduce_mean", graph.finish(node)).await?;

        match result.get(band) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                VegwatchError::backend(
                    "reduce_mean",
                    format!("expected a number for {}, got {}", band, value),
                )
            }),
        }
    }

    async fn render_thumbnail(
        &self,
        image: &ImageExpr,
        params: &ThumbnailParams,
    ) -> Result<String> {
        let mut graph = ExpressionGraph::new();
        let node = graph.thumbnail_image(image, &params.region, params.max_dimension);

        let request = ThumbnailRequest {
            expression: graph.finish(node),
            file_format: params.format.as_str(),
            visualization_options: json!({
                "ranges": [{ "min": params.min, "max": params.max }],
                "paletteColors": params.palette.to_hex(),
            }),
        };

        let thumbnail: ThumbnailResponse = self
            .post("render_thumbnail", &self.config.project_url("thumbnails"), &request)
            .await?;

        Ok(format!(
            "{}/{}:getPixels",
            self.config.endpoint.trim_end_matches('/'),
            thumbnail.name
        ))
    }
}

/// Request body for `value:compute`
#[derive(Debug, Serialize)]
struct ComputeRequest {
    expression: Value,
}

/// Response from `value:compute`
#[derive(Debug, Deserialize)]
struct ComputeResponse {
    #[serde(default)]
    result: Value,
}

/// Request body for `thumbnails`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest {
    expression: Value,
    file_format: &'static str,
    visualization_options: Value,
}

/// Response from `thumbnails`
#[derive(Debug, Deserialize)]
struct ThumbnailResponse {
    name: String,
}
