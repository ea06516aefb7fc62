use std::sync::Arc;
use vegwatch_core::error::Result;
use vegwatch_core::models::AnalysisResult;
use vegwatch_core::ports::ImageryBackend;

use crate::assembler::ResultAssembler;
use crate::change::ChangeAnalyzer;
use crate::compositor::SceneCompositor;
use crate::geometry::GeometryValidator;
use crate::index::{VegetationIndexEngine, AFTER_BAND, BEFORE_BAND};
use crate::models::AnalysisRequest;
use crate::temporal::TemporalWindowParser;

/// Change detection pipeline orchestrating one analysis against an imagery backend
pub struct ChangeDetectionPipeline {
    backend: Arc<dyn ImageryBackend>,
}

impl ChangeDetectionPipeline {
    /// Create a new change detection pipeline
    pub fn new(backend: Arc<dyn ImageryBackend>) -> Self {
        Self { backend }
    }

    /// Run an analysis.
    ///
    /// Input is validated completely before the backend is contacted.
    pub async fn execute(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        // Phase 1: Validation
        let region = GeometryValidator::validate(&request.polygon)?;
        let windows = TemporalWindowParser::parse(request)?;

        let backend = self.backend.as_ref();
        tracing::debug!(
            backend = backend.name(),
            before = %windows.before,
            after = %windows.after,
            "Starting change analysis"
        );

        // Phase 2: Scene availability and compositing
        let compositor = SceneCompositor::new(backend);
        let before_query = SceneCompositor::query(&region, windows.before);
        let after_query = SceneCompositor::query(&region, windows.after);
        compositor.ensure_available(&before_query, &after_query).await?;

        let before = compositor.composite(&before_query).await?;
        let after = compositor.composite(&after_query).await?;

        // Phase 3: Vegetation index per period
        let index = VegetationIndexEngine::new(backend);
        let ndvi_before = index.ndvi(&before, BEFORE_BAND).await?;
        let ndvi_after = index.ndvi(&after, AFTER_BAND).await?;

        // Phase 4: Difference, reduction and classification
        let analyzer = ChangeAnalyzer::new(backend);
        let diff = analyzer.difference(&ndvi_after, &ndvi_before).await?;
        let score = analyzer.mean_change(&diff, &region).await?;
        let classification = ChangeAnalyzer::classify(score);

        tracing::info!(
            mean_diff = score.value(),
            classification = %classification,
            "Change analysis complete"
        );

        // Phase 5: Result with rendered difference image
        ResultAssembler::new(backend).assemble(&diff, &region, score, classification).await
    }
}
