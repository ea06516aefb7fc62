use serde::{Deserialize, Serialize};

/// Spatial mean of the per-pixel index difference `after - before`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeScore(pub f64);

impl ChangeScore {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Outcome of the change analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// The index dropped past the loss threshold
    PossibleIllegal,
    NoChange,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::PossibleIllegal => "possible-illegal",
            Classification::NoChange => "no-change",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final, immutable result of one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub score: ChangeScore,
    pub classification: Classification,
    pub details: String,
    pub image_url: String,
}
