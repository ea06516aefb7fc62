mod analyze;

pub use analyze::AnalyzeService;
