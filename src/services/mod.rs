pub mod catalog;
pub mod classifier;
pub mod diagnostics;
pub mod recommendations;
pub mod retry;

pub use catalog::{CatalogClient, TmdbCatalog};
pub use classifier::{build_classifier, MoodClassifier};
pub use diagnostics::{run_checks, DiagnosticsReport};
pub use recommendations::{RecommendationReport, RecommendationService, Recommendations};
