//! Core analysis and detection modules

pub mod analysis;
pub mod analyzer;
pub mod classifier;
pub mod decoder;
pub mod dsp;

pub use analysis::{HeuristicAnalyzer, SpectralAnalyzer};
pub use analyzer::{AnalysisReport, AnalyzerBuilder, AnalyzerError, ImageAnalyzer, ScorerFailure};
pub use classifier::{
    ClassifierAdapter, ClassifierRegistry, RegistryBuilder, Scorer, ScorerError, ScorerOutcome,
    SharedScorer,
};
pub use decoder::{decode_image, ImageArray, PreprocessError, DEFAULT_TARGET_SIZE};
