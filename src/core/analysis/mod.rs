//! Image analysis algorithms
//!
//! Contains the two non-classifier signal producers:
//! - Spectral analysis (entropy and low-frequency concentration of the 2-D spectrum)
//! - Heuristic analysis (file size, filename keywords, embedded metadata)

mod heuristic;
mod spectral;

pub use heuristic::{
    inspect_metadata, match_keywords, HeuristicAnalysis, HeuristicAnalyzer, MetadataKind,
    MetadataStatus, SizeCue,
};
pub use spectral::{SpectralAnalysis, SpectralAnalyzer, SpectralError, SpectralFeatures};
