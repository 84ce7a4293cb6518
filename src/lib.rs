//! ImageCheckr - Detect AI-generated images
//!
//! Fuses several independent, noisy signals into one verdict with a bounded
//! score and a confidence label, and keeps producing a well-formed result when
//! some signals are missing or the input is malformed.
//!
//! ## Features
//!
//! - **Spectral analysis**: entropy and low-frequency concentration of the 2-D spectrum
//! - **Heuristics**: file size, filename keywords, embedded EXIF/XMP/text metadata
//! - **Pluggable classifiers**: any `Fn(&ImageArray) -> Result<f64, ScorerError>` is a model
//! - **Bounded dispatch**: classifiers run in parallel, each under a timeout
//! - **Confidence from agreement**: dispersion between signals sets the label
//!
//! ## Module Structure
//!
//! - `core` - Analyzers, classifier adapter, image decoding and DSP utilities
//! - `cli` - Command-line interface
//! - `config` - Thresholds and signal toggles
//! - `detection` - Signals, fusion engine and result types
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imagecheckr::core::{ClassifierRegistry, ImageAnalyzer, ImageArray};
//!
//! let registry = ClassifierRegistry::builder()
//!     .with_fn("my-model", |_: &ImageArray| Ok(0.72))
//!     .build();
//!
//! let analyzer = ImageAnalyzer::builder()
//!     .registry(Arc::new(registry))
//!     .build()?;
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! let result = analyzer.analyze_bytes(&bytes, Some("photo.jpg")).result;
//!
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Confidence Bands
//!
//! | Std dev of signals | Confidence |
//! |--------------------|------------|
//! | < 0.15             | high       |
//! | 0.15 – 0.3         | medium     |
//! | ≥ 0.3              | low        |
//!
//! A round with no signal at all returns the fixed placeholder
//! `{aiGenerated: false, score: 0.45, confidence: low}`.

// Core analysis functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration
pub mod config;

// Signals, fusion and results
pub mod detection;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigBuilder, DetectionConfig, SignalKind};
pub use core::{
    decode_image, AnalysisReport, AnalyzerBuilder, ClassifierRegistry, ImageAnalyzer, ImageArray,
    Scorer, ScorerError,
};
pub use detection::{
    Confidence, DetectionDetails, DetectionResult, FusionEngine, FusionOutcome, Signal, SignalSource,
};
