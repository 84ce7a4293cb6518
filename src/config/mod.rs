//! Configuration module for ImageCheckr

mod settings;

pub use settings::{
    ClassifierConfig, ConfigBuilder, ConfigError, DetectionConfig, FusionConfig, HeuristicConfig,
    SignalKind, SpectralConfig, ENTROPY_NORMALIZER,
};
