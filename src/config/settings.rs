// src/config/settings.rs
//
// Tunable thresholds for every analyzer and for fusion.
// Defaults reproduce the documented constants exactly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Empirically chosen entropy normalizer for the frequency score.
///
/// Not a mathematical bound on the entropy; it is the one tunable constant of
/// the spectral analyzer and is never re-derived per image.
pub const ENTROPY_NORMALIZER: f64 = 8.0;

/// Families of signals that feed the fusion engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Classifier,
    Frequency,
    Heuristic,
}

impl SignalKind {
    pub fn all() -> Vec<Self> {
        vec![Self::Classifier, Self::Frequency, Self::Heuristic]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Classifier => "classifier",
            SignalKind::Frequency => "frequency",
            SignalKind::Heuristic => "heuristic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classifier" | "classifiers" | "model" | "models" => Some(Self::Classifier),
            "frequency" | "spectral" | "fft" => Some(Self::Frequency),
            "heuristic" | "heuristics" | "metadata" => Some(Self::Heuristic),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Spectral analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub entropy_normalizer: f64,
    /// Fraction of rows/columns (centered) counted as the low-frequency region
    pub center_fraction: f64,
    pub epsilon: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            entropy_normalizer: ENTROPY_NORMALIZER,
            center_fraction: 0.5,
            epsilon: 1e-8,
        }
    }
}

/// Heuristic analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub large_file_bytes: usize,
    pub large_file_weight: f64,
    pub small_file_bytes: usize,
    pub small_file_weight: f64,
    pub keywords: Vec<String>,
    pub keyword_weight: f64,
    pub check_metadata: bool,
    pub missing_metadata_weight: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            large_file_bytes: 1_000_000,
            large_file_weight: 0.10,
            small_file_bytes: 50_000,
            small_file_weight: 0.15,
            keywords: ["ai", "generated", "synthetic", "fake", "deepfake"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            keyword_weight: 0.30,
            check_metadata: true,
            missing_metadata_weight: 0.30,
        }
    }
}

/// Fusion thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Scores strictly above this are reported as AI-generated
    pub decision_threshold: f64,
    /// Dispersion below this maps to high confidence
    pub high_confidence_std: f64,
    /// Dispersion below this (and not high) maps to medium confidence
    pub medium_confidence_std: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
            high_confidence_std: 0.15,
            medium_confidence_std: 0.3,
        }
    }
}

/// Classifier dispatch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Bounded wait for a single scorer call
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Complete detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub spectral: SpectralConfig,
    pub heuristic: HeuristicConfig,
    pub fusion: FusionConfig,
    pub classifier: ClassifierConfig,
    /// Square size images are resized to before analysis
    pub target_size: u32,
    pub disabled_signals: Vec<SignalKind>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            spectral: SpectralConfig::default(),
            heuristic: HeuristicConfig::default(),
            fusion: FusionConfig::default(),
            classifier: ClassifierConfig::default(),
            target_size: crate::core::decoder::DEFAULT_TARGET_SIZE,
            disabled_signals: Vec::new(),
        }
    }
}

impl DetectionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_enabled(&self, kind: SignalKind) -> bool {
        !self.disabled_signals.contains(&kind)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spectral.entropy_normalizer > 0.0) {
            return Err(ConfigError::Invalid(
                "spectral.entropy_normalizer must be positive".to_string(),
            ));
        }
        if !(self.spectral.center_fraction > 0.0 && self.spectral.center_fraction <= 1.0) {
            return Err(ConfigError::Invalid(
                "spectral.center_fraction must be in (0, 1]".to_string(),
            ));
        }
        if self.heuristic.small_file_bytes > self.heuristic.large_file_bytes {
            return Err(ConfigError::Invalid(format!(
                "heuristic.small_file_bytes ({}) exceeds large_file_bytes ({})",
                self.heuristic.small_file_bytes, self.heuristic.large_file_bytes
            )));
        }
        if !(0.0..=1.0).contains(&self.fusion.decision_threshold) {
            return Err(ConfigError::Invalid(
                "fusion.decision_threshold must be in [0, 1]".to_string(),
            ));
        }
        if self.fusion.high_confidence_std > self.fusion.medium_confidence_std {
            return Err(ConfigError::Invalid(
                "fusion.high_confidence_std must not exceed medium_confidence_std".to_string(),
            ));
        }
        if self.target_size == 0 {
            return Err(ConfigError::Invalid("target_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for custom configurations
pub struct ConfigBuilder {
    config: DetectionConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }

    pub fn from_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn entropy_normalizer(mut self, normalizer: f64) -> Self {
        self.config.spectral.entropy_normalizer = normalizer;
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.heuristic.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn check_metadata(mut self, check: bool) -> Self {
        self.config.heuristic.check_metadata = check;
        self
    }

    pub fn decision_threshold(mut self, threshold: f64) -> Self {
        self.config.fusion.decision_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn classifier_timeout(mut self, timeout: Duration) -> Self {
        // Saturates: Duration::MAX means "wait as long as possible"
        self.config.classifier.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn target_size(mut self, size: u32) -> Self {
        self.config.target_size = size.max(1);
        self
    }

    pub fn disable(mut self, kind: SignalKind) -> Self {
        if !self.config.disabled_signals.contains(&kind) {
            self.config.disabled_signals.push(kind);
        }
        self
    }

    pub fn enable(mut self, kind: SignalKind) -> Self {
        self.config.disabled_signals.retain(|k| *k != kind);
        self
    }

    pub fn build(self) -> DetectionConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
