// src/core/analyzer.rs
//
// High-level image analysis API with builder pattern.
// Runs the spectral, heuristic and classifier branches concurrently and
// fuses whatever signals come back.

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

use super::analysis::{HeuristicAnalysis, HeuristicAnalyzer, SpectralAnalysis, SpectralAnalyzer};
use super::classifier::{ClassifierAdapter, ClassifierRegistry, ScorerOutcome};
use super::decoder::{decode_image, ImageArray};
use crate::config::{ConfigError, DetectionConfig, SignalKind};
use crate::detection::{DetectionResult, FusionEngine, FusionOutcome, Signal};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A classifier that produced no signal this round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorerFailure {
    pub model: String,
    pub error: String,
}

/// Everything one analysis round produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub result: DetectionResult,
    pub outcome: FusionOutcome,
    /// Signals that entered fusion, classifiers first
    pub signals: Vec<Signal>,
    pub std_dev: Option<f64>,
    pub spectral: Option<SpectralAnalysis>,
    pub heuristic: Option<HeuristicAnalysis>,
    pub classifier_failures: Vec<ScorerFailure>,
}

impl AnalysisReport {
    /// Report for a round that hit an internal fault
    pub fn fail_closed() -> Self {
        Self {
            result: DetectionResult::fail_closed(),
            outcome: FusionOutcome::FailClosed,
            signals: Vec::new(),
            std_dev: None,
            spectral: None,
            heuristic: None,
            classifier_failures: Vec::new(),
        }
    }
}

/// Builder for ImageAnalyzer configuration
pub struct AnalyzerBuilder {
    config: DetectionConfig,
    registry: Arc<ClassifierRegistry>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: DetectionConfig::default(),
            registry: Arc::new(ClassifierRegistry::empty()),
        }
    }

    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a registry between analyzers; models load once for all of them
    pub fn registry(mut self, registry: Arc<ClassifierRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<ImageAnalyzer, AnalyzerError> {
        self.config.validate()?;

        let adapter = ClassifierAdapter::new(self.config.classifier.timeout());

        Ok(ImageAnalyzer {
            spectral: SpectralAnalyzer::new(self.config.spectral.clone()),
            heuristic: HeuristicAnalyzer::new(self.config.heuristic.clone()),
            fusion: FusionEngine::new(self.config.fusion.clone()),
            adapter,
            registry: self.registry,
            config: self.config,
        })
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Main image analyzer
pub struct ImageAnalyzer {
    config: DetectionConfig,
    registry: Arc<ClassifierRegistry>,
    adapter: ClassifierAdapter,
    spectral: SpectralAnalyzer,
    heuristic: HeuristicAnalyzer,
    fusion: FusionEngine,
}

impl ImageAnalyzer {
    /// Analyzer with default configuration and no classifiers
    pub fn new() -> Result<Self, AnalyzerError> {
        AnalyzerBuilder::new().build()
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClassifierRegistry {
        &self.registry
    }

    /// Decode `content` and run a full round.
    ///
    /// Bytes that do not decode still feed the heuristic branch; only the
    /// image-based signals are lost.
    pub fn analyze_bytes(&self, content: &[u8], filename: Option<&str>) -> AnalysisReport {
        let image = if self.needs_image() {
            match contain("decode", || decode_image(content, self.config.target_size)) {
                // A decoder panic is treated like undecodable input
                None => None,
                Some(Ok(image)) => Some(Arc::new(image)),
                Some(Err(e)) => {
                    log::warn!(
                        "Image decode failed for {}: {}",
                        filename.unwrap_or("<unnamed>"),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        self.analyze(content, filename, image)
    }

    /// Run one round over pre-decoded input
    pub fn analyze(
        &self,
        content: &[u8],
        filename: Option<&str>,
        image: Option<Arc<ImageArray>>,
    ) -> AnalysisReport {
        let image = image.as_ref();

        let branches = rayon::join(
            || contain("classifier", || self.run_classifiers(image)),
            || {
                rayon::join(
                    || contain("spectral", || self.run_spectral(image)),
                    || contain("heuristic", || self.run_heuristic(content, filename)),
                )
            },
        );
        let (Some(outcomes), (Some(spectral), Some(heuristic))) = branches else {
            return AnalysisReport::fail_closed();
        };

        let mut signals = Vec::new();
        let mut classifier_failures = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(value) => signals.push(Signal::classifier(outcome.model, value)),
                Err(e) => {
                    log::warn!("Classifier '{}' dropped from this round: {}", outcome.model, e);
                    classifier_failures.push(ScorerFailure {
                        model: outcome.model,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(spectral) = &spectral {
            signals.push(Signal::frequency(spectral.frequency_score));
        }

        // A heuristic score of zero means no cue fired and is not evidence
        if let Some(heuristic) = &heuristic {
            if heuristic.score > 0.0 {
                signals.push(Signal::heuristic(heuristic.score));
            }
        }

        let report = self.fusion.fuse_or_fail_closed(&signals, spectral.as_ref());

        AnalysisReport {
            result: report.result,
            outcome: report.outcome,
            signals,
            std_dev: report.std_dev,
            spectral,
            heuristic,
            classifier_failures,
        }
    }

    /// Verdict only
    pub fn detect(
        &self,
        content: &[u8],
        filename: Option<&str>,
        image: Option<Arc<ImageArray>>,
    ) -> DetectionResult {
        self.analyze(content, filename, image).result
    }

    fn needs_image(&self) -> bool {
        self.config.is_enabled(SignalKind::Frequency) || self.config.is_enabled(SignalKind::Classifier)
    }

    fn run_classifiers(&self, image: Option<&Arc<ImageArray>>) -> Vec<ScorerOutcome> {
        match image {
            Some(image) if self.config.is_enabled(SignalKind::Classifier) => {
                self.adapter.score_all(&self.registry, image)
            }
            _ => Vec::new(),
        }
    }

    fn run_spectral(&self, image: Option<&Arc<ImageArray>>) -> Option<SpectralAnalysis> {
        match image {
            Some(image) if self.config.is_enabled(SignalKind::Frequency) => {
                Some(self.spectral.analyze(image))
            }
            _ => None,
        }
    }

    fn run_heuristic(&self, content: &[u8], filename: Option<&str>) -> Option<HeuristicAnalysis> {
        if self.config.is_enabled(SignalKind::Heuristic) {
            Some(self.heuristic.analyze(content, filename))
        } else {
            None
        }
    }
}

/// Run one branch, turning a panic into `None`
fn contain<T>(branch: &str, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{} branch panicked: {}", branch, message);
            None
        }
    }
}
