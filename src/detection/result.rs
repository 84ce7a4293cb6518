//! Detection result types: signals, confidence labels and the final verdict

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{FusionConfig, SignalKind};

/// Where a signal came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "model")]
pub enum SignalSource {
    /// A named classifier from the registry
    Classifier(String),
    Frequency,
    Heuristic,
}

impl SignalSource {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalSource::Classifier(_) => SignalKind::Classifier,
            SignalSource::Frequency => SignalKind::Frequency,
            SignalSource::Heuristic => SignalKind::Heuristic,
        }
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, SignalSource::Classifier(_))
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Classifier(name) => write!(f, "classifier:{}", name),
            SignalSource::Frequency => write!(f, "frequency"),
            SignalSource::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// One bounded piece of evidence of synthetic origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub source: SignalSource,
    pub value: f64,
}

impl Signal {
    /// Finite values are clamped into [0, 1]; non-finite values are kept and
    /// rejected later by fusion.
    pub fn new(source: SignalSource, value: f64) -> Self {
        Self {
            source,
            value: if value.is_finite() { value.clamp(0.0, 1.0) } else { value },
        }
    }

    pub fn classifier(model: impl Into<String>, value: f64) -> Self {
        Self::new(SignalSource::Classifier(model.into()), value)
    }

    pub fn frequency(value: f64) -> Self {
        Self::new(SignalSource::Frequency, value)
    }

    pub fn heuristic(value: f64) -> Self {
        Self::new(SignalSource::Heuristic, value)
    }
}

/// Confidence label derived from signal dispersion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lower dispersion between signals means higher confidence
    pub fn from_std_dev(std_dev: f64, config: &FusionConfig) -> Self {
        match std_dev {
            s if s < config.high_confidence_std => Confidence::High,
            s if s < config.medium_confidence_std => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionDetails {
    pub spectral_entropy: f64,
    pub frequency_score: f64,
    pub models_agree: bool,
}

impl Default for DetectionDetails {
    fn default() -> Self {
        Self {
            spectral_entropy: 0.0,
            frequency_score: 0.0,
            models_agree: true,
        }
    }
}

/// Final verdict handed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub ai_generated: bool,
    /// Mean of the fused signals, rounded to 3 decimals
    pub score: f64,
    pub confidence: Confidence,
    pub details: DetectionDetails,
}

impl DetectionResult {
    /// Placeholder score meaning "no evidence could be gathered"
    pub const FALLBACK_SCORE: f64 = 0.45;

    /// Returned when no signal is available
    pub fn fallback(details: DetectionDetails) -> Self {
        Self {
            ai_generated: false,
            score: Self::FALLBACK_SCORE,
            confidence: Confidence::Low,
            details,
        }
    }

    /// Returned when an unexpected internal failure reaches the top of fusion
    pub fn fail_closed() -> Self {
        Self {
            ai_generated: false,
            score: 0.0,
            confidence: Confidence::Low,
            details: DetectionDetails::default(),
        }
    }
}

/// How a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionOutcome {
    /// Fused from at least one signal
    Computed,
    /// No signal available; fixed placeholder
    Fallback,
    /// Internal failure; fail-closed default
    FailClosed,
}

impl FusionOutcome {
    pub fn description(&self) -> &'static str {
        match self {
            FusionOutcome::Computed => "Computed from available signals",
            FusionOutcome::Fallback => "No signals available (placeholder)",
            FusionOutcome::FailClosed => "Internal failure (fail-closed default)",
        }
    }
}
