// src/detection/fusion.rs
//
// Ensemble fusion: mean of the available signals for the score, population
// standard deviation of the same signals for the confidence label.
// The engine is a pure function of its inputs.

use serde::Serialize;
use thiserror::Error;

use super::result::{
    Confidence, DetectionDetails, DetectionResult, FusionOutcome, Signal, SignalSource,
};
use crate::config::FusionConfig;
use crate::core::analysis::SpectralAnalysis;
use crate::core::dsp::{mean, population_std_dev, round_to};

const OUTPUT_DECIMALS: i32 = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FusionError {
    #[error("signal from {origin} has invalid value {value}")]
    InvalidSignal { origin: SignalSource, value: f64 },

    #[error("aggregate is not finite (mean={mean}, std={std_dev})")]
    NonFiniteAggregate { mean: f64, std_dev: f64 },
}

/// Fused verdict plus the bookkeeping behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionReport {
    pub result: DetectionResult,
    pub outcome: FusionOutcome,
    /// Unrounded population standard deviation; `None` without signals
    pub std_dev: Option<f64>,
    pub signal_count: usize,
}

impl FusionReport {
    pub fn fail_closed() -> Self {
        Self {
            result: DetectionResult::fail_closed(),
            outcome: FusionOutcome::FailClosed,
            std_dev: None,
            signal_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse whatever signals are present.
    ///
    /// The result is invariant under any permutation of `signals`.
    pub fn fuse(
        &self,
        signals: &[Signal],
        spectral: Option<&SpectralAnalysis>,
    ) -> Result<FusionReport, FusionError> {
        if let Some(bad) = signals
            .iter()
            .find(|s| !s.value.is_finite() || !(0.0..=1.0).contains(&s.value))
        {
            return Err(FusionError::InvalidSignal {
                origin: bad.source.clone(),
                value: bad.value,
            });
        }

        let details = DetectionDetails {
            spectral_entropy: spectral
                .map(|s| round_to(s.features.spectral_entropy, OUTPUT_DECIMALS))
                .unwrap_or(0.0),
            frequency_score: spectral
                .map(|s| round_to(s.frequency_score, OUTPUT_DECIMALS))
                .unwrap_or(0.0),
            models_agree: self.models_agree(signals),
        };

        // Sorting first makes the floating-point sums order-independent
        let mut values: Vec<f64> = signals.iter().map(|s| s.value).collect();
        values.sort_by(f64::total_cmp);

        let (final_score, std_dev) = match (mean(&values), population_std_dev(&values)) {
            (Some(m), Some(s)) => (m, s),
            _ => {
                log::debug!("No signals available, returning fallback result");
                return Ok(FusionReport {
                    result: DetectionResult::fallback(details),
                    outcome: FusionOutcome::Fallback,
                    std_dev: None,
                    signal_count: 0,
                });
            }
        };

        if !final_score.is_finite() || !std_dev.is_finite() {
            return Err(FusionError::NonFiniteAggregate {
                mean: final_score,
                std_dev,
            });
        }

        // A single signal has zero dispersion and therefore reports high confidence.
        // Known edge case, kept as-is pending a product decision.
        let confidence = Confidence::from_std_dev(std_dev, &self.config);

        log::debug!(
            "Fused {} signal(s): mean={:.4}, std={:.4}, confidence={}",
            values.len(),
            final_score,
            std_dev,
            confidence
        );

        Ok(FusionReport {
            result: DetectionResult {
                ai_generated: final_score > self.config.decision_threshold,
                score: round_to(final_score.clamp(0.0, 1.0), OUTPUT_DECIMALS),
                confidence,
                details,
            },
            outcome: FusionOutcome::Computed,
            std_dev: Some(std_dev),
            signal_count: values.len(),
        })
    }

    /// Fuse, turning any internal failure into the fail-closed default
    pub fn fuse_or_fail_closed(
        &self,
        signals: &[Signal],
        spectral: Option<&SpectralAnalysis>,
    ) -> FusionReport {
        self.fuse(signals, spectral).unwrap_or_else(|e| {
            log::error!("Fusion failed, returning fail-closed default: {}", e);
            FusionReport::fail_closed()
        })
    }

    /// True when every classifier signal sits on the same side of the
    /// decision threshold. Vacuously true for fewer than two classifiers.
    pub fn models_agree(&self, signals: &[Signal]) -> bool {
        let mut sides = signals
            .iter()
            .filter(|s| s.source.is_classifier())
            .map(|s| s.value > self.config.decision_threshold);

        match sides.next() {
            Some(first) => sides.all(|side| side == first),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FusionEngine {
        FusionEngine::default()
    }

    #[test]
    fn test_empty_signals_fallback() {
        let report = engine().fuse(&[], None).unwrap();
        assert_eq!(report.outcome, FusionOutcome::Fallback);
        assert!(!report.result.ai_generated);
        assert_eq!(report.result.score, 0.45);
        assert_eq!(report.result.confidence, Confidence::Low);
    }

    #[test]
    fn test_classifiers_plus_frequency() {
        let signals = vec![
            Signal::classifier("a", 0.8),
            Signal::classifier("b", 0.9),
            Signal::frequency(0.2),
        ];
        let report = engine().fuse(&signals, None).unwrap();

        assert_eq!(report.result.score, 0.633);
        assert!(report.result.ai_generated);
        assert_eq!(report.result.confidence, Confidence::Low);
        assert!(report.result.details.models_agree);
        assert!((report.std_dev.unwrap() - 0.3091).abs() < 1e-3);
    }

    #[test]
    fn test_single_signal_is_high_confidence() {
        let report = engine().fuse(&[Signal::heuristic(0.61234)], None).unwrap();
        assert_eq!(report.result.score, 0.612);
        assert_eq!(report.result.confidence, Confidence::High);
        assert_eq!(report.std_dev, Some(0.0));
    }

    #[test]
    fn test_disagreeing_models() {
        let signals = vec![Signal::classifier("a", 0.1), Signal::classifier("b", 0.9)];
        let report = engine().fuse(&signals, None).unwrap();

        assert!(!report.result.details.models_agree);
        assert_eq!(report.result.confidence, Confidence::Low);
        // 0.5 is not above the threshold
        assert!(!report.result.ai_generated);
    }

    #[test]
    fn test_models_agree_ignores_non_classifiers() {
        let signals = vec![
            Signal::classifier("a", 0.7),
            Signal::frequency(0.1),
            Signal::heuristic(0.2),
        ];
        assert!(engine().models_agree(&signals));
    }

    #[test]
    fn test_medium_confidence_band() {
        let signals = vec![Signal::classifier("a", 0.3), Signal::classifier("b", 0.7)];
        let report = engine().fuse(&signals, None).unwrap();
        // std = 0.2
        assert_eq!(report.result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_invalid_signal_fails_closed() {
        let signals = vec![
            Signal::classifier("a", 0.7),
            Signal {
                source: SignalSource::Frequency,
                value: f64::NAN,
            },
        ];

        assert!(matches!(
            engine().fuse(&signals, None),
            Err(FusionError::InvalidSignal { origin: SignalSource::Frequency, .. })
        ));

        let report = engine().fuse_or_fail_closed(&signals, None);
        assert_eq!(report.outcome, FusionOutcome::FailClosed);
        assert_eq!(report.result, DetectionResult::fail_closed());
    }

    #[test]
    fn test_out_of_range_signal_rejected() {
        let signals = vec![Signal {
            source: SignalSource::Heuristic,
            value: 1.2,
        }];
        assert!(engine().fuse(&signals, None).is_err());
    }
}
