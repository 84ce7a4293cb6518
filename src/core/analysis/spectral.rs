// src/core/analysis/spectral.rs
//
// Frequency-domain analysis for synthetic image detection.
// Natural photographs concentrate energy at low frequencies and have a
// peaked log-magnitude spectrum; generated images tend toward flatter spectra.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SpectralConfig;
use crate::core::decoder::ImageArray;
use crate::core::dsp::{clamp01, shannon_entropy, Fft2d};

/// Features extracted from the centered magnitude spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectralFeatures {
    /// Entropy (nats) of the normalized log1p-magnitude distribution
    pub spectral_entropy: f64,
    /// Share of spectral energy inside the central low-frequency region
    pub center_energy_ratio: f64,
}

impl SpectralFeatures {
    /// Midpoint placeholder used when the spectrum cannot be computed.
    /// Not a detection judgment.
    pub const NEUTRAL: SpectralFeatures = SpectralFeatures {
        spectral_entropy: 0.5,
        center_energy_ratio: 0.5,
    };

    /// `clamp01((entropy / normalizer) * (1 - center_ratio))`
    pub fn frequency_score(&self, entropy_normalizer: f64) -> f64 {
        let score = (self.spectral_entropy / entropy_normalizer) * (1.0 - self.center_energy_ratio);
        if score.is_finite() {
            clamp01(score)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpectralError {
    #[error("spectrum could not be computed for a {width}x{height} image")]
    EmptySpectrum { width: usize, height: usize },

    #[error("image carries no spectral energy")]
    ZeroEnergy,

    #[error("non-finite value while computing {0}")]
    NonFinite(&'static str),
}

/// Spectral analysis results
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectralAnalysis {
    pub features: SpectralFeatures,
    pub frequency_score: f64,
    /// True when `features` is the neutral default rather than a measurement
    pub used_fallback: bool,
}

/// Spectral analyzer with configurable parameters
#[derive(Debug, Clone, Default)]
pub struct SpectralAnalyzer {
    config: SpectralConfig,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    /// Analyze an image; numerical failures fall back to the neutral features
    pub fn analyze(&self, image: &ImageArray) -> SpectralAnalysis {
        let (features, used_fallback) = match self.compute_features(image) {
            Ok(features) => (features, false),
            Err(e) => {
                log::warn!("Spectral analysis fell back to neutral features: {}", e);
                (SpectralFeatures::NEUTRAL, true)
            }
        };

        let frequency_score = features.frequency_score(self.config.entropy_normalizer);
        log::debug!(
            "Spectral: entropy={:.4}, center_ratio={:.4}, frequency_score={:.4}{}",
            features.spectral_entropy,
            features.center_energy_ratio,
            frequency_score,
            if used_fallback { " (fallback)" } else { "" }
        );

        SpectralAnalysis {
            features,
            frequency_score,
            used_fallback,
        }
    }

    /// Compute spectral entropy and center energy ratio
    pub fn compute_features(&self, image: &ImageArray) -> Result<SpectralFeatures, SpectralError> {
        let (width, height) = (image.width(), image.height());
        let intensity = image.intensity();

        let magnitude = Fft2d::new()
            .shifted_magnitude(&intensity, width, height)
            .ok_or(SpectralError::EmptySpectrum { width, height })?;

        if magnitude.iter().any(|m| !m.is_finite()) {
            return Err(SpectralError::NonFinite("magnitude spectrum"));
        }

        let log_magnitude: Vec<f64> = magnitude.iter().map(|m| m.ln_1p()).collect();
        let spectral_entropy = shannon_entropy(&log_magnitude).ok_or(SpectralError::ZeroEnergy)?;

        let center_energy_ratio = self.center_energy_ratio(&magnitude, width, height)?;

        Ok(SpectralFeatures {
            spectral_entropy,
            center_energy_ratio,
        })
    }

    /// Energy inside the centered region divided by total energy (+ epsilon)
    fn center_energy_ratio(
        &self,
        shifted_magnitude: &[f64],
        width: usize,
        height: usize,
    ) -> Result<f64, SpectralError> {
        let (row_start, row_end) = center_band(height, self.config.center_fraction);
        let (col_start, col_end) = center_band(width, self.config.center_fraction);

        let mut total = 0.0;
        let mut center = 0.0;
        for y in 0..height {
            let in_rows = y >= row_start && y < row_end;
            for x in 0..width {
                let energy = shifted_magnitude[y * width + x].powi(2);
                total += energy;
                if in_rows && x >= col_start && x < col_end {
                    center += energy;
                }
            }
        }

        if !total.is_finite() {
            return Err(SpectralError::NonFinite("spectral energy"));
        }
        if total <= 0.0 {
            return Err(SpectralError::ZeroEnergy);
        }

        Ok(clamp01(center / (total + self.config.epsilon)))
    }
}

/// Index range covering the middle `fraction` of `len` (h/4..3h/4 for one half)
fn center_band(len: usize, fraction: f64) -> (usize, usize) {
    let fraction = fraction.clamp(0.0, 1.0);
    let start = (len as f64 * (1.0 - fraction) / 2.0).floor() as usize;
    let end = (len as f64 * (1.0 + fraction) / 2.0).floor() as usize;
    (start.min(len), end.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grayscale(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> ImageArray {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        ImageArray::grayscale(width, height, data).unwrap()
    }

    /// Deterministic LCG so the test does not need an RNG crate
    fn pseudo_noise(width: usize, height: usize, seed: u64) -> ImageArray {
        let mut state = seed;
        let data = (0..width * height)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) as f32
            })
            .collect();
        ImageArray::grayscale(width, height, data).unwrap()
    }

    #[test]
    fn test_center_band() {
        assert_eq!(center_band(4, 0.5), (1, 3));
        assert_eq!(center_band(299, 0.5), (74, 224));
        assert_eq!(center_band(8, 1.0), (0, 8));
    }

    #[test]
    fn test_all_zero_image_uses_neutral_default() {
        let analyzer = SpectralAnalyzer::default();
        let image = grayscale(16, 16, |_, _| 0.0);

        assert_eq!(analyzer.compute_features(&image), Err(SpectralError::ZeroEnergy));

        let analysis = analyzer.analyze(&image);
        assert!(analysis.used_fallback);
        assert_eq!(analysis.features, SpectralFeatures::NEUTRAL);
        assert!((analysis.frequency_score - 0.5 / 8.0 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_image_is_pure_dc() {
        let analyzer = SpectralAnalyzer::default();
        let features = analyzer.compute_features(&grayscale(16, 16, |_, _| 0.8)).unwrap();

        assert!(features.spectral_entropy.abs() < 1e-9);
        assert!(features.center_energy_ratio > 0.99);
        assert!(features.frequency_score(8.0) < 1e-9);
    }

    #[test]
    fn test_noise_scores_above_smooth_gradient() {
        let analyzer = SpectralAnalyzer::default();

        let smooth = analyzer.analyze(&grayscale(64, 64, |x, _| x as f32 / 64.0));
        let noise = analyzer.analyze(&pseudo_noise(64, 64, 7));

        assert!(!smooth.used_fallback && !noise.used_fallback);
        assert!(smooth.features.center_energy_ratio > 0.9);
        assert!(noise.features.spectral_entropy > smooth.features.spectral_entropy);
        assert!(noise.frequency_score > smooth.frequency_score);
    }

    #[test]
    fn test_rgb_matches_equivalent_grayscale() {
        let analyzer = SpectralAnalyzer::default();
        let gray = pseudo_noise(12, 10, 3);
        let rgb_data: Vec<f32> = gray.data().iter().flat_map(|&v| [v, v, v]).collect();
        let rgb = ImageArray::rgb(12, 10, rgb_data).unwrap();

        let a = analyzer.compute_features(&gray).unwrap();
        let b = analyzer.compute_features(&rgb).unwrap();
        assert!((a.spectral_entropy - b.spectral_entropy).abs() < 1e-9);
        assert!((a.center_energy_ratio - b.center_energy_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_frequency_score_bounds() {
        let wide = SpectralFeatures {
            spectral_entropy: 40.0,
            center_energy_ratio: 0.0,
        };
        assert_eq!(wide.frequency_score(8.0), 1.0);

        let nan = SpectralFeatures {
            spectral_entropy: f64::NAN,
            center_energy_ratio: 0.2,
        };
        assert_eq!(nan.frequency_score(8.0), 0.0);
    }
}
