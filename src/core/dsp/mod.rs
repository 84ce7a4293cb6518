//! Digital signal processing utilities

pub mod fft;
pub mod stats;

pub use fft::{fft_shift, Fft2d};
pub use stats::{clamp01, mean, population_std_dev, round_to, shannon_entropy};
