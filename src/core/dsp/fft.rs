//! Two-dimensional FFT built from row and column passes

use rustfft::{num_complex::Complex, FftPlanner};

/// 2-D FFT computation over a row-major grid
pub struct Fft2d {
    planner: FftPlanner<f64>,
}

impl Fft2d {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Compute the complex 2-D spectrum of a real-valued `height x width` grid.
    ///
    /// Returns `None` when the grid is empty or `data` does not match the shape.
    pub fn complex_spectrum(
        &mut self,
        data: &[f64],
        width: usize,
        height: usize,
    ) -> Option<Vec<Complex<f64>>> {
        if width == 0 || height == 0 || data.len() != width * height {
            return None;
        }

        let mut buffer: Vec<Complex<f64>> = data.iter().map(|&v| Complex::new(v, 0.0)).collect();

        // Rows are contiguous, so one call transforms all of them
        let row_fft = self.planner.plan_fft_forward(width);
        row_fft.process(&mut buffer);

        // Columns go through a scratch buffer
        let col_fft = self.planner.plan_fft_forward(height);
        let mut column = vec![Complex::new(0.0, 0.0); height];
        for x in 0..width {
            for y in 0..height {
                column[y] = buffer[y * width + x];
            }
            col_fft.process(&mut column);
            for y in 0..height {
                buffer[y * width + x] = column[y];
            }
        }

        Some(buffer)
    }

    /// Magnitude spectrum with the zero frequency moved to the center
    pub fn shifted_magnitude(&mut self, data: &[f64], width: usize, height: usize) -> Option<Vec<f64>> {
        let spectrum = self.complex_spectrum(data, width, height)?;
        let magnitude: Vec<f64> = spectrum.iter().map(|c| c.norm()).collect();
        Some(fft_shift(&magnitude, width, height))
    }
}

impl Default for Fft2d {
    fn default() -> Self {
        Self::new()
    }
}

/// Swap quadrants so bin (0, 0) lands at (height / 2, width / 2).
///
/// Matches the usual `fftshift` convention for both odd and even sizes.
pub fn fft_shift<T: Copy>(data: &[T], width: usize, height: usize) -> Vec<T> {
    let row_offset = height - height / 2;
    let col_offset = width - width / 2;

    let mut shifted = Vec::with_capacity(data.len());
    for y in 0..height {
        let src_y = (y + row_offset) % height;
        for x in 0..width {
            let src_x = (x + col_offset) % width;
            shifted.push(data[src_y * width + src_x]);
        }
    }
    shifted
}
