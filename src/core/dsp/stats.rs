//! Statistical helpers shared by the analyzers and the fusion engine

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
///
/// A single value has zero deviation.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    let mu = mean(data)?;
    let variance = data.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Shannon entropy (nats) of non-negative weights after normalizing them to sum to one.
///
/// Returns `None` when the weights sum to zero or contain a non-finite or
/// negative value.
pub fn shannon_entropy(weights: &[f64]) -> Option<f64> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }

    let total: f64 = weights.iter().sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let entropy = weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / total;
            -p * p.ln()
        })
        .sum::<f64>();

    Some(entropy.max(0.0))
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Clamp into the unit interval
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
