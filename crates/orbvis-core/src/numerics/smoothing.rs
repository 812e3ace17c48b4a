const TRUNCATE_SIGMAS: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SmoothingError {
    #[error("gaussian sigma must be finite and >= 0, got {value}")]
    InvalidSigma { value: f64 },
    #[error("smoothing input must contain finite values, index {index} got {value}")]
    NonFiniteValue { index: usize, value: f64 },
}

/// Gaussian filter over equally spaced samples, `sigma` in sample units.
///
/// The kernel is truncated at four standard deviations and the signal is
/// extended by mirror reflection (`d c b a | a b c d | d c b a`), so a
/// constant signal stays constant up to the boundary. A zero sigma returns the
/// input unchanged.
pub fn gaussian_filter1d(values: &[f64], sigma: f64) -> Result<Vec<f64>, SmoothingError> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(SmoothingError::InvalidSigma { value: sigma });
    }
    if let Some((index, value)) = values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(SmoothingError::NonFiniteValue { index, value });
    }
    if sigma == 0.0 || values.len() < 2 {
        return Ok(values.to_vec());
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let len = values.len() as isize;

    let smoothed = (0..len)
        .map(|center| {
            kernel
                .iter()
                .enumerate()
                .map(|(offset, weight)| {
                    let source = reflect_index(center + offset as isize - radius, len);
                    weight * values[source]
                })
                .sum()
        })
        .collect();

    Ok(smoothed)
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE_SIGMAS * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|weight| weight / total).collect()
}

fn reflect_index(index: isize, len: isize) -> usize {
    let period = 2 * len;
    let folded = index.rem_euclid(period);
    let reflected = if folded >= len {
        period - 1 - folded
    } else {
        folded
    };
    reflected as usize
}
