//! Trailing-window mean and standard deviation.

/// Apply `f` to every full trailing window of `window` values.
///
/// Windows that are incomplete or contain a NaN produce `None`.
fn rolling_apply(
    values: &[f64],
    window: usize,
    f: impl Fn(&[f64]) -> Option<f64>,
) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if window == 0 || n < window {
        return out;
    }

    for end in window..=n {
        let slice = &values[end - window..end];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[end - 1] = f(slice);
    }
    out
}

/// Rolling arithmetic mean.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Rolling standard deviation with `ddof` delta degrees of freedom
/// (0 = population, 1 = sample).
///
/// A window of identical values reports exactly 0.0, so callers can test
/// for a degenerate spread without an epsilon.
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<Option<f64>> {
    rolling_apply(values, window, |w| {
        if w.len() <= ddof {
            return None;
        }
        let first = w[0];
        if w.iter().all(|&v| v == first) {
            return Some(0.0);
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let ss: f64 = w.iter().map(|v| (v - mean).powi(2)).sum();
        Some((ss / (w.len() - ddof) as f64).sqrt())
    })
}
