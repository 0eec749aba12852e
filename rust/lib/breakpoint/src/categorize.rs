/// Index of the bucket `value` falls into.
///
/// Buckets are half-open with the boundary in the lower bucket:
/// `(-inf, t0]`, `(t0, t1]`, ..., `(t_last, +inf)`. Returns
/// `thresholds.len()` when no threshold is satisfied, which includes
/// `NaN` (it never compares `<=`).
pub fn bucket(value: f64, thresholds: &[f64]) -> usize {
    thresholds
        .iter()
        .position(|t| value <= *t)
        .unwrap_or(thresholds.len())
}

/// Map `value` to one of `states` using ascending `thresholds`.
///
/// `states` is expected to hold exactly `thresholds.len() + 1` labels.
/// If it holds fewer, values past the end fall back to the last state.
/// Returns `None` only when `states` is empty.
pub fn categorize<'a, S: AsRef<str>>(
    value: f64,
    states: &'a [S],
    thresholds: &[f64],
) -> Option<&'a str> {
    let idx = bucket(value, thresholds);
    states.get(idx).or(states.last()).map(|s| s.as_ref())
}
