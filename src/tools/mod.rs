/// Upper bound of every hazard and comfort score.
pub const MAX_SCORE: u32 = 100;

/// Round a raw score to the nearest integer and clamp it into 0..=100.
/// NaN maps to 0.
pub fn round_score(raw: f64) -> u32 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, MAX_SCORE as f64) as u32
}

/// Arithmetic mean of the values, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let (count, total) = values
        .into_iter()
        .fold((0usize, 0.0f64), |(count, total), value| {
            (count + 1, total + value.into())
        });
    if count == 0 {
        None
    } else {
        Some(total / count as f64)
    }
}
