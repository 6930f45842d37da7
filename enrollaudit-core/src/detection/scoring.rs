//! Combined suspicion score.

/// Combines rule importances into one score in `[0, 1]`.
///
/// Treats each importance as an independent probability and returns the
/// probability that at least one holds: `1 - Π(1 - w)`. Adding a rule can
/// only raise the score, and the order of `importances` does not matter.
/// The result is rounded to four decimals.
pub fn combine<I>(importances: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let miss = importances
        .into_iter()
        .map(|weight| 1.0 - weight.clamp(0.0, 1.0))
        .product::<f64>();
    round4((1.0 - miss).clamp(0.0, 1.0))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
