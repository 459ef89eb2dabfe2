/// Treats missing, zero, negative and non-finite amounts as "not set".
fn positive(amount: Option<f64>) -> Option<f64> {
    amount.filter(|v| v.is_finite() && *v > 0.0)
}

/// Fit between a job budget and a candidate's hourly rate, in `[0, 1]`.
///
/// Unset on either side counts as compatible. Within budget scores 1.0;
/// above budget decays as `budget / rate`.
pub fn rate_compatibility(budget: Option<f64>, rate: Option<f64>) -> f64 {
    match (positive(budget), positive(rate)) {
        (Some(budget), Some(rate)) if rate > budget => budget / rate,
        _ => 1.0,
    }
}

pub fn is_rate_compatible(budget: Option<f64>, rate: Option<f64>) -> bool {
    match (positive(budget), positive(rate)) {
        (Some(budget), Some(rate)) => rate <= budget,
        _ => true,
    }
}

/// `budget - rate` when both are set, else 0. Negative means over budget.
pub fn rate_difference(budget: Option<f64>, rate: Option<f64>) -> f64 {
    match (positive(budget), positive(rate)) {
        (Some(budget), Some(rate)) => budget - rate,
        _ => 0.0,
    }
}
