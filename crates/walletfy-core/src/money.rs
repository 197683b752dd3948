//! Monetary rounding

/// Round to cents, half away from zero
///
/// Negative zero is normalized to zero so it serializes as `0.0`.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    // Decimal half-cents like 1.005 land just short of .5 once scaled
    let nudged = scaled + scaled.signum() * scaled.abs() * 4.0 * f64::EPSILON;
    nudged.round() / 100.0 + 0.0
}
