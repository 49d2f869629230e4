//! Exponential velocity smoothing.
//!
//! Grounded movement approaches its target velocity by closing a constant
//! fraction of the remaining gap per unit of wall-clock time, so the feel is
//! identical at any tick rate. Higher response rates converge faster.

use crate::prelude::*;

/// Fraction of the gap closed over `dt` at the given response rate.
#[inline]
pub fn response_fraction(response: f32, dt: f32) -> f32 {
    1.0 - (-response * dt).exp()
}

/// Move `current` toward `target`, closing `response_fraction(response, dt)`
/// of the gap. The remaining error after the step is exactly
/// `|current - target| * e^(-response * dt)`.
#[inline]
pub fn toward(current: Vec3, target: Vec3, response: f32, dt: f32) -> Vec3 {
    current.lerp(target, response_fraction(response, dt))
}

/// Scalar variant of [`toward`].
#[inline]
pub fn toward_f32(current: f32, target: f32, response: f32, dt: f32) -> f32 {
    current + (target - current) * response_fraction(response, dt)
}
