//! Slide physics: friction, slope acceleration and speed-preserving steering.

use crate::{LocomotionTuning, motor::CharacterMotor, prelude::*};

/// Advance a sliding character's velocity by one tick.
///
/// Friction here is a direct linear-in-dt damping term, not the exponential
/// blend the walk states use; the friction constant is tuned against that
/// form. Slope acceleration is gravity projected onto the ground plane, so
/// downslopes feed the slide and upslopes bleed it. Steering redirects
/// velocity toward the input direction but is clamped back to the pre-steer
/// speed, so input changes heading, never raw speed.
///
/// Returns `false` once the slide has decayed below the end-speed threshold.
pub(crate) fn resolve(
    velocity: &mut Vec3,
    motor: &dyn CharacterMotor,
    movement: Vec3,
    tuning: &LocomotionTuning,
    dt: f32,
) -> bool {
    let normal = motor.ground_normal();

    *velocity -= *velocity * (tuning.slide_friction * dt);

    let gravity = motor.character_up() * tuning.gravity;
    let slope_acceleration = gravity.reject_from_normalized(normal);
    *velocity += slope_acceleration * dt;

    let steer_direction = motor.direction_tangent_to_surface(movement, normal);
    if steer_direction != Vec3::ZERO {
        let speed = velocity.length();
        let target = steer_direction * speed;
        let steer_force = (target - *velocity) * (tuning.slide_steer_acceleration * dt);
        *velocity = (*velocity + steer_force).clamp_length_max(speed);
    }

    velocity.length() >= tuning.slide_end_speed
}
