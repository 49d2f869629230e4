//! Velocity resolution while standing or crouching on stable ground.

use crate::{
    LocomotionTuning, blend, character::RequestedInput, motor::CharacterMotor, prelude::*,
    stance::Stance,
};

/// Blend the current velocity toward the stance's target velocity.
///
/// The target hugs the slope: the requested move direction is re-projected
/// tangent to the ground normal before scaling by the stance speed. Sprint
/// only applies while standing.
pub(crate) fn resolve(
    velocity: &mut Vec3,
    motor: &dyn CharacterMotor,
    input: &RequestedInput,
    stance: Stance,
    tuning: &LocomotionTuning,
    dt: f32,
) {
    let (speed, response) = match stance {
        Stance::Stand if input.sprint => (
            tuning.walk_speed * tuning.sprint_speed_scale,
            tuning.walk_response,
        ),
        Stance::Stand => (tuning.walk_speed, tuning.walk_response),
        _ => (tuning.crouch_speed, tuning.crouch_response),
    };

    let direction = motor.direction_tangent_to_surface(input.movement, motor.ground_normal());
    let target = direction * input.movement.length() * speed;
    *velocity = blend::toward(*velocity, target, response, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::mock::MockMotor;

    fn tuning() -> LocomotionTuning {
        LocomotionTuning::default()
    }

    fn moving_input(movement: Vec3) -> RequestedInput {
        RequestedInput {
            movement,
            ..Default::default()
        }
    }

    #[test]
    fn blend_matches_closed_form_on_flat_ground() {
        let tuning = tuning();
        let motor = MockMotor::default();
        let input = moving_input(Vec3::X);
        let dt = 1.0 / 50.0;

        let mut velocity = Vec3::new(0.0, 0.0, 3.0);
        let start = velocity;
        resolve(&mut velocity, &motor, &input, Stance::Stand, &tuning, dt);

        let target = Vec3::X * tuning.walk_speed;
        let expected = (start - target).length() * (-tuning.walk_response * dt).exp();
        assert!(((velocity - target).length() - expected).abs() < 1e-3);
    }

    #[test]
    fn sprint_scales_standing_speed_only() {
        let tuning = tuning();
        let motor = MockMotor::default();
        let input = RequestedInput {
            movement: Vec3::X,
            sprint: true,
            ..Default::default()
        };

        // Converge long enough that velocity is at the target.
        let mut standing = Vec3::ZERO;
        let mut crouched = Vec3::ZERO;
        for _ in 0..600 {
            resolve(&mut standing, &motor, &input, Stance::Stand, &tuning, 0.016);
            resolve(&mut crouched, &motor, &input, Stance::Crouch, &tuning, 0.016);
        }

        assert!((standing.length() - tuning.walk_speed * tuning.sprint_speed_scale).abs() < 1e-2);
        assert!((crouched.length() - tuning.crouch_speed).abs() < 1e-2);
    }

    #[test]
    fn target_is_tangent_to_the_slope() {
        let tuning = tuning();
        let motor = MockMotor {
            ground_normal: Vec3::new(0.0, 1.0, 1.0).normalize(),
            ..MockMotor::default()
        };
        let input = moving_input(Vec3::NEG_Z);

        let mut velocity = Vec3::ZERO;
        for _ in 0..600 {
            resolve(&mut velocity, &motor, &input, Stance::Stand, &tuning, 0.016);
        }

        // Full walk speed along the slope, no component into it.
        assert!((velocity.length() - tuning.walk_speed).abs() < 1e-2);
        assert!(velocity.dot(motor.ground_normal).abs() < 1e-2);
        assert!(velocity.y > 0.0, "heading uphill along the surface");
    }

    #[test]
    fn zero_movement_settles_to_rest() {
        let tuning = tuning();
        let motor = MockMotor::default();
        let input = moving_input(Vec3::ZERO);

        let mut velocity = Vec3::X * 10.0;
        for _ in 0..600 {
            resolve(&mut velocity, &motor, &input, Stance::Stand, &tuning, 0.016);
        }
        assert!(velocity.length() < 1e-2);
    }
}
