//! Airborne velocity resolution: bounded air control and gravity.

use crate::{LocomotionTuning, character::RequestedInput, motor::CharacterMotor, prelude::*};

/// Apply one tick of air control and gravity.
///
/// Air control adds an acceleration impulse along the planar input direction,
/// guarded three ways: below the air-speed cap the resulting planar velocity
/// is clamped to the cap; above it, any force component that would add speed
/// along the current travel direction is projected out; and when the probe
/// sees ground nearby, force pushing into the slope is projected off the
/// obstruction axis so steep faces cannot be climbed by steering into them.
///
/// Gravity integrates last, scaled down while the jump-sustain input is held
/// and the character is still rising.
pub(crate) fn resolve(
    velocity: &mut Vec3,
    motor: &dyn CharacterMotor,
    input: &RequestedInput,
    tuning: &LocomotionTuning,
    dt: f32,
) {
    let up = motor.character_up();

    if input.movement.length_squared() > 0.0 {
        let planar_direction = input.movement.reject_from_normalized(up).normalize_or_zero();
        let planar_movement = planar_direction * input.movement.length();
        let current_planar = velocity.reject_from_normalized(up);

        let mut force = planar_movement * tuning.air_acceleration * dt;

        if current_planar.length() < tuning.air_speed {
            let capped = (current_planar + force).clamp_length_max(tuning.air_speed);
            force = capped - current_planar;
        } else if force.dot(current_planar) > 0.0 {
            force = force.reject_from_normalized(current_planar.normalize());
        }

        if motor.found_any_ground() {
            let obstruction = motor
                .ground_normal()
                .reject_from_normalized(up)
                .normalize_or_zero();
            if obstruction != Vec3::ZERO && force.dot(obstruction) < 0.0 {
                force = force.reject_from_normalized(obstruction);
            }
        }

        *velocity += force;
    }

    let vertical_speed = velocity.dot(up);
    let rising = vertical_speed > 0.0;
    let gravity = if input.jump_sustain && rising {
        tuning.gravity * tuning.jump_sustain_gravity_scale
    } else {
        tuning.gravity
    };
    *velocity += up * (gravity * dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::mock::MockMotor;

    fn tuning() -> LocomotionTuning {
        LocomotionTuning::default()
    }

    fn planar(v: Vec3) -> Vec3 {
        Vec3::new(v.x, 0.0, v.z)
    }

    fn moving_input(movement: Vec3) -> RequestedInput {
        RequestedInput {
            movement,
            ..Default::default()
        }
    }

    #[test]
    fn planar_speed_never_exceeds_the_cap_from_below() {
        let tuning = tuning();
        let motor = MockMotor::airborne();

        let starts = [
            Vec3::ZERO,
            Vec3::X * (tuning.air_speed - 0.5),
            Vec3::new(3.0, -10.0, 4.0),
        ];
        let inputs = [Vec3::X, Vec3::NEG_X, Vec3::new(0.7, 0.0, 0.7)];
        for start in starts {
            for dir in inputs {
                let mut velocity = start;
                resolve(&mut velocity, &motor, &moving_input(dir), &tuning, 0.05);
                assert!(
                    planar(velocity).length() <= tuning.air_speed + 1e-4,
                    "start {start:?} input {dir:?} reached {}",
                    planar(velocity).length()
                );
            }
        }
    }

    #[test]
    fn above_the_cap_input_cannot_add_forward_speed() {
        let tuning = tuning();
        let motor = MockMotor::airborne();
        let fast = Vec3::X * (tuning.air_speed * 2.0);

        let mut velocity = fast;
        resolve(&mut velocity, &motor, &moving_input(Vec3::X), &tuning, 0.016);

        // No gain along the travel direction; the redirect guard only allows
        // perpendicular steering.
        assert!(planar(velocity).dot(Vec3::X) <= fast.x + 1e-4);
    }

    #[test]
    fn above_the_cap_braking_still_works() {
        let tuning = tuning();
        let motor = MockMotor::airborne();
        let fast = Vec3::X * (tuning.air_speed * 2.0);

        let mut velocity = fast;
        resolve(&mut velocity, &motor, &moving_input(Vec3::NEG_X), &tuning, 0.016);

        assert!(planar(velocity).length() < fast.x);
    }

    #[test]
    fn force_into_a_nearby_slope_is_deflected() {
        let tuning = tuning();
        // Steep wall to the +X side: its normal points back along -X.
        let motor = MockMotor {
            stable_ground: false,
            any_ground: true,
            ground_normal: Vec3::new(-0.9, 0.3, 0.0).normalize(),
            ..MockMotor::default()
        };

        let mut velocity = Vec3::ZERO;
        resolve(&mut velocity, &motor, &moving_input(Vec3::X), &tuning, 0.016);

        assert!(
            planar(velocity).x.abs() < 1e-4,
            "push into the wall was not removed: {velocity:?}"
        );
    }

    #[test]
    fn sustain_softens_gravity_only_while_rising() {
        let tuning = tuning();
        let motor = MockMotor::airborne();
        let dt = 0.016;
        let sustained = RequestedInput {
            jump_sustain: true,
            ..Default::default()
        };

        let mut rising = Vec3::Y * 10.0;
        resolve(&mut rising, &motor, &sustained, &tuning, dt);
        let expected = 10.0 + tuning.gravity * tuning.jump_sustain_gravity_scale * dt;
        assert!((rising.y - expected).abs() < 1e-4);

        let mut falling = Vec3::Y * -10.0;
        resolve(&mut falling, &motor, &sustained, &tuning, dt);
        let expected = -10.0 + tuning.gravity * dt;
        assert!((falling.y - expected).abs() < 1e-4);
    }

    #[test]
    fn no_input_is_pure_gravity() {
        let tuning = tuning();
        let motor = MockMotor::airborne();
        let dt = 0.016;

        let mut velocity = Vec3::new(4.0, 2.0, -1.0);
        resolve(&mut velocity, &motor, &RequestedInput::default(), &tuning, dt);

        assert_eq!(planar(velocity), Vec3::new(4.0, 0.0, -1.0));
        assert!((velocity.y - (2.0 + tuning.gravity * dt)).abs() < 1e-4);
    }
}
