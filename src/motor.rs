//! Boundary contract between the locomotion core and the kinematic motor.
//!
//! The motor owns collision geometry: it sweeps the capsule, reports ground
//! contact, and executes shape changes. The locomotion core never touches
//! geometry directly; it reads the motor's grounding report and issues
//! capsule/unground requests through [`CharacterMotor`]. The host that owns
//! the physics step drives the core through [`MotorCallbacks`], invoking the
//! five phases in a fixed order once per tick.

use crate::prelude::*;

/// Queries and commands the locomotion core may exchange with the motor.
///
/// Implementations report the grounding state resolved at the start of the
/// current tick; [`force_unground`](CharacterMotor::force_unground) must make
/// the motor drop that contact immediately and suppress re-grounding for the
/// given duration (zero means "just this tick").
pub trait CharacterMotor {
    /// Stable contact with a walkable surface.
    fn is_stable_on_ground(&self) -> bool;

    /// Any ground detected by the probe, walkable or not.
    fn found_any_ground(&self) -> bool;

    /// Normal of the probed ground. Only meaningful while some ground was
    /// found; implementations return the up axis otherwise.
    fn ground_normal(&self) -> Vec3;

    /// The character's local up axis.
    fn character_up(&self) -> Vec3;

    /// Velocity as the motor currently carries it.
    fn velocity(&self) -> Vec3;

    /// Position the motor is integrating this tick.
    fn transient_position(&self) -> Vec3;

    /// Rotation the motor is integrating this tick.
    fn transient_rotation(&self) -> Quat;

    /// Swap the capsule to `height` tall with the given radius, its center
    /// offset `y_offset` along the up axis from the transform origin.
    fn set_capsule_dimensions(&mut self, radius: f32, height: f32, y_offset: f32);

    /// Drop ground contact now and stay airborne for at least `duration`
    /// seconds.
    fn force_unground(&mut self, duration: f32);

    /// Number of colliders overlapping the current capsule at the given pose.
    fn overlap_count(&mut self, position: Vec3, rotation: Quat) -> usize;

    /// Re-project `direction` to lie in the plane of `surface_normal`,
    /// turning around the character's up axis. Returns a unit vector, or zero
    /// for a degenerate input.
    fn direction_tangent_to_surface(&self, direction: Vec3, surface_normal: Vec3) -> Vec3 {
        let right = direction.cross(self.character_up());
        surface_normal.cross(right).normalize_or_zero()
    }
}

/// The five callbacks the motor's owner invokes, in exactly this order, once
/// per physics tick. No phase may run concurrently with another for the same
/// character, and no phase may be skipped.
pub trait MotorCallbacks {
    /// Snapshot capture and stance transitions that must precede movement.
    fn before_update(&mut self, motor: &mut dyn CharacterMotor, dt: f32);

    /// Resolve the facing rotation for this tick.
    fn update_rotation(&mut self, rotation: &mut Quat, motor: &mut dyn CharacterMotor, dt: f32);

    /// Resolve the velocity the motor should integrate this tick.
    fn update_velocity(&mut self, velocity: &mut Vec3, motor: &mut dyn CharacterMotor, dt: f32);

    /// Runs after the motor has moved and re-probed the ground.
    fn post_grounding_update(&mut self, motor: &mut dyn CharacterMotor, dt: f32);

    /// Late stance settling and state commit.
    fn after_update(&mut self, motor: &mut dyn CharacterMotor, dt: f32);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Scriptable motor for driving the core without a physics world.
    #[derive(Debug, Clone)]
    pub(crate) struct MockMotor {
        pub stable_ground: bool,
        pub any_ground: bool,
        pub ground_normal: Vec3,
        pub up: Vec3,
        pub velocity: Vec3,
        pub position: Vec3,
        pub rotation: Quat,
        /// Result the next overlap query reports.
        pub overlaps: usize,
        /// Every capsule request, in order.
        pub capsule_log: Vec<(f32, f32, f32)>,
        pub unground_requests: usize,
        pub overlap_queries: usize,
    }

    impl Default for MockMotor {
        fn default() -> Self {
            Self {
                stable_ground: true,
                any_ground: true,
                ground_normal: Vec3::Y,
                up: Vec3::Y,
                velocity: Vec3::ZERO,
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                overlaps: 0,
                capsule_log: Vec::new(),
                unground_requests: 0,
                overlap_queries: 0,
            }
        }
    }

    impl MockMotor {
        pub fn airborne() -> Self {
            Self {
                stable_ground: false,
                any_ground: false,
                ..Self::default()
            }
        }

        pub fn last_capsule(&self) -> Option<(f32, f32, f32)> {
            self.capsule_log.last().copied()
        }
    }

    impl CharacterMotor for MockMotor {
        fn is_stable_on_ground(&self) -> bool {
            self.stable_ground
        }

        fn found_any_ground(&self) -> bool {
            self.any_ground
        }

        fn ground_normal(&self) -> Vec3 {
            self.ground_normal
        }

        fn character_up(&self) -> Vec3 {
            self.up
        }

        fn velocity(&self) -> Vec3 {
            self.velocity
        }

        fn transient_position(&self) -> Vec3 {
            self.position
        }

        fn transient_rotation(&self) -> Quat {
            self.rotation
        }

        fn set_capsule_dimensions(&mut self, radius: f32, height: f32, y_offset: f32) {
            self.capsule_log.push((radius, height, y_offset));
        }

        fn force_unground(&mut self, _duration: f32) {
            self.stable_ground = false;
            self.any_ground = false;
            self.unground_requests += 1;
        }

        fn overlap_count(&mut self, _position: Vec3, _rotation: Quat) -> usize {
            self.overlap_queries += 1;
            self.overlaps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{mock::MockMotor, *};

    #[test]
    fn tangent_follows_slope_and_keeps_unit_length() {
        let motor = MockMotor::default();
        // 45 degree slope rising along -Z.
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let tangent = motor.direction_tangent_to_surface(Vec3::NEG_Z, normal);
        assert!((tangent.length() - 1.0).abs() < 1e-5);
        assert!(tangent.dot(normal).abs() < 1e-5);
        // Still heading -Z-ish, now climbing.
        assert!(tangent.z < 0.0 && tangent.y > 0.0);
    }

    #[test]
    fn tangent_on_flat_ground_is_the_direction_itself() {
        let motor = MockMotor::default();
        let tangent = motor.direction_tangent_to_surface(Vec3::X, Vec3::Y);
        assert!((tangent - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn tangent_of_degenerate_direction_is_zero() {
        let motor = MockMotor::default();
        assert_eq!(
            motor.direction_tangent_to_surface(Vec3::ZERO, Vec3::Y),
            Vec3::ZERO
        );
        // Direction parallel to up has no planar component to redirect.
        assert_eq!(
            motor.direction_tangent_to_surface(Vec3::Y, Vec3::Y),
            Vec3::ZERO
        );
    }
}
