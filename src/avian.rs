//! Avian-backed motor and the system that owns the physics step.
//!
//! The driver runs once per fixed tick for every character: it depenetrates,
//! probes the ground, then invokes the locomotion core's five phases in their
//! fixed order, sweeping the capsule with the resolved velocity in between.
//! All geometry lives here; the core only sees the [`CharacterMotor`]
//! boundary.

use crate::{
    CharacterController, StrideSystems,
    character::CharacterLocomotion,
    motor::{CharacterMotor, MotorCallbacks},
    prelude::*,
};
use avian3d::character_controller::move_and_slide::MoveHitData;
use bevy_ecs::{intern::Interned, schedule::ScheduleLabel};
use core::time::Duration;

pub(super) fn plugin(schedule: Interned<dyn ScheduleLabel>) -> impl Fn(&mut App) {
    move |app: &mut App| {
        app.add_systems(
            schedule,
            drive_characters.in_set(StrideSystems::MoveCharacters),
        );
    }
}

/// Grounding report and forced-unground window for one character.
#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct MotorState {
    /// Ground hit the character can stand on.
    pub stable_ground: Option<MoveHitData>,
    /// Any ground hit, walkable or not.
    pub any_ground: Option<MoveHitData>,
    /// Seconds the grounding probe stays suppressed.
    pub unground_remaining: f32,
    must_unground: bool,
}

/// Build the capsule for the given dimensions, its center offset `y_offset`
/// from the transform origin.
fn capsule_collider(radius: f32, height: f32, y_offset: f32) -> Collider {
    let length = (height - 2.0 * radius).max(0.0);
    let capsule = Collider::capsule(radius, length);
    if y_offset.abs() > f32::EPSILON {
        Collider::compound(vec![(Vec3::Y * y_offset, Rotation::default(), capsule)])
    } else {
        capsule
    }
}

struct AvianMotor<'a, 'w, 's> {
    cfg: &'a CharacterController,
    state: &'a mut MotorState,
    transform: &'a mut Transform,
    collider: &'a mut Collider,
    sweep: &'a MoveAndSlide<'w, 's>,
    velocity: Vec3,
    dt: Duration,
}

impl AvianMotor<'_, '_, '_> {
    fn must_unground(&self) -> bool {
        self.state.must_unground || self.state.unground_remaining > 0.0
    }

    fn depenetrate(&mut self) {
        let offset = self.sweep.depenetrate(
            &*self.collider,
            self.transform.translation,
            self.transform.rotation,
            &((&self.cfg.move_and_slide).into()),
            &self.cfg.filter,
        );
        self.transform.translation += offset;
    }

    fn probe_ground(&mut self) {
        if self.must_unground() {
            self.state.stable_ground = None;
            self.state.any_ground = None;
            return;
        }
        let cast_dir = Dir3::NEG_Y;
        let hit = self.sweep.cast_move(
            &*self.collider,
            self.transform.translation,
            self.transform.rotation,
            cast_dir * self.cfg.ground_distance,
            self.cfg.move_and_slide.skin_width,
            &self.cfg.filter,
        );
        self.state.any_ground = hit;
        self.state.stable_ground = hit.filter(|h| h.normal1.y >= self.cfg.min_walk_cos);
    }

    /// Sweep the capsule along the resolved velocity, then re-ground.
    fn integrate(&mut self) {
        let was_grounded = self.state.stable_ground.is_some();

        let mut config = self.cfg.move_and_slide.clone();
        if let Some(ground) = self.state.stable_ground {
            config.planes.push(Dir3::new_unchecked(ground.normal1));
        }
        let out = self.sweep.move_and_slide(
            &*self.collider,
            self.transform.translation,
            self.transform.rotation,
            self.velocity,
            self.dt,
            &config,
            &self.cfg.filter,
            |_| true,
        );
        self.transform.translation = out.position;
        self.velocity = out.projected_velocity;
        self.depenetrate();

        if was_grounded && !self.must_unground() {
            self.snap_to_ground();
        }
        self.probe_ground();
        self.velocity = self.velocity.clamp_length(0.0, self.cfg.max_speed);
    }

    fn snap_to_ground(&mut self) {
        let cast_dir = Dir3::NEG_Y;
        let hit = self.sweep.cast_move(
            &*self.collider,
            self.transform.translation,
            self.transform.rotation,
            cast_dir * self.cfg.ground_distance,
            self.cfg.move_and_slide.skin_width,
            &self.cfg.filter,
        );
        let Some(hit) = hit else {
            return;
        };
        if hit.intersects() || hit.normal1.y < self.cfg.min_walk_cos {
            return;
        }
        self.transform.translation += cast_dir * hit.distance;
        self.depenetrate();
    }

    fn finish_tick(&mut self, dt: f32) {
        self.state.must_unground = false;
        self.state.unground_remaining = (self.state.unground_remaining - dt).max(0.0);
    }
}

impl CharacterMotor for AvianMotor<'_, '_, '_> {
    fn is_stable_on_ground(&self) -> bool {
        self.state.stable_ground.is_some()
    }

    fn found_any_ground(&self) -> bool {
        self.state.any_ground.is_some()
    }

    fn ground_normal(&self) -> Vec3 {
        self.state
            .stable_ground
            .or(self.state.any_ground)
            .map(|hit| hit.normal1)
            .unwrap_or(Vec3::Y)
    }

    fn character_up(&self) -> Vec3 {
        self.transform.rotation * Vec3::Y
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn transient_position(&self) -> Vec3 {
        self.transform.translation
    }

    fn transient_rotation(&self) -> Quat {
        self.transform.rotation
    }

    fn set_capsule_dimensions(&mut self, radius: f32, height: f32, y_offset: f32) {
        *self.collider = capsule_collider(radius, height, y_offset);
    }

    fn force_unground(&mut self, duration: f32) {
        self.state.must_unground = true;
        self.state.unground_remaining = self.state.unground_remaining.max(duration);
        self.state.stable_ground = None;
        self.state.any_ground = None;
    }

    fn overlap_count(&mut self, position: Vec3, rotation: Quat) -> usize {
        let mut count = 0;
        self.sweep.query_pipeline.shape_intersections_callback(
            &*self.collider,
            position,
            rotation,
            &self.cfg.filter,
            |_| {
                count += 1;
                true
            },
        );
        count
    }
}

fn drive_characters(
    mut characters: Query<(
        &CharacterController,
        &mut CharacterLocomotion,
        &mut MotorState,
        &mut Transform,
        &mut Collider,
        &mut LinearVelocity,
    )>,
    time: Res<Time>,
    move_and_slide: MoveAndSlide,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    for (cfg, mut character, mut motor_state, mut transform, mut collider, mut linear_velocity) in
        &mut characters
    {
        character.tuning = cfg.tuning.clone();

        let mut motor = AvianMotor {
            cfg,
            state: motor_state.as_mut(),
            transform: transform.as_mut(),
            collider: collider.as_mut(),
            sweep: &move_and_slide,
            velocity: linear_velocity.0,
            dt: time.delta(),
        };
        motor.depenetrate();
        motor.probe_ground();

        character.before_update(&mut motor, dt);

        let mut rotation = motor.transient_rotation();
        character.update_rotation(&mut rotation, &mut motor, dt);
        motor.transform.rotation = rotation;

        let mut velocity = motor.velocity;
        character.update_velocity(&mut velocity, &mut motor, dt);
        motor.velocity = velocity;

        motor.integrate();

        character.post_grounding_update(&mut motor, dt);
        character.after_update(&mut motor, dt);

        motor.finish_tick(dt);
        linear_velocity.0 = motor.velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standing_capsule_is_centered_on_the_origin() {
        let collider = capsule_collider(0.5, 2.0, 0.0);
        let aabb = collider.aabb(Vec3::default(), Rotation::default());
        assert!((aabb.max.y - 1.0).abs() < 1e-5);
        assert!((aabb.min.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn offset_capsule_keeps_its_feet_at_the_standing_level() {
        // Crouch profile for a 2.0 tall character: 1.0 tall, shifted down 0.5.
        let collider = capsule_collider(0.5, 1.0, -0.5);
        let aabb = collider.aabb(Vec3::default(), Rotation::default());
        assert!((aabb.min.y + 1.0).abs() < 1e-5, "feet stay planted");
        assert!((aabb.max.y - 0.0).abs() < 1e-5);
    }
}
