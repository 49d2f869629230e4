#![doc = include_str!("../readme.md")]

/// Everything you need to get started with `bevy_stride`
pub mod prelude {
    pub(crate) use {
        avian3d::prelude::*,
        bevy_app::prelude::*,
        bevy_ecs::prelude::*,
        bevy_enhanced_input::prelude::*,
        bevy_math::prelude::*,
        bevy_reflect::prelude::*,
        bevy_time::prelude::*,
        bevy_transform::prelude::*,
        bevy_utils::prelude::*,
    };

    pub use crate::{
        CharacterController, LocomotionTuning, StridePlugin, StrideSystems,
        character::{CharacterInput, CharacterLocomotion, CharacterState, CrouchRequest},
        input::{Crouch, CrouchMode, Jump, Movement, OrientationSource, OrientationSourceOf, Sprint},
        stance::Stance,
    };
}

use crate::{avian::MotorState, character::CharacterLocomotion, input::AccumulatedInput, prelude::*};
use bevy_ecs::{
    intern::Interned, lifecycle::HookContext,
    relationship::RelationshipSourceCollection as _, schedule::ScheduleLabel, world::DeferredWorld,
};
use core::time::Duration;

mod air;
pub mod avian;
pub mod blend;
pub mod character;
mod grounded;
pub mod input;
pub mod jump;
pub mod motor;
mod slide;
pub mod stance;

/// Also requires you to add [`PhysicsPlugins`] and [`EnhancedInputPlugin`] to work properly.
pub struct StridePlugin {
    schedule: Interned<dyn ScheduleLabel>,
}

impl StridePlugin {
    /// Create a new plugin in the given schedule. The default is [`FixedPostUpdate`].
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
        }
    }
}

impl Default for StridePlugin {
    fn default() -> Self {
        Self {
            schedule: FixedPostUpdate.intern(),
        }
    }
}

impl Plugin for StridePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            self.schedule,
            (StrideSystems::MoveCharacters)
                .chain()
                .in_set(PhysicsSystems::First),
        )
        .add_plugins((input::plugin, avian::plugin(self.schedule)));
    }
}

/// System set used by all systems of `bevy_stride`.
#[derive(SystemSet, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum StrideSystems {
    MoveCharacters,
}

/// Movement tuning consumed by the locomotion core each tick.
///
/// Speeds are in units per second, response rates are exponential-smoothing
/// rates (a higher value closes the gap to the target velocity faster,
/// independent of tick rate). Gravity is signed along the up axis.
#[derive(Clone, Reflect, Debug)]
pub struct LocomotionTuning {
    pub walk_speed: f32,
    pub crouch_speed: f32,
    /// Walk speed multiplier while sprinting. Sprint only applies standing.
    pub sprint_speed_scale: f32,
    pub walk_response: f32,
    pub crouch_response: f32,
    /// Planar speed cap air control accelerates up to.
    pub air_speed: f32,
    pub air_acceleration: f32,
    pub jump_speed: f32,
    /// Gravity scale while the jump input is held and the character rises.
    pub jump_sustain_gravity_scale: f32,
    pub gravity: f32,
    /// Grace window for jumping after leaving the ground; also how long a
    /// buffered jump request stays latched.
    pub coyote_time: Duration,
    /// Entry speed floor when a slide starts.
    pub slide_start_speed: f32,
    /// Below this speed a slide drops back to a crouch.
    pub slide_end_speed: f32,
    /// Linear-in-dt slide damping factor.
    pub slide_friction: f32,
    pub slide_steer_acceleration: f32,
    /// How long a slide may stay airborne before it drops back to a crouch.
    pub max_slide_air_time: Duration,
    pub capsule_radius: f32,
    pub standing_height: f32,
    pub crouch_height: f32,
}

impl Default for LocomotionTuning {
    fn default() -> Self {
        Self {
            walk_speed: 20.0,
            crouch_speed: 7.0,
            sprint_speed_scale: 1.5,
            walk_response: 25.0,
            crouch_response: 20.0,
            air_speed: 15.0,
            air_acceleration: 70.0,
            jump_speed: 20.0,
            jump_sustain_gravity_scale: 0.4,
            gravity: -90.0,
            coyote_time: Duration::from_millis(150),
            slide_start_speed: 25.0,
            slide_end_speed: 15.0,
            slide_friction: 0.8,
            slide_steer_acceleration: 5.0,
            max_slide_air_time: Duration::from_millis(250),
            capsule_radius: 0.5,
            standing_height: 2.0,
            crouch_height: 1.0,
        }
    }
}

#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
#[require(
    AccumulatedInput,
    CharacterLocomotion,
    MotorState,
    TranslationInterpolation,
    RigidBody = RigidBody::Kinematic,
    Collider = Collider::capsule(0.5, 1.0),
    CustomPositionIntegration,
    Transform,
    SpeculativeMargin::ZERO,
)]
#[component(on_add = CharacterController::on_add)]
pub struct CharacterController {
    pub tuning: LocomotionTuning,
    pub crouch_mode: CrouchMode,
    pub filter: SpatialQueryFilter,
    /// How far below the capsule the grounding probe reaches.
    pub ground_distance: f32,
    /// Minimum ground-normal cosine against the up axis that counts as
    /// stable, walkable ground.
    pub min_walk_cos: f32,
    /// Safety ceiling applied after collision projection.
    pub max_speed: f32,
    pub move_and_slide: MoveAndSlideConfig,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            tuning: LocomotionTuning::default(),
            crouch_mode: CrouchMode::default(),
            filter: SpatialQueryFilter::default(),
            ground_distance: 0.05,
            min_walk_cos: 0.766,
            max_speed: 100.0,
            move_and_slide: MoveAndSlideConfig {
                skin_width: 0.0075,
                ..default()
            },
        }
    }
}

impl CharacterController {
    pub fn on_add(mut world: DeferredWorld, ctx: HookContext) {
        {
            let Some(mut controller) = world.get_mut::<Self>(ctx.entity) else {
                return;
            };
            controller.filter.excluded_entities.add(ctx.entity);
        }

        let tuning = {
            let Some(controller) = world.get::<Self>(ctx.entity) else {
                return;
            };
            controller.tuning.clone()
        };
        if let Some(mut locomotion) = world.get_mut::<CharacterLocomotion>(ctx.entity) {
            locomotion.tuning = tuning;
        }
    }
}
