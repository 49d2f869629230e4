//! The locomotion core: authoritative character state, latched input and the
//! per-tick phase orchestration.
//!
//! One [`CharacterLocomotion`] owns everything the simulation mutates:
//! stance, velocity, jump timing and the latched intent. The motor owns
//! geometry and is reached only through the [`CharacterMotor`] boundary. A
//! snapshot of the state is captured before any of a tick's mutations and
//! committed at the end of the tick, so slide-entry decisions can key off
//! what the character was doing one full tick ago.

use crate::{
    LocomotionTuning, air, grounded,
    jump::{self, JumpTiming},
    motor::{CharacterMotor, MotorCallbacks},
    prelude::*,
    slide,
    stance::{Stance, StanceController},
};
use tracing::{debug, warn};

/// How a frame encodes the crouch key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum CrouchRequest {
    #[default]
    None,
    /// Flip the persisted crouch request (toggle bindings).
    Toggle,
    /// Drive the crouch request level directly (hold bindings).
    Set(bool),
}

/// Intent for one rendered frame, handed to
/// [`CharacterLocomotion::update_input`] at most once per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharacterInput {
    /// Look rotation the move axis is relative to.
    pub rotation: Quat,
    /// Raw move axis, x right / y forward, clamped to unit length.
    pub movement: Vec2,
    /// Jump key went down this frame.
    pub jump_pressed: bool,
    /// Jump key is currently down.
    pub jump_held: bool,
    pub crouch: CrouchRequest,
    pub sprint: bool,
}

/// Input after latching: move intent rotated into world space, crouch
/// resolved to a level, jump edges absorbed into [`JumpTiming`].
#[derive(Clone, Debug, Default, Reflect)]
pub struct RequestedInput {
    pub rotation: Quat,
    /// World-space move intent, magnitude at most one.
    pub movement: Vec3,
    pub jump_sustain: bool,
    pub crouch: bool,
    pub sprint: bool,
}

/// Snapshot of the simulation-owned character state.
#[derive(Clone, Copy, Debug, Default, Reflect)]
pub struct CharacterState {
    /// Stable ground contact as of the end of the tick.
    pub grounded: bool,
    pub stance: Stance,
    /// World-space linear velocity. Owned by the simulation; the motor only
    /// reads and applies it.
    pub velocity: Vec3,
    /// Net velocity change applied by the last velocity resolution.
    pub acceleration: Vec3,
}

/// The locomotion state machine for one character.
#[derive(Component, Clone, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct CharacterLocomotion {
    pub tuning: LocomotionTuning,
    pub state: CharacterState,
    /// State as it was one full tick ago. Committed in the after-update
    /// phase; read only by the slide-entry gate.
    pub last_state: CharacterState,
    tick_start: CharacterState,
    pub input: RequestedInput,
    pub jump: JumpTiming,
    stance_controller: StanceController,
}

impl CharacterLocomotion {
    pub fn new(tuning: LocomotionTuning) -> Self {
        Self {
            tuning,
            ..Default::default()
        }
    }

    /// Latch one frame of intent.
    ///
    /// The move axis is clamped to unit length and rotated into world space
    /// by the look rotation. Jump presses are edge-latched into the jump
    /// timing and survive until consumed or expired. Sprint cancels an
    /// active crouch on the spot, skipping the overlap check the normal
    /// uncrouch path performs.
    pub fn update_input(&mut self, input: &CharacterInput) {
        self.input.rotation = input.rotation;
        let planar = Vec3::new(input.movement.x, 0.0, -input.movement.y).clamp_length_max(1.0);
        self.input.movement = input.rotation * planar;

        self.input.jump_sustain = input.jump_held;
        if input.jump_pressed {
            self.jump.request_jump();
        }

        match input.crouch {
            CrouchRequest::None => {}
            CrouchRequest::Toggle => self.input.crouch = !self.input.crouch,
            CrouchRequest::Set(held) => self.input.crouch = held,
        }

        self.input.sprint = input.sprint;
        if input.sprint {
            self.input.crouch = false;
            if self.state.stance == Stance::Crouch {
                // The capsule grows back on the next sync, without the
                // overlap check the after-update path would run.
                self.state.stance = Stance::Stand;
            }
        }
    }

    fn resolve_grounded(&mut self, velocity: &mut Vec3, motor: &mut dyn CharacterMotor, dt: f32) {
        let moving = self.input.movement.length_squared() > 0.0;
        if self.state.stance == Stance::Crouch
            && moving
            && (self.last_state.stance == Stance::Stand || !self.last_state.grounded)
        {
            self.enter_slide(velocity, motor);
        }

        match self.state.stance {
            Stance::Slide => {
                let keep_sliding =
                    slide::resolve(velocity, &*motor, self.input.movement, &self.tuning, dt);
                if !keep_sliding {
                    self.state.stance = Stance::Crouch;
                    debug!("slide ended below end speed");
                }
            }
            stance => grounded::resolve(velocity, &*motor, &self.input, stance, &self.tuning, dt),
        }
    }

    /// Slide entry. Runs once per entry, keyed off the previous tick's
    /// snapshot: the decision is not re-evaluated while crouch stays held.
    fn enter_slide(&mut self, velocity: &mut Vec3, motor: &dyn CharacterMotor) {
        let normal = motor.ground_normal();
        if !self.last_state.grounded {
            // Landing into a slide: keep the fall's momentum by flattening
            // the last airborne velocity onto the new ground plane.
            *velocity = self.last_state.velocity.reject_from_normalized(normal);
        }
        let speed = velocity.length().max(self.tuning.slide_start_speed);
        let mut direction = motor.direction_tangent_to_surface(*velocity, normal);
        if direction == Vec3::ZERO {
            direction = motor.direction_tangent_to_surface(self.input.movement, normal);
        }
        *velocity = direction * speed;
        self.state.stance = Stance::Slide;
        debug!(speed, "slide");
    }
}

impl MotorCallbacks for CharacterLocomotion {
    fn before_update(&mut self, motor: &mut dyn CharacterMotor, _dt: f32) {
        self.tick_start = self.state;
        self.stance_controller
            .sync_capsule(self.state.stance, &self.tuning, motor);
        self.stance_controller.enter_crouch(
            &mut self.state.stance,
            self.input.crouch,
            &self.tuning,
            motor,
        );
    }

    fn update_rotation(&mut self, rotation: &mut Quat, motor: &mut dyn CharacterMotor, _dt: f32) {
        let up = motor.character_up();
        let forward = (self.input.rotation * Vec3::NEG_Z).reject_from_normalized(up);
        // Looking straight along the up axis leaves the facing untouched.
        if let Ok(direction) = Dir3::new(forward) {
            *rotation = Transform::IDENTITY.looking_to(direction, up).rotation;
        }
    }

    fn update_velocity(&mut self, velocity: &mut Vec3, motor: &mut dyn CharacterMotor, dt: f32) {
        let entry_velocity = *velocity;

        if motor.is_stable_on_ground() {
            self.resolve_grounded(velocity, motor, dt);
        } else {
            self.jump.tick_airborne(dt);
            air::resolve(velocity, &*motor, &self.input, &self.tuning, dt);
        }

        jump::resolve(
            velocity,
            motor,
            &mut self.jump,
            &mut self.input,
            &self.tuning,
            dt,
        );

        self.state.acceleration = *velocity - entry_velocity;
        self.state.velocity = *velocity;
        debug_assert!(velocity.is_finite(), "velocity resolution produced {velocity:?}");
        if !velocity.is_finite() {
            warn!(?velocity, "velocity went non-finite");
        }
    }

    fn post_grounding_update(&mut self, motor: &mut dyn CharacterMotor, _dt: f32) {
        let grounded = motor.is_stable_on_ground();
        if grounded && !self.state.grounded {
            self.jump.on_landed();
            debug!("landed");
        } else if !grounded && self.state.grounded {
            self.jump.on_left_ground();
        }
        self.state.grounded = grounded;

        if self.state.stance == Stance::Slide
            && !grounded
            && self.jump.time_since_ungrounded() > self.tuning.max_slide_air_time
        {
            self.state.stance = Stance::Crouch;
            debug!("slide ended airborne");
        }
    }

    fn after_update(&mut self, motor: &mut dyn CharacterMotor, _dt: f32) {
        self.stance_controller.try_stand(
            &mut self.state.stance,
            &mut self.input.crouch,
            &self.tuning,
            motor,
        );
        self.state.velocity = motor.velocity();
        self.last_state = self.tick_start;
    }
}
