//! Jump request latch and resolution.
//!
//! A jump request is edge-latched with a stopwatch: it stays pending across
//! ticks until it is consumed by a successful jump or expires after the
//! coyote window. The same window doubles as the grace period for jumping
//! shortly after walking off a ledge, gated so a jump can never grant a
//! second coyote jump.

use crate::{LocomotionTuning, character::RequestedInput, motor::CharacterMotor, prelude::*};
use bevy_time::Stopwatch;
use core::time::Duration;
use tracing::debug;

/// Timing state owned by the jump controller.
///
/// Reset conditions: `request` clears on consumption or when its stopwatch
/// outlives the coyote window; `since_ungrounded` resets on every landing and
/// every departure from stable ground; `ungrounded_due_to_jump` sets on a
/// successful jump and clears only on landing.
#[derive(Clone, Debug, Default, Reflect)]
pub struct JumpTiming {
    request: Option<Stopwatch>,
    since_ungrounded: Stopwatch,
    ungrounded_due_to_jump: bool,
}

impl JumpTiming {
    /// Latch a jump request, restarting the buffer window.
    pub fn request_jump(&mut self) {
        self.request = Some(Stopwatch::new());
    }

    pub fn is_requested(&self) -> bool {
        self.request.is_some()
    }

    /// Time spent without stable ground since last leaving it.
    pub fn time_since_ungrounded(&self) -> Duration {
        self.since_ungrounded.elapsed()
    }

    /// Whether the current airborne stretch began with a jump.
    pub fn ungrounded_due_to_jump(&self) -> bool {
        self.ungrounded_due_to_jump
    }

    /// Advance the airborne clock. Called once per tick while the motor
    /// reports no stable ground.
    pub(crate) fn tick_airborne(&mut self, dt: f32) {
        self.since_ungrounded.tick(Duration::from_secs_f32(dt));
    }

    pub(crate) fn on_landed(&mut self) {
        self.since_ungrounded.reset();
        self.ungrounded_due_to_jump = false;
    }

    pub(crate) fn on_left_ground(&mut self) {
        self.since_ungrounded.reset();
    }
}

/// Resolve a pending jump request against the current grounding state.
///
/// Runs every tick after ground/air velocity resolution. A successful jump
/// consumes the request, cancels any pending crouch, forces the motor off the
/// ground and raises vertical speed to at least `jump_speed` without ever
/// reducing a faster upward speed. A failed attempt ages the request and
/// drops it once it outlives the coyote window.
pub(crate) fn resolve(
    velocity: &mut Vec3,
    motor: &mut dyn CharacterMotor,
    timing: &mut JumpTiming,
    input: &mut RequestedInput,
    tuning: &LocomotionTuning,
    dt: f32,
) {
    let Some(request) = timing.request.as_mut() else {
        return;
    };

    let grounded = motor.is_stable_on_ground();
    let within_coyote = !timing.ungrounded_due_to_jump
        && timing.since_ungrounded.elapsed() <= tuning.coyote_time;

    if grounded || within_coyote {
        timing.request = None;
        timing.ungrounded_due_to_jump = true;
        input.crouch = false;
        motor.force_unground(0.0);

        let up = motor.character_up();
        let vertical_speed = velocity.dot(up);
        let target = vertical_speed.max(tuning.jump_speed);
        *velocity += up * (target - vertical_speed);
        debug!(vertical_speed = target, coyote = !grounded, "jump");
    } else {
        request.tick(Duration::from_secs_f32(dt));
        if request.elapsed() > tuning.coyote_time {
            timing.request = None;
        }
    }
}
