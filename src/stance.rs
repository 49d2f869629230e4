//! Stance state machine and capsule management.
//!
//! The stance gates which velocity-resolution rules run each tick. Crouch
//! entry shrinks the capsule immediately; standing back up is optimistic: the
//! capsule grows first, an overlap query checks the new pose, and on any hit
//! the whole attempt reverts so the character cannot stand up into a ceiling.
//! Slide shares the crouched capsule.

use crate::{LocomotionTuning, motor::CharacterMotor, prelude::*};
use tracing::debug;

/// Discrete movement mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum Stance {
    #[default]
    Stand,
    Crouch,
    Slide,
}

impl Stance {
    /// Whether this stance uses the crouched capsule.
    pub fn is_low(self) -> bool {
        matches!(self, Stance::Crouch | Stance::Slide)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
enum CapsuleProfile {
    Standing,
    Crouched,
}

fn profile_for(stance: Stance) -> CapsuleProfile {
    if stance.is_low() {
        CapsuleProfile::Crouched
    } else {
        CapsuleProfile::Standing
    }
}

/// (radius, height, center offset along up from the transform origin).
///
/// The crouched capsule keeps its feet planted: the origin stays at the
/// standing capsule's center, so the shorter shape shifts down by half the
/// height difference.
fn dimensions(profile: CapsuleProfile, tuning: &LocomotionTuning) -> (f32, f32, f32) {
    match profile {
        CapsuleProfile::Standing => (tuning.capsule_radius, tuning.standing_height, 0.0),
        CapsuleProfile::Crouched => (
            tuning.capsule_radius,
            tuning.crouch_height,
            (tuning.crouch_height - tuning.standing_height) / 2.0,
        ),
    }
}

/// Owns every capsule-resize request the simulation issues. No other code
/// path may change the motor's capsule.
#[derive(Clone, Debug, Default, Reflect)]
pub struct StanceController {
    applied: Option<CapsuleProfile>,
}

impl StanceController {
    fn apply(
        &mut self,
        profile: CapsuleProfile,
        tuning: &LocomotionTuning,
        motor: &mut dyn CharacterMotor,
    ) {
        let (radius, height, y_offset) = dimensions(profile, tuning);
        motor.set_capsule_dimensions(radius, height, y_offset);
        self.applied = Some(profile);
    }

    /// Make the capsule match the current stance, without any overlap check.
    ///
    /// This is the path that services the sprint-cancel override: a stance
    /// forced to Stand at input time grows the capsule here, ceiling or not.
    pub(crate) fn sync_capsule(
        &mut self,
        stance: Stance,
        tuning: &LocomotionTuning,
        motor: &mut dyn CharacterMotor,
    ) {
        let profile = profile_for(stance);
        if self.applied != Some(profile) {
            self.apply(profile, tuning, motor);
        }
    }

    /// Stand → Crouch, resolved in the pre-update phase.
    pub(crate) fn enter_crouch(
        &mut self,
        stance: &mut Stance,
        crouch_requested: bool,
        tuning: &LocomotionTuning,
        motor: &mut dyn CharacterMotor,
    ) {
        if crouch_requested && *stance == Stance::Stand {
            *stance = Stance::Crouch;
            self.apply(CapsuleProfile::Crouched, tuning, motor);
            debug!("crouch");
        }
    }

    /// Crouch → Stand, resolved in the after-update phase.
    ///
    /// Grows the capsule, then queries for overlaps at the motor's transient
    /// pose. Any hit reverts the capsule, keeps the stance crouched and
    /// re-asserts the crouch request so the attempt repeats only once the
    /// player releases and re-releases crouch with headroom.
    pub(crate) fn try_stand(
        &mut self,
        stance: &mut Stance,
        crouch_requested: &mut bool,
        tuning: &LocomotionTuning,
        motor: &mut dyn CharacterMotor,
    ) {
        if *stance != Stance::Crouch || *crouch_requested {
            return;
        }

        self.apply(CapsuleProfile::Standing, tuning, motor);
        let position = motor.transient_position();
        let rotation = motor.transient_rotation();
        if motor.overlap_count(position, rotation) > 0 {
            self.apply(CapsuleProfile::Crouched, tuning, motor);
            *crouch_requested = true;
            debug!("uncrouch blocked, staying crouched");
        } else {
            *stance = Stance::Stand;
        }
    }
}
