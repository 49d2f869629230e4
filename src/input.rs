//! Input action layer.
//!
//! Observers accumulate raw action state every rendered frame; once per
//! frame, before the fixed main loop runs, the latch system folds the
//! accumulated state into each character's locomotion core. Edge-triggered
//! intent (jump presses, crouch toggles) is derived here and latched inside
//! the core, so a press made on a frame without a physics tick still fires,
//! and two ticks in one frame cannot consume it twice.

use crate::{
    CharacterController,
    character::{CharacterInput, CharacterLocomotion, CrouchRequest},
    prelude::*,
};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(apply_movement)
        .add_observer(apply_jump)
        .add_observer(apply_crouch)
        .add_observer(apply_sprint)
        .add_systems(
            RunFixedMainLoop,
            latch_input.in_set(RunFixedMainLoopSystems::BeforeFixedMainLoop),
        );
}

#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct Movement;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Jump;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Crouch;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Sprint;

/// How the crouch action drives the crouch request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum CrouchMode {
    /// The request follows the key level.
    #[default]
    Hold,
    /// Each press flips the persisted request.
    Toggle,
}

/// Raw action state accumulated since the last latch, plus the previous
/// frame's levels for edge detection.
#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct AccumulatedInput {
    /// The last non-zero move that was input since the last latch.
    pub last_movement: Option<Vec2>,
    pub jump_down: bool,
    pub crouch_down: bool,
    pub sprint_down: bool,
    was_jump_down: bool,
    was_crouch_down: bool,
}

/// Lives on the entity whose `Transform` supplies the look rotation,
/// typically a camera. Characters without one orient by their own transform.
#[derive(Component, Clone, Copy)]
#[relationship(relationship_target = OrientationSource)]
pub struct OrientationSourceOf(pub Entity);

#[derive(Component, Clone, Copy)]
#[relationship_target(relationship = OrientationSourceOf)]
pub struct OrientationSource(Entity);

impl OrientationSource {
    pub fn get(self) -> Entity {
        self.0
    }
}

fn apply_movement(
    movement: On<Fire<Movement>>,
    mut accumulated_inputs: Query<&mut AccumulatedInput>,
) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(movement.context) {
        accumulated_input.last_movement = Some(movement.value);
    }
}

fn apply_jump(jump: On<Fire<Jump>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(jump.context) {
        accumulated_input.jump_down = true;
    }
}

fn apply_crouch(crouch: On<Fire<Crouch>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(crouch.context) {
        accumulated_input.crouch_down = true;
    }
}

fn apply_sprint(sprint: On<Fire<Sprint>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_input) = accumulated_inputs.get_mut(sprint.context) {
        accumulated_input.sprint_down = true;
    }
}

/// Build one frame of [`CharacterInput`] from the accumulated action state.
fn frame_input(
    accumulated: &AccumulatedInput,
    crouch_mode: CrouchMode,
    rotation: Quat,
) -> CharacterInput {
    let crouch = match crouch_mode {
        CrouchMode::Hold => CrouchRequest::Set(accumulated.crouch_down),
        CrouchMode::Toggle => {
            if accumulated.crouch_down && !accumulated.was_crouch_down {
                CrouchRequest::Toggle
            } else {
                CrouchRequest::None
            }
        }
    };
    CharacterInput {
        rotation,
        movement: accumulated.last_movement.unwrap_or_default(),
        jump_pressed: accumulated.jump_down && !accumulated.was_jump_down,
        jump_held: accumulated.jump_down,
        crouch,
        sprint: accumulated.sprint_down,
    }
}

fn latch_input(
    mut characters: Query<(
        &CharacterController,
        &mut AccumulatedInput,
        &mut CharacterLocomotion,
        &Transform,
        Option<&OrientationSource>,
    )>,
    orientations: Query<&Transform, Without<CharacterLocomotion>>,
) {
    for (cfg, mut accumulated, mut character, transform, orientation) in &mut characters {
        let rotation = orientation
            .and_then(|source| orientations.get(source.get()).ok())
            .map(|t| t.rotation)
            .unwrap_or(transform.rotation);

        let input = frame_input(&accumulated, cfg.crouch_mode, rotation);
        character.update_input(&input);

        accumulated.was_jump_down = accumulated.jump_down;
        accumulated.was_crouch_down = accumulated.crouch_down;
        accumulated.jump_down = false;
        accumulated.crouch_down = false;
        accumulated.sprint_down = false;
        accumulated.last_movement = None;
    }
}
