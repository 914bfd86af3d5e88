use rapier3d::math::Vector;
use rapier3d::prelude::Real;

/// Raw input state sampled once per tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputSnapshot {
    /// Mouse/stick look delta, `[x, y]` with +y meaning "look up".
    pub look_delta: [Real; 2],
    /// `[horizontal, vertical]` move axes, +vertical meaning forward.
    pub move_axis: [Real; 2],
    /// Jump button held this tick.
    pub jump: bool,
    /// Run modifier held this tick.
    pub run: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InputIntent {
    /// Move vector in the character frame (-Z forward, +X right); unit length
    /// when normalized, zero when idle.
    pub move_vector: Vector<Real>,
    pub run: bool,
    /// True only on the tick the jump button goes down.
    pub jump: bool,
    /// `[yaw, pitch]` look input; positive pitch looks down.
    pub look_delta: [Real; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSettings {
    pub enabled: bool,
    pub normalize: bool,
    pub can_jump: bool,
    pub can_run: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            normalize: true,
            can_jump: true,
            can_run: true,
        }
    }
}

/// Minimum alignment between the move vector and forward for running.
pub const RUN_ALIGNMENT: Real = 0.5;

pub trait InputAdapter {
    fn intent(&mut self, raw: &InputSnapshot, settings: &InputSettings) -> InputIntent;
}

/// Keyboard/mouse style mapping with jump edge detection.
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsInputAdapter {
    jump_held: bool,
}

impl FpsInputAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputAdapter for FpsInputAdapter {
    fn intent(&mut self, raw: &InputSnapshot, settings: &InputSettings) -> InputIntent {
        let jump_pressed = raw.jump && !self.jump_held;
        self.jump_held = raw.jump;
        let look_delta = [raw.look_delta[0], -raw.look_delta[1]];
        if !settings.enabled {
            return InputIntent {
                look_delta,
                ..Default::default()
            };
        }

        let forward = Vector::new(0.0, 0.0, -1.0);
        let right = Vector::new(1.0, 0.0, 0.0);
        let mut move_vector = forward * raw.move_axis[1] + right * raw.move_axis[0];
        if settings.normalize {
            move_vector = normalize_or_zero(move_vector);
        }
        let run = settings.can_run
            && raw.run
            && normalize_or_zero(move_vector).dot(&forward) >= RUN_ALIGNMENT;
        InputIntent {
            move_vector,
            run,
            jump: jump_pressed && settings.can_jump,
            look_delta,
        }
    }
}

fn normalize_or_zero(vector: Vector<Real>) -> Vector<Real> {
    vector.try_normalize(1.0e-6).unwrap_or_else(Vector::zeros)
}
