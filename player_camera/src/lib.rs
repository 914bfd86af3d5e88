//! Look controller and camera derivation from the player pose.
#![forbid(unsafe_code)]

use std::f32::consts::FRAC_PI_2;

use rapier3d::math::Vector;
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::Real;

/// Pitch is held within straight up / straight down.
pub const PITCH_LIMIT: Real = FRAC_PI_2;

#[derive(Clone, Copy, Debug)]
pub struct CameraPose {
    pub eye: Vector<Real>,
    /// Character orientation followed by the camera pitch.
    pub rotation: UnitQuaternion<Real>,
    pub pitch: Real,
}

/// Accumulates pitch for the camera and turns the character for yaw.
///
/// Positive pitch looks down. Yaw is never stored: each delta is applied as
/// a local rotation about the character's up axis, so the heading lives in
/// the character orientation and is never wrapped.
#[derive(Clone, Copy, Debug)]
pub struct PlayerCamera {
    eye_height: Real,
    sensitivity: Real,
    pitch: Real,
    eye: Vector<Real>,
}

impl PlayerCamera {
    /// `sensitivity` is radians per unit of look input.
    pub fn new(eye_height: Real, sensitivity: Real) -> Self {
        Self {
            eye_height,
            sensitivity,
            pitch: 0.0,
            eye: Vector::zeros(),
        }
    }

    pub fn pitch(&self) -> Real {
        self.pitch
    }

    pub fn sensitivity(&self) -> Real {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: Real) {
        self.sensitivity = sensitivity;
    }

    pub fn eye_height(&self) -> Real {
        self.eye_height
    }

    pub fn set_eye_height(&mut self, eye_height: Real) {
        self.eye_height = eye_height;
    }

    /// Applies `[horizontal, vertical]` look input; returns the new pitch.
    pub fn apply_look_delta(
        &mut self,
        delta: [Real; 2],
        orientation: &mut UnitQuaternion<Real>,
    ) -> Real {
        let yaw = self.sensitivity * delta[0];
        if yaw != 0.0 {
            *orientation *= yaw_rotation(yaw);
        }
        self.pitch = (self.pitch + self.sensitivity * delta[1]).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.pitch
    }

    pub fn rotation(&self, orientation: &UnitQuaternion<Real>) -> UnitQuaternion<Real> {
        orientation * pitch_rotation(self.pitch)
    }

    pub fn update_from_origin(
        &mut self,
        origin: Vector<Real>,
        orientation: &UnitQuaternion<Real>,
    ) -> CameraPose {
        self.eye = origin + Vector::new(0.0, self.eye_height, 0.0);
        self.pose(orientation)
    }

    pub fn pose(&self, orientation: &UnitQuaternion<Real>) -> CameraPose {
        CameraPose {
            eye: self.eye,
            rotation: self.rotation(orientation),
            pitch: self.pitch,
        }
    }
}

/// Turn about +Y; positive yaw turns right (from -Z towards +X).
pub fn yaw_rotation(yaw: Real) -> UnitQuaternion<Real> {
    UnitQuaternion::from_axis_angle(&Vector::y_axis(), -yaw)
}

/// Tilt about +X; positive pitch looks down.
pub fn pitch_rotation(pitch: Real) -> UnitQuaternion<Real> {
    UnitQuaternion::from_axis_angle(&Vector::x_axis(), -pitch)
}

pub fn forward(orientation: &UnitQuaternion<Real>) -> Vector<Real> {
    orientation * Vector::new(0.0, 0.0, -1.0)
}

pub fn right(orientation: &UnitQuaternion<Real>) -> Vector<Real> {
    orientation * Vector::new(1.0, 0.0, 0.0)
}
