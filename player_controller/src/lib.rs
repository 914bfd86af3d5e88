//! Player controller composition (input + look + ground contacts + motor).
//!
//! Two callbacks drive a [`FpsController`]: [`FpsController::on_contact`] for
//! every collision callback the physics backend reports, and
//! [`FpsController::tick`] once per simulation step. Contacts reported during
//! a step are visible to the next `tick`; the two may otherwise interleave in
//! any order.
#![forbid(unsafe_code)]

mod config;
pub mod driver;
mod input;

use std::fmt::Debug;
use std::hash::Hash;

use character_motor_fps::{
    motor_for, BodyDrive, DriveMode, FpsMotorInput, FpsMotorState, Motor, MotorContext,
};
use ground_contact::{
    CharacterFrame, ClassifierStats, CollisionQuery, ContactClassifier, ContactEvent,
    GroundRegistry,
};
use player_camera::{CameraPose, PlayerCamera};
use rapier3d::math::{Point, UnitVector, Vector};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::Real;

pub use config::{ConfigError, ConfigValidation, ControllerConfig};
pub use input::{
    FpsInputAdapter, InputAdapter, InputIntent, InputSettings, InputSnapshot, RUN_ALIGNMENT,
};

#[derive(Clone, Copy, Debug)]
pub struct CharacterState {
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
    pub orientation: UnitQuaternion<Real>,
    pub pending_jump: bool,
    pub running: bool,
}

impl CharacterState {
    pub fn new(position: Vector<Real>) -> Self {
        Self {
            position,
            velocity: Vector::zeros(),
            orientation: UnitQuaternion::identity(),
            pending_jump: false,
            running: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PlayerFrame {
    pub velocity: Vector<Real>,
    /// What to hand to the physics body this step.
    pub drive: BodyDrive,
    pub grounded: bool,
    pub jumped: bool,
    pub running: bool,
    pub camera: CameraPose,
}

pub struct FpsController<B, A: InputAdapter = FpsInputAdapter> {
    config: ControllerConfig,
    input: A,
    motor: Box<dyn Motor<B>>,
    classifier: ContactClassifier,
    camera: PlayerCamera,
    ground: GroundRegistry<B>,
    state: CharacterState,
    up: UnitVector<Real>,
}

impl<B: Copy + Eq + Hash + Debug + 'static> FpsController<B, FpsInputAdapter> {
    pub fn new(config: ControllerConfig, position: Vector<Real>) -> Self {
        Self::with_input(config, FpsInputAdapter::new(), position)
    }
}

impl<B: Copy + Eq + Hash + Debug + 'static, A: InputAdapter> FpsController<B, A> {
    pub fn with_input(config: ControllerConfig, input: A, position: Vector<Real>) -> Self {
        Self {
            motor: motor_for(config.drive_mode, config.motor_config()),
            classifier: ContactClassifier::new(config.ground_profile()),
            camera: PlayerCamera::new(config.eye_height, config.look_sensitivity()),
            config,
            input,
            ground: GroundRegistry::new(),
            state: CharacterState::new(position),
            up: Vector::y_axis(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Replaces the tunables; takes effect on the next callback.
    pub fn set_config(&mut self, config: ControllerConfig) {
        if config.drive_mode != self.motor.drive_mode() {
            self.motor = motor_for(config.drive_mode, config.motor_config());
        } else {
            self.motor.set_config(config.motor_config());
        }
        self.classifier.set_profile(config.ground_profile());
        self.camera.set_sensitivity(config.look_sensitivity());
        self.camera.set_eye_height(config.eye_height);
        self.config = config;
    }

    pub fn drive_mode(&self) -> DriveMode {
        self.motor.drive_mode()
    }

    pub fn on_ground(&self) -> bool {
        self.ground.is_grounded()
    }

    pub fn ground(&self) -> &GroundRegistry<B> {
        &self.ground
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CharacterState {
        &mut self.state
    }

    pub fn camera(&self) -> &PlayerCamera {
        &self.camera
    }

    pub fn classifier_stats(&self) -> ClassifierStats {
        self.classifier.stats()
    }

    /// Collision callback: one stay or exit notification for one body.
    pub fn on_contact<Q: CollisionQuery<Body = B>>(
        &mut self,
        query: &Q,
        event: ContactEvent<B>,
        dt: Real,
    ) {
        let frame = CharacterFrame {
            position: Point::from(self.state.position),
            up: self.up,
            velocity: self.state.velocity,
            dt,
        };
        self.classifier.handle_event(query, &frame, event, &mut self.ground);
    }

    /// Update callback: look, input mapping and velocity resolution.
    pub fn tick(&mut self, raw: &InputSnapshot, gravity: Vector<Real>, dt: Real) -> PlayerFrame {
        let intent = self.input.intent(raw, &self.config.input_settings());
        self.camera
            .apply_look_delta(intent.look_delta, &mut self.state.orientation);
        self.state.running = intent.run;
        self.state.pending_jump = intent.jump;

        let output = self.motor.step(
            &FpsMotorInput {
                move_vector: self.state.orientation * intent.move_vector,
                run: self.state.running,
                jump: self.state.pending_jump,
            },
            &self.ground,
            &FpsMotorState {
                position: self.state.position,
                velocity: self.state.velocity,
            },
            MotorContext {
                dt,
                gravity,
                up: self.up,
            },
        );
        if output.jumped {
            self.state.pending_jump = false;
        }
        self.state.velocity = output.next_velocity;
        if let BodyDrive::Position(position) = output.drive {
            self.state.position = position;
        }
        let camera = self
            .camera
            .update_from_origin(self.state.position, &self.state.orientation);
        PlayerFrame {
            velocity: output.next_velocity,
            drive: output.drive,
            grounded: output.grounded,
            jumped: output.jumped,
            running: self.state.running,
            camera,
        }
    }
}
