//! First-person movement motor (ground-aligned walking, airborne drift).
//!
//! Grounded, the wish direction is scaled by speed and tilted onto the slope
//! under the ground point that best matches it; the result replaces the
//! current velocity. Airborne, the current velocity is kept and only nudged by
//! air control, horizontal drag and gravity.
#![forbid(unsafe_code)]

use std::f32::consts::PI;
use std::hash::Hash;

use ground_contact::{angle_between, ContactClassification, GroundRegistry};
use rapier3d::math::{UnitVector, Vector};
use rapier3d::na::{Unit, UnitQuaternion};
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

/// How the motor result is handed to the physics body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// The body velocity is set; the engine integrates position.
    Velocity,
    /// The motor integrates position itself and places the body.
    #[default]
    Position,
}

impl DriveMode {
    /// Contact classification matching this drive mode.
    pub fn classification(self) -> ContactClassification {
        match self {
            DriveMode::Velocity => ContactClassification::Validated,
            DriveMode::Position => ContactClassification::SlopeOnly,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FpsMotorConfig {
    pub speed: Real,
    /// Horizontal damping per second while airborne.
    pub air_drag: Real,
    pub jump_height: Real,
    pub run_multiplier: Real,
    pub air_control: bool,
    pub airborne_sensitivity: Real,
}

impl Default for FpsMotorConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            air_drag: 0.0,
            jump_height: 2.0,
            run_multiplier: 1.5,
            air_control: true,
            airborne_sensitivity: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FpsMotorInput {
    /// World-space wish direction, not yet scaled by speed.
    pub move_vector: Vector<Real>,
    pub run: bool,
    pub jump: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct FpsMotorState {
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
}

#[derive(Clone, Copy, Debug)]
pub struct MotorContext {
    pub dt: Real,
    pub gravity: Vector<Real>,
    pub up: UnitVector<Real>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyDrive {
    Velocity(Vector<Real>),
    Position(Vector<Real>),
}

#[derive(Clone, Copy, Debug)]
pub struct FpsMotorOutput {
    pub next_velocity: Vector<Real>,
    pub drive: BodyDrive,
    pub grounded: bool,
    pub jumped: bool,
}

pub trait Motor<B> {
    fn drive_mode(&self) -> DriveMode;

    fn config(&self) -> FpsMotorConfig;

    fn set_config(&mut self, config: FpsMotorConfig);

    fn step(
        &mut self,
        input: &FpsMotorInput,
        ground: &GroundRegistry<B>,
        state: &FpsMotorState,
        ctx: MotorContext,
    ) -> FpsMotorOutput;
}

/// Sets the body velocity and lets the engine move the body.
#[derive(Clone, Copy, Debug, Default)]
pub struct VelocityMotor {
    config: FpsMotorConfig,
}

impl VelocityMotor {
    pub fn new(config: FpsMotorConfig) -> Self {
        Self { config }
    }
}

impl<B: Copy + Eq + Hash> Motor<B> for VelocityMotor {
    fn drive_mode(&self) -> DriveMode {
        DriveMode::Velocity
    }

    fn config(&self) -> FpsMotorConfig {
        self.config
    }

    fn set_config(&mut self, config: FpsMotorConfig) {
        self.config = config;
    }

    fn step(
        &mut self,
        input: &FpsMotorInput,
        ground: &GroundRegistry<B>,
        state: &FpsMotorState,
        ctx: MotorContext,
    ) -> FpsMotorOutput {
        let resolved = resolve_velocity(&self.config, input, ground, state.velocity, ctx);
        FpsMotorOutput {
            next_velocity: resolved.velocity,
            drive: BodyDrive::Velocity(resolved.velocity),
            grounded: resolved.grounded,
            jumped: resolved.jumped,
        }
    }
}

/// Integrates position from the resolved velocity and places the body.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionMotor {
    config: FpsMotorConfig,
}

impl PositionMotor {
    pub fn new(config: FpsMotorConfig) -> Self {
        Self { config }
    }
}

impl<B: Copy + Eq + Hash> Motor<B> for PositionMotor {
    fn drive_mode(&self) -> DriveMode {
        DriveMode::Position
    }

    fn config(&self) -> FpsMotorConfig {
        self.config
    }

    fn set_config(&mut self, config: FpsMotorConfig) {
        self.config = config;
    }

    fn step(
        &mut self,
        input: &FpsMotorInput,
        ground: &GroundRegistry<B>,
        state: &FpsMotorState,
        ctx: MotorContext,
    ) -> FpsMotorOutput {
        let dt = ctx.dt.max(0.0);
        let resolved = resolve_velocity(&self.config, input, ground, state.velocity, ctx);
        FpsMotorOutput {
            next_velocity: resolved.velocity,
            drive: BodyDrive::Position(state.position + resolved.velocity * dt),
            grounded: resolved.grounded,
            jumped: resolved.jumped,
        }
    }
}

pub fn motor_for<B: Copy + Eq + Hash + 'static>(
    mode: DriveMode,
    config: FpsMotorConfig,
) -> Box<dyn Motor<B>> {
    match mode {
        DriveMode::Velocity => Box::new(VelocityMotor::new(config)),
        DriveMode::Position => Box::new(PositionMotor::new(config)),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResolvedVelocity {
    pub velocity: Vector<Real>,
    pub grounded: bool,
    pub jumped: bool,
}

pub fn resolve_velocity<B: Copy + Eq + Hash>(
    config: &FpsMotorConfig,
    input: &FpsMotorInput,
    ground: &GroundRegistry<B>,
    velocity: Vector<Real>,
    ctx: MotorContext,
) -> ResolvedVelocity {
    let dt = ctx.dt.max(0.0);
    let up = ctx.up.into_inner();
    let wish = input.move_vector * config.speed;

    if let Some(ground_point) = closest_ground_point(ground.ground_points(), &wish) {
        let mut next = from_to_rotation(&-up, ground_point) * wish;
        if input.run {
            next *= config.run_multiplier;
        }
        let mut jumped = false;
        if input.jump {
            let vertical = jump_speed(&ctx.gravity, config.jump_height);
            next += up * (vertical - next.dot(&up));
            jumped = true;
        }
        return ResolvedVelocity {
            velocity: next,
            grounded: true,
            jumped,
        };
    }

    let mut next = velocity;
    if config.air_control {
        next += input.move_vector * (config.airborne_sensitivity * dt);
    }
    let horizontal = next - up * next.dot(&up);
    next -= horizontal * (config.air_drag * dt);
    next += ctx.gravity * dt;
    ResolvedVelocity {
        velocity: next,
        grounded: false,
        jumped: false,
    }
}

/// Ground point with the smallest angle to `direction`.
///
/// Ties keep the first point seen, so with equal angles the pick depends on
/// iteration order. A zero `direction` picks the first point.
pub fn closest_ground_point<'a>(
    points: impl IntoIterator<Item = &'a Vector<Real>>,
    direction: &Vector<Real>,
) -> Option<&'a Vector<Real>> {
    let mut best: Option<(&'a Vector<Real>, Real)> = None;
    for point in points {
        let angle = angle_between(point, direction);
        match best {
            Some((_, best_angle)) if angle >= best_angle => {}
            _ => best = Some((point, angle)),
        }
    }
    best.map(|(point, _)| point)
}

/// Shortest rotation taking the direction of `from` onto the direction of `to`.
pub fn from_to_rotation(from: &Vector<Real>, to: &Vector<Real>) -> UnitQuaternion<Real> {
    if let Some(rotation) = UnitQuaternion::rotation_between(from, to) {
        return rotation;
    }
    // Opposite directions: any half turn about an axis orthogonal to `from`.
    let mut axis = from.cross(&Vector::x());
    if axis.norm_squared() <= 1.0e-6 {
        axis = from.cross(&Vector::z());
    }
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), PI)
}

/// Take-off speed reaching `height` under `gravity`.
pub fn jump_speed(gravity: &Vector<Real>, height: Real) -> Real {
    (2.0 * gravity.norm() * height.max(0.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ground_contact::GroundPoints;

    const EPS: Real = 1.0e-4;

    fn points(values: &[[Real; 3]]) -> GroundPoints {
        values
            .iter()
            .map(|v| Vector::new(v[0], v[1], v[2]))
            .collect()
    }

    fn ctx(dt: Real) -> MotorContext {
        MotorContext {
            dt,
            gravity: Vector::new(0.0, -9.81, 0.0),
            up: Vector::y_axis(),
        }
    }

    fn flat_ground() -> GroundRegistry<u32> {
        let mut ground = GroundRegistry::new();
        ground.upsert(1, points(&[[0.0, -0.5, 0.0]]));
        ground
    }

    fn assert_vec_near(actual: Vector<Real>, expected: Vector<Real>) {
        assert!(
            (actual - expected).norm() < EPS,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn forward_input() -> FpsMotorInput {
        FpsMotorInput {
            move_vector: Vector::new(0.0, 0.0, 1.0),
            ..Default::default()
        }
    }

    #[test]
    fn flat_ground_walk_replaces_velocity() {
        let config = FpsMotorConfig::default();
        let resolved = resolve_velocity(
            &config,
            &forward_input(),
            &flat_ground(),
            Vector::new(3.0, -7.0, 0.0),
            ctx(0.02),
        );
        assert!(resolved.grounded);
        assert!(!resolved.jumped);
        assert_vec_near(resolved.velocity, Vector::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn flat_ground_jump_sets_vertical_speed() {
        let config = FpsMotorConfig::default();
        let input = FpsMotorInput {
            jump: true,
            ..forward_input()
        };
        let resolved =
            resolve_velocity(&config, &input, &flat_ground(), Vector::zeros(), ctx(0.02));
        assert!(resolved.jumped);
        let expected: Real = (2.0 * 9.81 * 2.0_f32).sqrt();
        assert!((resolved.velocity.y - expected).abs() < EPS);
        assert!((resolved.velocity.y - 6.26).abs() < 0.01);
        assert!((resolved.velocity.z - 10.0).abs() < EPS);
        assert!(resolved.velocity.x.abs() < EPS);
    }

    #[test]
    fn running_scales_ground_velocity() {
        let config = FpsMotorConfig::default();
        let input = FpsMotorInput {
            run: true,
            ..forward_input()
        };
        let resolved =
            resolve_velocity(&config, &input, &flat_ground(), Vector::zeros(), ctx(0.02));
        assert_vec_near(resolved.velocity, Vector::new(0.0, 0.0, 15.0));
    }

    #[test]
    fn slope_tilts_ground_velocity() {
        let theta: Real = 30.0_f32.to_radians();
        let mut ground = GroundRegistry::new();
        // Ramp rising towards -Z: the supporting point lies against the normal.
        ground.upsert(1u32, points(&[[0.0, -0.5 * theta.cos(), -0.5 * theta.sin()]]));
        let input = FpsMotorInput {
            move_vector: Vector::new(0.0, 0.0, -1.0),
            ..Default::default()
        };
        let resolved = resolve_velocity(
            &FpsMotorConfig::default(),
            &input,
            &ground,
            Vector::zeros(),
            ctx(0.02),
        );
        assert_vec_near(
            resolved.velocity,
            Vector::new(0.0, 10.0 * theta.sin(), -10.0 * theta.cos()),
        );
        assert!((resolved.velocity.norm() - 10.0).abs() < EPS);
    }

    #[test]
    fn picks_ground_point_closest_to_wish_direction() {
        let mut ground = GroundRegistry::new();
        ground.upsert(1u32, points(&[[0.0, -0.5, 0.0], [-0.3, -0.4, 0.0]]));
        ground.upsert(2u32, points(&[[0.0, -0.4, 0.3]]));
        let chosen = closest_ground_point(ground.ground_points(), &Vector::new(0.0, 0.0, 10.0))
            .copied()
            .expect("ground point");
        assert_vec_near(chosen, Vector::new(0.0, -0.4, 0.3));
    }

    #[test]
    fn equal_angles_pick_one_of_the_tied_points() {
        // Which tied point wins follows registry iteration order and is not
        // otherwise specified; only membership in the tie is checked.
        let mut ground = GroundRegistry::new();
        ground.upsert(1u32, points(&[[0.3, -0.4, 0.0]]));
        ground.upsert(2u32, points(&[[-0.3, -0.4, 0.0]]));
        let chosen = closest_ground_point(ground.ground_points(), &Vector::new(0.0, 0.0, 1.0))
            .copied()
            .expect("ground point");
        assert!((chosen.x.abs() - 0.3).abs() < EPS);
        assert!((chosen.y + 0.4).abs() < EPS);

        let idle = closest_ground_point(ground.ground_points(), &Vector::zeros());
        assert!(idle.is_some());
    }

    #[test]
    fn airborne_applies_drag_and_gravity() {
        let config = FpsMotorConfig {
            air_drag: 0.5,
            air_control: false,
            ..Default::default()
        };
        let ground = GroundRegistry::<u32>::new();
        let resolved = resolve_velocity(
            &config,
            &FpsMotorInput::default(),
            &ground,
            Vector::new(0.0, 5.0, 0.0),
            ctx(0.02),
        );
        assert!(!resolved.grounded);
        assert_vec_near(resolved.velocity, Vector::new(0.0, 4.8038, 0.0));
    }

    #[test]
    fn airborne_without_drag_or_control_is_pure_gravity() {
        let config = FpsMotorConfig {
            air_drag: 0.0,
            airborne_sensitivity: 0.0,
            ..Default::default()
        };
        let ground = GroundRegistry::<u32>::new();
        let velocity = Vector::new(2.0, -1.0, 4.0);
        let ctx = ctx(0.02);
        let resolved = resolve_velocity(&config, &forward_input(), &ground, velocity, ctx);
        assert_eq!(resolved.velocity, velocity + ctx.gravity * ctx.dt);
    }

    #[test]
    fn airborne_drag_only_damps_horizontal_motion() {
        let config = FpsMotorConfig {
            air_drag: 1.0,
            air_control: false,
            ..Default::default()
        };
        let ground = GroundRegistry::<u32>::new();
        let resolved = resolve_velocity(
            &config,
            &FpsMotorInput::default(),
            &ground,
            Vector::new(10.0, 2.0, 0.0),
            ctx(0.1),
        );
        assert_vec_near(resolved.velocity, Vector::new(9.0, 2.0 - 0.981, 0.0));
    }

    #[test]
    fn air_control_adds_to_inertia() {
        let config = FpsMotorConfig {
            airborne_sensitivity: 2.0,
            ..Default::default()
        };
        let ground = GroundRegistry::<u32>::new();
        let resolved = resolve_velocity(
            &config,
            &forward_input(),
            &ground,
            Vector::new(0.0, 0.0, 5.0),
            ctx(0.5),
        );
        assert_vec_near(resolved.velocity, Vector::new(0.0, -4.905, 6.0));
    }

    #[test]
    fn jump_is_ignored_while_airborne() {
        let config = FpsMotorConfig::default();
        let ground = GroundRegistry::<u32>::new();
        let input = FpsMotorInput {
            jump: true,
            ..Default::default()
        };
        let resolved = resolve_velocity(&config, &input, &ground, Vector::zeros(), ctx(0.02));
        assert!(!resolved.jumped);
        assert!(resolved.velocity.y < 0.0);
    }

    #[test]
    fn position_motor_integrates_translation() {
        let mut motor = PositionMotor::new(FpsMotorConfig::default());
        let state = FpsMotorState {
            position: Vector::new(1.0, 1.0, 1.0),
            velocity: Vector::zeros(),
        };
        let output = motor.step(&forward_input(), &flat_ground(), &state, ctx(0.1));
        match output.drive {
            BodyDrive::Position(position) => {
                assert_vec_near(position, Vector::new(1.0, 1.0, 2.0));
            }
            BodyDrive::Velocity(_) => panic!("expected position drive"),
        }
        assert_vec_near(output.next_velocity, Vector::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn motor_for_matches_drive_mode() {
        let config = FpsMotorConfig::default();
        for mode in [DriveMode::Velocity, DriveMode::Position] {
            let mut motor = motor_for::<u32>(mode, config);
            assert_eq!(motor.drive_mode(), mode);
            let state = FpsMotorState {
                position: Vector::zeros(),
                velocity: Vector::zeros(),
            };
            let output = motor.step(&forward_input(), &flat_ground(), &state, ctx(0.1));
            match (mode, output.drive) {
                (DriveMode::Velocity, BodyDrive::Velocity(v)) => {
                    assert_vec_near(v, Vector::new(0.0, 0.0, 10.0))
                }
                (DriveMode::Position, BodyDrive::Position(p)) => {
                    assert_vec_near(p, Vector::new(0.0, 0.0, 1.0))
                }
                _ => panic!("drive does not match mode {:?}", mode),
            }
        }
        assert_eq!(
            DriveMode::Velocity.classification(),
            ContactClassification::Validated
        );
        assert_eq!(
            DriveMode::Position.classification(),
            ContactClassification::SlopeOnly
        );
    }

    #[test]
    fn from_to_rotation_handles_opposite_vectors() {
        let down = Vector::new(0.0, -1.0, 0.0);
        let rotation = from_to_rotation(&down, &-down);
        assert_vec_near(rotation * down, -down);
        let identity = from_to_rotation(&down, &Vector::zeros());
        assert_vec_near(identity * down, down);
    }

    #[test]
    fn negative_dt_does_not_integrate() {
        let ground = GroundRegistry::<u32>::new();
        let velocity = Vector::new(1.0, 2.0, 3.0);
        let resolved = resolve_velocity(
            &FpsMotorConfig::default(),
            &forward_input(),
            &ground,
            velocity,
            ctx(-1.0),
        );
        assert_eq!(resolved.velocity, velocity);
    }
}
