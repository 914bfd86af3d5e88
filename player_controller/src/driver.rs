//! Drives an [`FpsController`] from a rapier [`PhysicsWorld`].

use character_motor_fps::{BodyDrive, DriveMode};
use ground_contact::rapier::{contact_events, RapierCollisionQuery};
use physics_rapier::{CharacterBody, ContactTracker, PhysicsWorld};
use rapier3d::math::Vector;
use rapier3d::prelude::{ColliderHandle, Real};

use crate::{ControllerConfig, FpsController, InputAdapter, InputSnapshot, PlayerFrame};

/// The character's body in a rapier world plus its contact bookkeeping.
pub struct RapierCharacter {
    body: CharacterBody,
    tracker: ContactTracker,
}

impl RapierCharacter {
    pub fn spawn(
        world: &mut PhysicsWorld,
        config: &ControllerConfig,
        position: Vector<Real>,
    ) -> Self {
        let body = world.insert_character(position, config.capsule_height, config.capsule_radius);
        Self {
            body,
            tracker: ContactTracker::new(body.collider),
        }
    }

    /// Update callback: reads the body back, resolves motion and applies it.
    pub fn update<A: InputAdapter>(
        &mut self,
        world: &mut PhysicsWorld,
        controller: &mut FpsController<ColliderHandle, A>,
        raw: &InputSnapshot,
        dt: Real,
    ) -> PlayerFrame {
        self.pull_body_state(world, controller);
        let frame = controller.tick(raw, world.gravity, dt);
        match frame.drive {
            BodyDrive::Velocity(velocity) => world.set_body_velocity(self.body.body, velocity),
            BodyDrive::Position(position) => world.set_body_translation(self.body.body, position),
        }
        frame
    }

    /// Collision callbacks for the step the world just completed.
    pub fn sync_contacts<A: InputAdapter>(
        &mut self,
        world: &PhysicsWorld,
        controller: &mut FpsController<ColliderHandle, A>,
        dt: Real,
    ) {
        self.pull_body_state(world, controller);
        let changes = self.tracker.poll(world);
        let query = RapierCollisionQuery::new(world, self.body.collider);
        for event in contact_events(changes) {
            controller.on_contact(&query, event, dt);
        }
    }

    /// One full simulation step: update, physics, collision callbacks.
    pub fn step<A: InputAdapter>(
        &mut self,
        world: &mut PhysicsWorld,
        controller: &mut FpsController<ColliderHandle, A>,
        raw: &InputSnapshot,
        dt: Real,
    ) -> PlayerFrame {
        let frame = self.update(world, controller, raw, dt);
        world.step(dt);
        self.sync_contacts(world, controller, dt);
        frame
    }

    fn pull_body_state<A: InputAdapter>(
        &self,
        world: &PhysicsWorld,
        controller: &mut FpsController<ColliderHandle, A>,
    ) {
        let drive_mode = controller.drive_mode();
        let state = controller.state_mut();
        if let Some(translation) = world.body_translation(self.body.body) {
            state.position = translation;
        }
        if drive_mode == DriveMode::Velocity {
            if let Some(velocity) = world.body_velocity(self.body.body) {
                state.velocity = velocity;
            }
        }
    }
}
