//! Rapier integration entrypoints, character body setup and contact reporting.
#![forbid(unsafe_code)]

use std::collections::HashSet;

use rapier3d::prelude::*;

/// Maximum discrepancy between two contact estimates before one is considered stale.
pub const DEFAULT_CONTACT_OFFSET: Real = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterBody {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

/// World-space contact points against one collider that is still touching.
#[derive(Clone, Debug)]
pub struct ContactStay {
    pub collider: ColliderHandle,
    pub points: Vec<Point<Real>>,
}

#[derive(Clone, Debug, Default)]
pub struct ContactChanges {
    pub stay: Vec<ContactStay>,
    pub exited: Vec<ColliderHandle>,
}

impl ContactChanges {
    pub fn is_empty(&self) -> bool {
        self.stay.is_empty() && self.exited.is_empty()
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub contact_offset: Real,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            contact_offset: DEFAULT_CONTACT_OFFSET,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn narrow_phase(&self) -> &NarrowPhase {
        &self.narrow_phase
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    /// Inserts an upright, rotation-locked capsule body for a character.
    ///
    /// `height` is the full capsule height (including both caps). The body
    /// ignores world gravity; the character motor integrates gravity itself.
    pub fn insert_character(
        &mut self,
        translation: Vector<Real>,
        height: Real,
        radius: Real,
    ) -> CharacterBody {
        let half_segment = (height * 0.5 - radius).max(0.0);
        let body = RigidBodyBuilder::dynamic()
            .translation(translation)
            .lock_rotations()
            .gravity_scale(0.0)
            .can_sleep(false)
            .build();
        let body = self.bodies.insert(body);
        let collider = ColliderBuilder::capsule_y(half_segment, radius)
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        CharacterBody { body, collider }
    }

    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies.get(handle).map(|body| *body.translation())
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vector<Real>> {
        self.bodies.get(handle).map(|body| *body.linvel())
    }

    pub fn set_body_velocity(&mut self, handle: RigidBodyHandle, velocity: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(velocity, true);
        }
    }

    /// Places the body directly, discarding whatever velocity the solver left on it.
    pub fn set_body_translation(&mut self, handle: RigidBodyHandle, translation: Vector<Real>) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(translation, true);
            body.set_linvel(Vector::zeros(), true);
        }
    }
}

/// Turns narrow-phase state into stay/exit notifications for one collider.
///
/// Every collider touching the tracked one after a step produces a stay entry;
/// colliders that touched it after the previous poll but no longer do produce
/// an exit entry.
pub struct ContactTracker {
    collider: ColliderHandle,
    touching: HashSet<ColliderHandle>,
}

impl ContactTracker {
    pub fn new(collider: ColliderHandle) -> Self {
        Self {
            collider,
            touching: HashSet::new(),
        }
    }

    pub fn is_touching(&self, other: ColliderHandle) -> bool {
        self.touching.contains(&other)
    }

    pub fn poll(&mut self, world: &PhysicsWorld) -> ContactChanges {
        let mut changes = ContactChanges::default();
        let mut touching = HashSet::new();
        for pair in world.narrow_phase().contact_pairs_with(self.collider) {
            if !pair.has_any_active_contact {
                continue;
            }
            let other = if pair.collider1 == self.collider {
                pair.collider2
            } else {
                pair.collider1
            };
            let points: Vec<Point<Real>> = pair
                .manifolds
                .iter()
                .flat_map(|manifold| manifold.data.solver_contacts.iter())
                .map(|contact| contact.point)
                .collect();
            if points.is_empty() {
                continue;
            }
            touching.insert(other);
            changes.stay.push(ContactStay {
                collider: other,
                points,
            });
        }
        changes.exited = self
            .touching
            .iter()
            .filter(|handle| !touching.contains(*handle))
            .copied()
            .collect();
        self.touching = touching;
        changes
    }
}
