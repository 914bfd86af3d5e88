//! Rapier-backed collision queries and contact event conversion.

use physics_rapier::{ContactChanges, PhysicsWorld};
use rapier3d::math::{Point, Vector};
use rapier3d::parry::shape::ShapeType;
use rapier3d::prelude::{ColliderHandle, QueryFilter, Ray, Real};

use crate::query::{CollisionQuery, ContactEvent};

/// Answers classifier queries against a [`PhysicsWorld`], ignoring the
/// character's own collider.
pub struct RapierCollisionQuery<'a> {
    world: &'a PhysicsWorld,
    character: ColliderHandle,
}

impl<'a> RapierCollisionQuery<'a> {
    pub fn new(world: &'a PhysicsWorld, character: ColliderHandle) -> Self {
        Self { world, character }
    }
}

/// Shapes answered with a closest-point projection; everything else
/// (heightfields, compounds, half-spaces, ...) goes through a raycast.
pub fn supports_closest_point(shape: ShapeType) -> bool {
    matches!(
        shape,
        ShapeType::Ball
            | ShapeType::Cuboid
            | ShapeType::RoundCuboid
            | ShapeType::Capsule
            | ShapeType::TriMesh
            | ShapeType::ConvexPolyhedron
            | ShapeType::RoundConvexPolyhedron
    )
}

impl CollisionQuery for RapierCollisionQuery<'_> {
    type Body = ColliderHandle;

    /// Narrow-phase contacts are read after the step that produced them, so
    /// they already sit at the body's current pose. Advancing them by
    /// `velocity * dt` again would tilt ground points toward the motion.
    fn predicted_contact_points(
        &self,
        points: &[Point<Real>],
        _velocity: &Vector<Real>,
        _dt: Real,
    ) -> Vec<Point<Real>> {
        points.to_vec()
    }

    fn closest_surface_point(
        &self,
        body: ColliderHandle,
        point: &Point<Real>,
    ) -> Option<Point<Real>> {
        let collider = self.world.colliders().get(body)?;
        let shape = collider.shape();
        if !supports_closest_point(shape.shape_type()) {
            return None;
        }
        let projection = shape.project_point(collider.position(), point, true);
        Some(projection.point)
    }

    fn cast_ray(&self, origin: &Point<Real>, direction: &Vector<Real>) -> Option<Point<Real>> {
        if direction.norm_squared() <= 1.0e-12 {
            return None;
        }
        let ray = Ray::new(*origin, *direction);
        let filter = QueryFilter::default().exclude_collider(self.character);
        let (_, toi) = self.world.query_pipeline().cast_ray(
            self.world.bodies(),
            self.world.colliders(),
            &ray,
            Real::MAX,
            true,
            filter,
        )?;
        Some(ray.point_at(toi))
    }

    fn contact_offset(&self) -> Real {
        self.world.contact_offset
    }
}

/// Exit events first, then one stay event per still-touching collider.
pub fn contact_events(changes: ContactChanges) -> Vec<ContactEvent<ColliderHandle>> {
    let mut events = Vec::with_capacity(changes.exited.len() + changes.stay.len());
    events.extend(
        changes
            .exited
            .into_iter()
            .map(|body| ContactEvent::Exit { body }),
    );
    events.extend(changes.stay.into_iter().map(|stay| ContactEvent::Stay {
        body: stay.collider,
        points: stay.points,
    }));
    events
}
