use std::fmt::Debug;
use std::hash::Hash;

use rapier3d::math::{Point, Vector};
use rapier3d::prelude::Real;

/// Collision callback for one contacting body.
#[derive(Clone, Debug, PartialEq)]
pub enum ContactEvent<B> {
    /// The body is still touching the character at these world-space points.
    Stay { body: B, points: Vec<Point<Real>> },
    /// The body stopped touching the character.
    Exit { body: B },
}

/// Queries the classifier needs from the physics backend.
pub trait CollisionQuery {
    /// Backend handle identifying a contacting body.
    type Body: Copy + Eq + Hash + Debug;

    /// Where the reported contact points will be after one more step at `velocity`.
    fn predicted_contact_points(
        &self,
        points: &[Point<Real>],
        velocity: &Vector<Real>,
        dt: Real,
    ) -> Vec<Point<Real>> {
        let offset = velocity * dt;
        points.iter().map(|point| point + offset).collect()
    }

    /// Closest point on the body's surface, or `None` if its shape cannot answer.
    fn closest_surface_point(&self, body: Self::Body, point: &Point<Real>) -> Option<Point<Real>>;

    /// Nearest hit along an unbounded ray, ignoring the character itself.
    fn cast_ray(&self, origin: &Point<Real>, direction: &Vector<Real>) -> Option<Point<Real>>;

    /// Maximum allowed distance between two estimates of one contact point.
    fn contact_offset(&self) -> Real;
}
