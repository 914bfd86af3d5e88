//! Ground contact classification and the per-body ground point registry.
//!
//! Collision callbacks feed [`ContactEvent`]s through a [`ContactClassifier`],
//! which keeps a [`GroundRegistry`] up to date. The registry is what the
//! movement motor reads to decide whether the character stands on something
//! and which way the ground under it is tilted.
#![forbid(unsafe_code)]

mod classifier;
mod query;
pub mod rapier;
mod registry;

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

pub use classifier::{
    CharacterFrame, ClassifierStats, ContactClassification, ContactClassifier, GroundProfile,
};
pub use query::{CollisionQuery, ContactEvent};
pub use registry::{GroundPoints, GroundRegistry, GroundSlot};

/// Unsigned angle between two vectors in radians.
///
/// Returns 0 when either vector is (close to) zero length.
pub fn angle_between(a: &Vector<Real>, b: &Vector<Real>) -> Real {
    let denom = (a.norm_squared() * b.norm_squared()).sqrt();
    if denom <= 1.0e-15 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}
