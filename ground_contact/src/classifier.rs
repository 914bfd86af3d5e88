use log::{debug, warn};
use rapier3d::math::{Point, UnitVector, Vector};
use rapier3d::prelude::Real;

use crate::angle_between;
use crate::query::{CollisionQuery, ContactEvent};
use crate::registry::{GroundPoints, GroundRegistry};

/// How raw contact points are turned into ground points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContactClassification {
    /// Predict each point one step ahead and confirm it against a second
    /// sample from the contacting body before the slope test. Used when the
    /// body is driven by velocity.
    #[default]
    Validated,
    /// Slope test only. Used when the character position is integrated directly.
    SlopeOnly,
}

#[derive(Clone, Copy, Debug)]
pub struct GroundProfile {
    /// Full capsule height in meters, caps included.
    pub capsule_height: Real,
    /// Capsule radius in meters.
    pub capsule_radius: Real,
    /// Maximum angle in radians between a ground point and straight down.
    pub slope_limit: Real,
    pub classification: ContactClassification,
}

impl Default for GroundProfile {
    fn default() -> Self {
        Self {
            capsule_height: 2.0,
            capsule_radius: 0.5,
            slope_limit: 45.0_f32.to_radians(),
            classification: ContactClassification::Validated,
        }
    }
}

impl GroundProfile {
    /// Distance from the capsule centre to the centre of its lower hemisphere.
    pub fn hemisphere_offset(&self) -> Real {
        (self.capsule_height * 0.5 - self.capsule_radius).max(0.0)
    }
}

/// Character pose and motion at the time a collision callback fires.
#[derive(Clone, Copy, Debug)]
pub struct CharacterFrame {
    pub position: Point<Real>,
    pub up: UnitVector<Real>,
    pub velocity: Vector<Real>,
    pub dt: Real,
}

impl CharacterFrame {
    pub fn lower_hemisphere_center(&self, profile: &GroundProfile) -> Point<Real> {
        self.position - self.up.into_inner() * profile.hemisphere_offset()
    }
}

/// Running totals of classified contact points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierStats {
    pub accepted: u64,
    /// Second sample too far from the predicted point.
    pub stale: u64,
    pub too_steep: u64,
    /// No second sample could be obtained.
    pub unverified: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ContactClassifier {
    profile: GroundProfile,
    stats: ClassifierStats,
}

impl ContactClassifier {
    pub fn new(profile: GroundProfile) -> Self {
        Self {
            profile,
            stats: ClassifierStats::default(),
        }
    }

    pub fn set_profile(&mut self, profile: GroundProfile) {
        self.profile = profile;
    }

    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    /// Applies one collision callback to the registry.
    pub fn handle_event<Q: CollisionQuery>(
        &mut self,
        query: &Q,
        frame: &CharacterFrame,
        event: ContactEvent<Q::Body>,
        registry: &mut GroundRegistry<Q::Body>,
    ) {
        match event {
            ContactEvent::Stay { body, points } => {
                let ground = self.classify(query, frame, body, &points);
                let was_ground = registry.contains(body);
                let is_ground = registry.upsert(body, ground).is_some();
                if was_ground != is_ground {
                    debug!("body {:?} ground contact: {}", body, is_ground);
                }
            }
            ContactEvent::Exit { body } => {
                if registry.remove(body) {
                    debug!("body {:?} ground contact: false (exit)", body);
                }
            }
        }
    }

    /// Ground points among `points`, relative to the lower hemisphere centre.
    pub fn classify<Q: CollisionQuery>(
        &mut self,
        query: &Q,
        frame: &CharacterFrame,
        body: Q::Body,
        points: &[Point<Real>],
    ) -> GroundPoints {
        match self.profile.classification {
            ContactClassification::Validated => self.classify_validated(query, frame, body, points),
            ContactClassification::SlopeOnly => self.classify_slope_only(frame, points),
        }
    }

    fn classify_validated<Q: CollisionQuery>(
        &mut self,
        query: &Q,
        frame: &CharacterFrame,
        body: Q::Body,
        points: &[Point<Real>],
    ) -> GroundPoints {
        let center = frame.lower_hemisphere_center(&self.profile);
        let tolerance = query.contact_offset();
        let predicted = query.predicted_contact_points(points, &frame.velocity, frame.dt);
        let mut ground = GroundPoints::new();
        for point in predicted {
            let local = point - center;
            let second = query
                .closest_surface_point(body, &point)
                .or_else(|| query.cast_ray(&center, &local));
            let Some(second) = second else {
                warn!(
                    "no second contact sample for body {:?} near {:?}; point ignored",
                    body, point
                );
                self.stats.unverified += 1;
                continue;
            };
            if (second - point).norm() > tolerance {
                self.stats.stale += 1;
                continue;
            }
            if !self.within_slope(&local, &frame.up) {
                self.stats.too_steep += 1;
                continue;
            }
            self.stats.accepted += 1;
            ground.push(local);
        }
        ground
    }

    fn classify_slope_only(
        &mut self,
        frame: &CharacterFrame,
        points: &[Point<Real>],
    ) -> GroundPoints {
        let center = frame.lower_hemisphere_center(&self.profile);
        let mut ground = GroundPoints::new();
        for point in points {
            let local = point - center;
            if !self.within_slope(&local, &frame.up) {
                self.stats.too_steep += 1;
                continue;
            }
            self.stats.accepted += 1;
            ground.push(local);
        }
        ground
    }

    fn within_slope(&self, local: &Vector<Real>, up: &UnitVector<Real>) -> bool {
        angle_between(&-up.into_inner(), local) <= self.profile.slope_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Flat floor at y = 0 plus an optional ray answer for bodies without
    /// closest-point support.
    struct FloorQuery {
        closest_point_bodies: Vec<u32>,
        ray_hit: Option<Point<Real>>,
        rays_cast: Cell<u32>,
    }

    impl FloorQuery {
        fn new() -> Self {
            Self {
                closest_point_bodies: vec![1, 2, 3],
                ray_hit: None,
                rays_cast: Cell::new(0),
            }
        }
    }

    impl CollisionQuery for FloorQuery {
        type Body = u32;

        fn closest_surface_point(&self, body: u32, point: &Point<Real>) -> Option<Point<Real>> {
            if !self.closest_point_bodies.contains(&body) {
                return None;
            }
            if point.y <= 0.0 {
                Some(*point)
            } else {
                Some(Point::new(point.x, 0.0, point.z))
            }
        }

        fn cast_ray(
            &self,
            _origin: &Point<Real>,
            _direction: &Vector<Real>,
        ) -> Option<Point<Real>> {
            self.rays_cast.set(self.rays_cast.get() + 1);
            self.ray_hit
        }

        fn contact_offset(&self) -> Real {
            0.01
        }
    }

    /// Uneven terrain whose surface passes through every reported point.
    struct BumpyQuery;

    impl CollisionQuery for BumpyQuery {
        type Body = u32;

        fn closest_surface_point(&self, _body: u32, point: &Point<Real>) -> Option<Point<Real>> {
            Some(*point)
        }

        fn cast_ray(
            &self,
            _origin: &Point<Real>,
            _direction: &Vector<Real>,
        ) -> Option<Point<Real>> {
            None
        }

        fn contact_offset(&self) -> Real {
            0.01
        }
    }

    fn frame(velocity: Vector<Real>) -> CharacterFrame {
        CharacterFrame {
            position: Point::new(0.0, 1.0, 0.0),
            up: Vector::y_axis(),
            velocity,
            dt: 0.02,
        }
    }

    fn classifier(slope_deg: Real, classification: ContactClassification) -> ContactClassifier {
        ContactClassifier::new(GroundProfile {
            capsule_height: 2.0,
            capsule_radius: 0.5,
            slope_limit: slope_deg.to_radians(),
            classification,
        })
    }

    #[test]
    fn flat_contact_becomes_ground_point() {
        let query = FloorQuery::new();
        let mut classifier = classifier(45.0, ContactClassification::Validated);
        let mut registry = GroundRegistry::new();
        classifier.handle_event(
            &query,
            &frame(Vector::zeros()),
            ContactEvent::Stay {
                body: 1,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        let points = registry.points(1).expect("ground");
        assert_eq!(points.len(), 1);
        assert!((points[0] - Vector::new(0.0, -0.5, 0.0)).norm() < 1.0e-6);
        assert_eq!(classifier.stats().accepted, 1);
    }

    #[test]
    fn slope_limit_decides_membership() {
        let query = BumpyQuery;
        // Relative to the hemisphere centre at y = 0.5: straight down, ~44 deg, ~89 deg.
        let straight = Point::new(0.0, 0.0, 0.0);
        let diagonal = Point::new(0.3, 0.19, 0.0);
        let sideways = Point::new(0.5, 0.49, 0.0);
        let cases: [(Real, [bool; 3]); 3] = [
            (0.0, [true, false, false]),
            (45.0, [true, true, false]),
            (90.0, [true, true, true]),
        ];
        for mode in [
            ContactClassification::Validated,
            ContactClassification::SlopeOnly,
        ] {
            for (slope, expected) in cases {
                let points = [straight, diagonal, sideways];
                for (point, keep) in points.into_iter().zip(expected) {
                    let mut classifier = classifier(slope, mode);
                    let mut registry = GroundRegistry::new();
                    classifier.handle_event(
                        &query,
                        &frame(Vector::zeros()),
                        ContactEvent::Stay {
                            body: 1,
                            points: vec![point],
                        },
                        &mut registry,
                    );
                    assert_eq!(
                        registry.contains(1),
                        keep,
                        "{:?} slope {} point {:?}",
                        mode,
                        slope,
                        point
                    );
                    let stats = classifier.stats();
                    assert_eq!(stats.too_steep, u64::from(!keep));
                    assert_eq!(stats.stale + stats.unverified, 0);
                }
            }
        }
    }

    #[test]
    fn all_invalid_points_remove_existing_body() {
        let query = FloorQuery::new();
        let mut classifier = classifier(30.0, ContactClassification::SlopeOnly);
        let mut registry = GroundRegistry::new();
        let frame = frame(Vector::zeros());
        classifier.handle_event(
            &query,
            &frame,
            ContactEvent::Stay {
                body: 2,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        assert!(registry.contains(2));
        classifier.handle_event(
            &query,
            &frame,
            ContactEvent::Stay {
                body: 2,
                points: vec![Point::new(0.5, 0.5, 0.0), Point::new(-0.5, 0.5, 0.0)],
            },
            &mut registry,
        );
        assert!(!registry.contains(2));
        assert!(registry.is_empty());
        assert_eq!(classifier.stats().too_steep, 2);
    }

    #[test]
    fn predicted_point_leaving_surface_is_stale() {
        let query = FloorQuery::new();
        let mut classifier = classifier(45.0, ContactClassification::Validated);
        let mut registry = GroundRegistry::new();
        // Moving up at 5 m/s: the point is predicted 0.1 m above the floor.
        classifier.handle_event(
            &query,
            &frame(Vector::new(0.0, 5.0, 0.0)),
            ContactEvent::Stay {
                body: 1,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        assert!(registry.is_empty());
        assert_eq!(classifier.stats().stale, 1);

        // Moving down keeps the predicted point inside the floor.
        classifier.handle_event(
            &query,
            &frame(Vector::new(0.0, -5.0, 0.0)),
            ContactEvent::Stay {
                body: 1,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        let points = registry.points(1).expect("ground");
        assert!((points[0].y + 0.6).abs() < 1.0e-5);
    }

    #[test]
    fn slope_only_mode_skips_prediction_and_validation() {
        let query = FloorQuery::new();
        let mut classifier = classifier(45.0, ContactClassification::SlopeOnly);
        let mut registry = GroundRegistry::new();
        classifier.handle_event(
            &query,
            &frame(Vector::new(0.0, 5.0, 0.0)),
            ContactEvent::Stay {
                body: 9,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        let points = registry.points(9).expect("ground");
        assert!((points[0].y + 0.5).abs() < 1.0e-6);
        assert_eq!(query.rays_cast.get(), 0);
        assert_eq!(classifier.stats().stale, 0);
    }

    #[test]
    fn raycast_fallback_validates_unsupported_shapes() {
        let mut query = FloorQuery::new();
        query.ray_hit = Some(Point::new(0.0, 0.0, 0.0));
        let mut classifier = classifier(45.0, ContactClassification::Validated);
        let mut registry = GroundRegistry::new();
        classifier.handle_event(
            &query,
            &frame(Vector::zeros()),
            ContactEvent::Stay {
                body: 42,
                points: vec![Point::new(0.0, 0.0, 0.0)],
            },
            &mut registry,
        );
        assert_eq!(query.rays_cast.get(), 1);
        assert!(registry.contains(42));
    }

    #[test]
    fn missing_second_sample_discards_point() {
        let query = FloorQuery::new();
        let mut classifier = classifier(45.0, ContactClassification::Validated);
        let mut registry = GroundRegistry::new();
        classifier.handle_event(
            &query,
            &frame(Vector::zeros()),
            ContactEvent::Stay {
                body: 42,
                points: vec![Point::new(0.0, 0.0, 0.0), Point::new(0.1, 0.0, 0.0)],
            },
            &mut registry,
        );
        assert!(registry.is_empty());
        assert_eq!(classifier.stats().unverified, 2);
        assert_eq!(classifier.stats().accepted, 0);
    }

    #[test]
    fn exit_removes_body_until_next_stay() {
        let query = FloorQuery::new();
        let mut classifier = classifier(45.0, ContactClassification::Validated);
        let mut registry = GroundRegistry::new();
        let frame = frame(Vector::zeros());
        let stay = ContactEvent::Stay {
            body: 3,
            points: vec![Point::new(0.0, 0.0, 0.0)],
        };
        classifier.handle_event(&query, &frame, stay.clone(), &mut registry);
        classifier.handle_event(&query, &frame, ContactEvent::Exit { body: 3 }, &mut registry);
        assert!(!registry.contains(3));
        classifier.handle_event(&query, &frame, ContactEvent::Exit { body: 3 }, &mut registry);
        assert!(!registry.contains(3));
        classifier.handle_event(&query, &frame, stay, &mut registry);
        assert!(registry.contains(3));
    }
}
