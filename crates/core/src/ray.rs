use nalgebra::{Point3, Vector3};

/// A half-line with a unit-length direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    direction: Vector3<f32>,
}

impl Ray {
    /// Returns `None` when the direction is zero-length or not finite, or
    /// the origin is not finite.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Option<Self> {
        if !origin.iter().all(|v| v.is_finite()) || !direction.iter().all(|v| v.is_finite()) {
            return None;
        }
        let norm = direction.norm();
        if norm <= f32::EPSILON || !norm.is_finite() {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / norm,
        })
    }

    pub fn from_arrays(origin: [f32; 3], direction: [f32; 3]) -> Option<Self> {
        Self::new(Point3::from(origin), Vector3::from(direction))
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Squared distance from `p` to the infinite line carrying this ray.
    pub fn squared_distance_to_line(&self, p: &Point3<f32>) -> f32 {
        self.direction.cross(&(p - self.origin)).norm_squared()
    }
}
