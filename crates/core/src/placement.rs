use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::Ray;

/// Where a point cloud sits inside the host scene.
///
/// The forward transform is `world = position + rotation * (scale ∘ local)`,
/// with the rotation built from Euler angles in degrees applied about Z,
/// then X, then Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vector3<f32>,
    pub rotation_degrees: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation_degrees: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn new(position: Vector3<f32>, rotation_degrees: Vector3<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation_degrees,
            scale,
        }
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        let r = self.rotation_degrees.map(f32::to_radians);
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), r.y)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), r.x)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), r.z)
    }

    pub fn to_world(&self, local: &Point3<f32>) -> Point3<f32> {
        let scaled = local.coords.component_mul(&self.scale);
        Point3::from(self.rotation() * scaled + self.position)
    }

    /// Exact inverse of [`to_world`](Self::to_world). A zero scale component
    /// yields non-finite coordinates.
    pub fn to_local(&self, world: &Point3<f32>) -> Point3<f32> {
        let unrotated = self.rotation().inverse() * (world.coords - self.position);
        Point3::from(unrotated.component_div(&self.scale))
    }

    /// Carry a world-space ray into the cloud's local frame.
    ///
    /// The direction is taken from two transformed points rather than
    /// rotated directly so non-uniform scale bends it correctly. Returns
    /// `None` when the placement is degenerate.
    pub fn ray_to_local(&self, world: &Ray) -> Option<Ray> {
        let origin = self.to_local(&world.origin);
        let ahead = self.to_local(&world.point_at(1.0));
        Ray::new(origin, ahead - origin)
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}
