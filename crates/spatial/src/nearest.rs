use nalgebra::Point3;
use plypick_core::{Placement, Ray};

use crate::octree::{Neighbor, PointOctree};

/// Result of a successful [`search_nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Index into the cloud the octree was built from.
    pub index: usize,
    pub local: Point3<f32>,
    pub world: Point3<f32>,
}

/// Candidate closest to `origin`. Ties keep the earlier candidate.
pub fn closest_to_origin(candidates: &[Neighbor], origin: &Point3<f32>) -> Option<Neighbor> {
    let mut best: Option<(f32, Neighbor)> = None;
    for c in candidates {
        let d2 = (Point3::from(c.position) - origin).norm_squared();
        if best.map_or(true, |(b, _)| d2 < b) {
            best = Some((d2, *c));
        }
    }
    best.map(|(_, c)| c)
}

/// Pick the point nearest to the origin of `world_ray` among those within
/// `tolerance` of the ray.
///
/// The ray is taken into the cloud's local frame through `placement` and
/// `tolerance` is measured there. Returns `None` when there is no index,
/// the placement cannot be inverted, or nothing lies within tolerance.
pub fn search_nearest(
    index: Option<&PointOctree>,
    placement: &Placement,
    world_ray: &Ray,
    tolerance: f32,
) -> Option<NearestHit> {
    let index = index?;
    let local_ray = placement.ray_to_local(world_ray)?;
    let candidates = index.nearby(&local_ray, tolerance);
    let best = closest_to_origin(&candidates, &local_ray.origin)?;

    let local = Point3::from(best.position);
    Some(NearestHit {
        index: best.index,
        local,
        world: placement.to_world(&local),
    })
}
