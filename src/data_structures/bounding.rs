//! Bounding volumes for coarse visibility and collision queries.

use cgmath::{InnerSpace, Matrix4, Vector3};

/// A sphere conservatively containing a mesh's geometry.
///
/// Stored in the space it was computed in (local space for the base sphere
/// of a model); [`transform`](Self::transform) carries it into world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vector3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Build the sphere around a point cloud: AABB center, radius out to
    /// the farthest point. An empty cloud yields the zero sphere.
    pub fn from_points<'a>(points: impl Iterator<Item = &'a [f32; 3]> + Clone) -> Self {
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        let mut any = false;
        for p in points.clone() {
            any = true;
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }
        if !any {
            return Self::new(Vector3::new(0.0, 0.0, 0.0), 0.0);
        }
        let center = (min + max) * 0.5;
        let radius = points
            .map(|p| (Vector3::new(p[0], p[1], p[2]) - center).magnitude())
            .fold(0.0f32, f32::max);
        Self { center, radius }
    }

    /// Transform the sphere by a world matrix: the center goes through the
    /// full matrix, the radius scales by the largest axis scale factor.
    pub fn transform(&self, world: &Matrix4<f32>) -> Self {
        let center = (world * self.center.extend(1.0)).truncate();
        let scale = world.x.truncate().magnitude()
            .max(world.y.truncate().magnitude())
            .max(world.z.truncate().magnitude());
        Self {
            center,
            radius: self.radius * scale,
        }
    }
}
