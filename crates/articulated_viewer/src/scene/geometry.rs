//! Geometry primitives and intersection algorithms
//!
//! Rays, axis-aligned bounding boxes, triangles and triangle meshes with the
//! intersection tests used by pointer picking.

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{utils, Mat4, Vec3, EPSILON};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// A zero-length direction falls back to `-Z`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: utils::try_normalize(&direction).unwrap_or_else(|| -Vec3::z()),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transform the ray by an affine matrix
    ///
    /// The direction is not renormalized, so distances measured along the
    /// returned ray stay in the parameterization of the source ray.
    pub fn transformed_unnormalized(&self, matrix: &Mat4) -> Self {
        Self {
            origin: utils::transform_point(matrix, &self.origin),
            direction: utils::transform_vector(matrix, &self.direction),
        }
    }
}

/// Result of a ray intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// The mesh node that was hit
    pub node: NodeKey,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
}

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty slice
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Self::new(*first, *first);
        for p in rest {
            aabb.min = aabb.min.inf(p);
            aabb.max = aabb.max.sup(p);
        }
        Some(aabb)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        let m = Vec3::repeat(margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Axis-aligned bounds of this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];
        let world: Vec<Vec3> = corners
            .iter()
            .map(|c| utils::transform_point(matrix, c))
            .collect();
        Self::from_points(&world).unwrap_or(*self)
    }

    /// Test ray intersection with this AABB using the slab method
    ///
    /// Returns the distance to the entry point (0 when the origin is inside).
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray.direction.x != 0.0 { 1.0 / ray.direction.x } else { f32::INFINITY },
            if ray.direction.y != 0.0 { 1.0 / ray.direction.y } else { f32::INFINITY },
            if ray.direction.z != 0.0 { 1.0 / ray.direction.z } else { f32::INFINITY },
        );

        let mut tmin = f32::NEG_INFINITY;
        let mut tmax = f32::INFINITY;
        for axis in 0..3 {
            let t1 = (self.min[axis] - ray.origin[axis]) * inv_dir[axis];
            let t2 = (self.max[axis] - ray.origin[axis]) * inv_dir[axis];
            // 0 * inf on an axis-parallel ray through a slab face
            let (t1, t2) = if t1.is_nan() || t2.is_nan() {
                (f32::NEG_INFINITY, f32::INFINITY)
            } else {
                (t1, t2)
            };
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));
        }

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

// Rays through a shared edge must hit at least one of its triangles
const EDGE_TOLERANCE: f32 = 1e-5;

/// A triangle for ray tests
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Möller-Trumbore ray-triangle intersection (double sided)
    ///
    /// Returns the ray parameter `t` of the hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t >= 0.0).then_some(t)
    }
}

/// Renderable triangle geometry in mesh-local space
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Option<Aabb>,
}

impl MeshGeometry {
    /// Create geometry from vertex positions and triangle indices
    ///
    /// Trailing indices that do not form a whole triangle, and triangles that
    /// reference missing vertices, are ignored by the intersection test.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            positions,
            indices,
            bounds,
        }
    }

    /// Axis-aligned box centred on the origin with the given full size
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Self::new(positions, indices)
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Local-space bounds, `None` for empty geometry
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Number of whole triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let v0 = *self.positions.get(tri[0] as usize)?;
            let v1 = *self.positions.get(tri[1] as usize)?;
            let v2 = *self.positions.get(tri[2] as usize)?;
            Some(Triangle::new(v0, v1, v2))
        })
    }

    /// Nearest hit of a world-space ray against this geometry
    ///
    /// `world` is the mesh's world matrix. The ray is moved into mesh-local
    /// space, pre-tested against the local bounds, then tested per triangle.
    /// Returns the world-space distance and hit point.
    pub fn intersect_world_ray(&self, ray: &Ray, world: &Mat4) -> Option<(f32, Vec3)> {
        let inverse = world.try_inverse()?;
        let local_ray = ray.transformed_unnormalized(&inverse);
        let bounds = self.bounds?;
        let local_dir_len = local_ray.direction.magnitude();
        if local_dir_len < EPSILON {
            return None;
        }
        let unit_local = Ray {
            origin: local_ray.origin,
            direction: local_ray.direction / local_dir_len,
        };
        bounds.intersect_ray(&unit_local)?;

        let t_local = self
            .triangles()
            .filter_map(|tri| tri.intersect_ray(&unit_local))
            .fold(None, |best: Option<f32>, t| Some(best.map_or(t, |b| b.min(t))))?;

        let local_point = unit_local.point_at(t_local);
        let world_point = utils::transform_point(world, &local_point);
        let distance = (world_point - ray.origin).dot(&ray.direction);
        Some((distance, world_point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_ray_hit_and_miss() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        let hit = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(aabb.intersect_ray(&hit).unwrap(), 4.0, epsilon = 1e-5);

        let miss = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(aabb.intersect_ray(&miss).is_none());

        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(aabb.intersect_ray(&behind).is_none());
    }

    #[test]
    fn test_aabb_expanded_catches_near_miss() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(1.05, 0.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(aabb.intersect_ray(&ray).is_none());
        assert!(aabb.expanded(0.1).intersect_ray(&ray).is_some());
    }

    #[test]
    fn test_triangle_hit() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(tri.intersect_ray(&ray).unwrap(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_mesh_world_ray_respects_transform() {
        let cube = MeshGeometry::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let world = Transform::from_position(Vec3::new(0.0, 0.0, -3.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0))
            .to_matrix();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));

        let (distance, point) = cube.intersect_world_ray(&ray, &world).unwrap();
        // scaled cube spans z in [-4, -2]
        assert_relative_eq!(distance, 7.0, epsilon = 1e-4);
        assert_relative_eq!(point.z, -2.0, epsilon = 1e-4);

        let off = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(cube.intersect_world_ray(&off, &world).is_none());
    }
}
