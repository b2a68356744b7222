//! 3D vector utilities

use glam::Vec3;

/// Unit normal of a triangle, or zero for a degenerate triangle
pub fn triangle_normal(v0: &Vec3, v1: &Vec3, v2: &Vec3) -> Vec3 {
    (*v1 - *v0).cross(*v2 - *v0).normalize_or_zero()
}

/// Checks if a ray intersects a triangle
///
/// Returns the ray parameter `t` of the hit, with `t > 0`.
pub fn ray_triangle_intersection(
    origin: &Vec3,
    direction: &Vec3,
    v0: &Vec3,
    v1: &Vec3,
    v2: &Vec3,
) -> Option<f32> {
    // Möller–Trumbore algorithm
    let edge1 = *v1 - *v0;
    let edge2 = *v2 - *v0;

    let h = direction.cross(edge2);
    let a = edge1.dot(h);

    // This ray is parallel to the triangle
    if a.abs() < f32::EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = *origin - *v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);

    if t > f32::EPSILON {
        return Some(t);
    }

    None
}

/// Checks if the segment `start`-`end` crosses a triangle
///
/// Returns the intersection point closest to `start`.
pub fn segment_triangle_intersection(
    start: &Vec3,
    end: &Vec3,
    v0: &Vec3,
    v1: &Vec3,
    v2: &Vec3,
) -> Option<Vec3> {
    let direction = *end - *start;
    let t = ray_triangle_intersection(start, &direction, v0, v1, v2)?;
    (t <= 1.0).then(|| *start + direction * t)
}
