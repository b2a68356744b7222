//! 2D geometry operations for walkmesh queries
//!
//! Walkmeshes are Z-up: every planar query works on the XY projection of the mesh.
//! Predicates here are inclusive (touching counts as intersecting) because a query
//! point lying exactly on a shared edge must resolve to one of the two faces.

use glam::{Vec2, Vec3};

/// Tolerance used by the inclusive 2D predicates.
pub const GEOMETRY_EPSILON: f32 = 1e-5;

/// Calculate twice the signed area of a 2D triangle.
///
/// Positive when `a`, `b`, `c` wind counter-clockwise, negative when clockwise,
/// zero for collinear points.
#[inline]
pub fn tri_area_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Check if point c is left of the directed line from a to b.
#[inline]
pub fn left(a: Vec2, b: Vec2, c: Vec2) -> bool {
    tri_area_2d(a, b, c) > 0.0
}

/// Check if point c is right of the directed line from a to b.
#[inline]
pub fn right(a: Vec2, b: Vec2, c: Vec2) -> bool {
    tri_area_2d(a, b, c) < 0.0
}

/// Check if point b lies within the extent of segment a-c.
///
/// Assumes the points are collinear.
#[inline]
pub fn between(a: Vec2, b: Vec2, c: Vec2) -> bool {
    if (a.x - c.x).abs() > GEOMETRY_EPSILON {
        (a.x <= b.x + GEOMETRY_EPSILON && b.x <= c.x + GEOMETRY_EPSILON)
            || (c.x <= b.x + GEOMETRY_EPSILON && b.x <= a.x + GEOMETRY_EPSILON)
    } else {
        (a.y <= b.y + GEOMETRY_EPSILON && b.y <= c.y + GEOMETRY_EPSILON)
            || (c.y <= b.y + GEOMETRY_EPSILON && b.y <= a.y + GEOMETRY_EPSILON)
    }
}

/// Check if two 2D axis-aligned boxes overlap.
#[inline]
pub fn overlap_bounds_2d(amin: Vec2, amax: Vec2, bmin: Vec2, bmax: Vec2) -> bool {
    amin.x <= bmax.x && amax.x >= bmin.x && amin.y <= bmax.y && amax.y >= bmin.y
}

/// Check if a point lies inside a 2D axis-aligned box (inclusive).
#[inline]
pub fn point_in_bounds_2d(p: Vec2, min: Vec2, max: Vec2) -> bool {
    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
}

/// Check if two 2D line segments intersect, including touching at endpoints.
pub fn segments_intersect_2d(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = tri_area_2d(b1, b2, a1);
    let d2 = tri_area_2d(b1, b2, a2);
    let d3 = tri_area_2d(a1, a2, b1);
    let d4 = tri_area_2d(a1, a2, b2);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }

    // Touching endpoints and collinear overlap
    (d1.abs() < GEOMETRY_EPSILON && between(b1, a1, b2))
        || (d2.abs() < GEOMETRY_EPSILON && between(b1, a2, b2))
        || (d3.abs() < GEOMETRY_EPSILON && between(a1, b1, a2))
        || (d4.abs() < GEOMETRY_EPSILON && between(a1, b2, a2))
}

/// Check if a point lies inside (or on the border of) a triangle.
///
/// Works for both windings.
pub fn point_in_triangle_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = tri_area_2d(a, b, p);
    let d2 = tri_area_2d(b, c, p);
    let d3 = tri_area_2d(c, a, p);

    // Scale the tolerance with the triangle so huge and tiny faces behave alike
    let eps = GEOMETRY_EPSILON * tri_area_2d(a, b, c).abs().max(1.0);
    let has_neg = d1 < -eps || d2 < -eps || d3 < -eps;
    let has_pos = d1 > eps || d2 > eps || d3 > eps;

    !(has_neg && has_pos)
}

/// Check if a point is inside a 2D polygon.
///
/// Uses the winding number algorithm.
pub fn point_in_polygon_2d(p: Vec2, verts: &[Vec2]) -> bool {
    let n = verts.len();
    let mut winding = 0;

    for i in 0..n {
        let v1 = verts[i];
        let v2 = verts[(i + 1) % n];

        if v1.y <= p.y {
            if v2.y > p.y && left(v1, v2, p) {
                winding += 1;
            }
        } else if v2.y <= p.y && right(v1, v2, p) {
            winding -= 1;
        }
    }

    winding != 0
}

/// Parameter range of the segment `a`-`b` lying inside a triangle.
///
/// Cyrus-Beck clipping against the three edges, inclusive within
/// [`GEOMETRY_EPSILON`]. Returns `None` when the segment misses the triangle or the
/// triangle is degenerate in the XY projection.
pub fn clip_segment_triangle_2d(a: Vec2, b: Vec2, tri: [Vec2; 3]) -> Option<(f32, f32)> {
    let area = tri_area_2d(tri[0], tri[1], tri[2]);
    if area.abs() < f32::EPSILON {
        return None;
    }

    let sign = area.signum();
    let d = b - a;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for i in 0..3 {
        let (p, q) = (tri[i], tri[(i + 1) % 3]);
        let edge = q - p;
        // Signed distance to the edge line, scaled by its length: start + t * slope
        let start = sign * edge.perp_dot(a - p);
        let slope = sign * edge.perp_dot(d);
        let tol = GEOMETRY_EPSILON * edge.length();

        if slope.abs() < f32::EPSILON {
            if start < -tol {
                return None;
            }
            continue;
        }

        let t = (-tol - start) / slope;
        if slope > 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((t0, t1))
}

/// Check if a segment touches an axis-aligned box.
///
/// Liang-Barsky clipping against the box slabs.
pub fn segment_intersects_bounds_2d(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> bool {
    let d = b - a;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;

    for axis in 0..2 {
        let (origin, delta, lo, hi) = (a[axis], d[axis], min[axis], max[axis]);
        if delta.abs() < f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }

        let mut near = (lo - origin) / delta;
        let mut far = (hi - origin) / delta;
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        t0 = t0.max(near);
        t1 = t1.min(far);
        if t0 > t1 {
            return false;
        }
    }

    true
}

/// Check if two convex or concave polygons touch.
///
/// Either one contains a vertex of the other, or two of their edges cross.
pub fn polygons_intersect_2d(a: &[Vec2], b: &[Vec2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let contains = |poly: &[Vec2], p: Vec2| {
        if poly.len() == 3 {
            point_in_triangle_2d(p, poly[0], poly[1], poly[2])
        } else {
            point_in_polygon_2d(p, poly)
        }
    };

    if contains(a, b[0]) || contains(b, a[0]) {
        return true;
    }

    for i in 0..a.len() {
        let (a1, a2) = (a[i], a[(i + 1) % a.len()]);
        for j in 0..b.len() {
            if segments_intersect_2d(a1, a2, b[j], b[(j + 1) % b.len()]) {
                return true;
            }
        }
    }

    false
}

/// Check if a triangle touches an axis-aligned box.
pub fn triangle_intersects_bounds_2d(tri: [Vec2; 3], min: Vec2, max: Vec2) -> bool {
    let square = bounds_polygon_2d(min, max);
    polygons_intersect_2d(&tri, &square)
}

/// The four corners of a box, counter-clockwise from `min`.
pub fn bounds_polygon_2d(min: Vec2, max: Vec2) -> [Vec2; 4] {
    [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
}

/// Height of the plane through a triangle at the given XY position.
///
/// Returns `None` for triangles that are degenerate in the XY projection.
pub fn triangle_height_at(p: Vec2, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let (a2, b2, c2) = (a.truncate(), b.truncate(), c.truncate());
    let area = tri_area_2d(a2, b2, c2);
    if area.abs() < f32::EPSILON {
        return None;
    }

    let wa = tri_area_2d(b2, c2, p) / area;
    let wb = tri_area_2d(c2, a2, p) / area;
    let wc = 1.0 - wa - wb;
    Some(wa * a.z + wb * b.z + wc * c.z)
}

/// Rotate a 2D vector by an angle given as its cosine and sine.
#[inline]
pub fn rotate_2d(v: Vec2, cos: f32, sin: f32) -> Vec2 {
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
