//! String pulling of a face path, widened for the agent
//!
//! The funnel runs over the portals (shared edges) between consecutive faces. With a
//! non-zero width, portal corners next to blocked ground are approached along the
//! tangent of a circle of half the agent width around the corner instead of the
//! corner itself, and corners that end up on the path are replaced by two points
//! stepping around them.

use glam::{Vec2, Vec3};
use walkmesh::Walkmesh;
use walkmesh_common::{rotate_2d, tri_area_2d, GEOMETRY_EPSILON};

/// Side of the travel direction a portal corner lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    /// Start and end points, which have no obstacle of their own
    Center,
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    pos: Vec2,
    height: f32,
    side: Side,
    /// Blocked ground within half the agent width, so the path must keep clear
    obstructed: bool,
}

impl Corner {
    fn point(pos: Vec2, height: f32) -> Self {
        Self {
            pos,
            height,
            side: Side::Center,
            obstructed: false,
        }
    }

    /// Side the agent must clear, if any
    fn clearance_side(&self) -> Side {
        if self.obstructed {
            self.side
        } else {
            Side::Center
        }
    }
}

/// Funnel smoothing over one walkmesh
#[derive(Debug, Clone, Copy)]
pub struct Funnel<'a> {
    walkmesh: &'a Walkmesh,
    half_width: f32,
    stop_length: Option<f32>,
}

impl<'a> Funnel<'a> {
    /// Creates a funnel for an agent of `width`
    ///
    /// Width correction is only applied to corners within `stop_length` of the
    /// start, or everywhere when it is `None`.
    pub fn new(walkmesh: &'a Walkmesh, width: f32, stop_length: Option<f32>) -> Self {
        Self {
            walkmesh,
            half_width: (width * 0.5).max(0.0),
            stop_length,
        }
    }

    /// Turns a face path into a polyline from `start` to `end`
    ///
    /// The polyline always starts at `start` and ends at `end`; heights are taken
    /// from the walkmesh.
    ///
    /// # Panics
    ///
    /// Panics if consecutive faces of `path` are not adjacent.
    pub fn smooth(&self, start: Vec2, end: Vec2, path: &[u32]) -> Vec<Vec3> {
        let start_corner = Corner::point(start, self.height(start, None));
        let end_corner = Corner::point(end, self.height(end, None));

        if path.len() < 2 {
            return vec![lift(&start_corner), lift(&end_corner)];
        }

        let portals = self.portals(start_corner, end_corner, path);
        let corners = self.pull(&portals);
        if corners.len() < 2 {
            return vec![lift(&start_corner), lift(&end_corner)];
        }

        if self.half_width > 0.0 {
            self.step_around(&corners)
        } else {
            corners.iter().map(lift).collect()
        }
    }

    fn height(&self, p: Vec2, fallback: Option<f32>) -> f32 {
        self.walkmesh
            .height_at(p)
            .or(fallback)
            .unwrap_or(0.0)
    }

    fn within_stop_length(&self, start: Vec2, p: Vec2) -> bool {
        self.stop_length.map_or(true, |stop| start.distance(p) <= stop)
    }

    fn corner(&self, start: Vec2, vertex: Vec3, side: Side) -> Corner {
        let pos = vertex.truncate();
        let obstructed = self.half_width > 0.0
            && self.within_stop_length(start, pos)
            && !self.walkmesh.walkable_aa_square(pos, self.half_width);
        Corner {
            pos,
            height: vertex.z,
            side,
            obstructed,
        }
    }

    /// Left and right end of every shared edge along the path
    ///
    /// Start and end are zero-width portals at either end.
    fn portals(&self, start: Corner, end: Corner, path: &[u32]) -> Vec<(Corner, Corner)> {
        let vertices = self.walkmesh.vertices();
        let mut portals = Vec::with_capacity(path.len() + 1);
        portals.push((start, start));

        for pair in path.windows(2) {
            let [a, b] = self
                .walkmesh
                .get_shared_vertices(pair[0], pair[1])
                .map(|v| vertices[v as usize]);
            let center = self.walkmesh.face_center(pair[0]).truncate();
            let mid = (a.truncate() + b.truncate()) * 0.5;

            // Travel runs from the face center through the edge
            let (left, right) = if tri_area_2d(center, mid, a.truncate()) > 0.0 {
                (a, b)
            } else {
                (b, a)
            };
            portals.push((
                self.corner(start.pos, left, Side::Left),
                self.corner(start.pos, right, Side::Right),
            ));
        }

        portals.push((end, end));
        portals
    }

    /// Direction from the apex towards a corner, bent to pass the corners at a
    /// distance of half the agent width
    ///
    /// Returns a point on the corrected direction, or the corner itself when no
    /// correction applies.
    fn feeler(&self, apex: &Corner, target: &Corner) -> Vec2 {
        let v = target.pos - apex.pos;
        let len = v.length();
        if len < GEOMETRY_EPSILON {
            return target.pos;
        }
        let hw = self.half_width;

        let (offset, counter_clockwise) = match (apex.clearance_side(), target.clearance_side()) {
            (Side::Center, Side::Center) => return target.pos,
            // Free apex, passing a corner
            (Side::Center, side) => (hw, side == Side::Right),
            // Leaving a corner towards a free point
            (side, Side::Center) => (hw, side == Side::Left),
            // Corners on the same side share a parallel tangent
            (apex_side, target_side) if apex_side == target_side => return target.pos,
            // Crossing from one side to the other
            (apex_side, _) => (hw, apex_side == Side::Left),
        };

        if len <= offset {
            // Too close for a tangent
            return target.pos;
        }
        let sin = offset / len;
        let cos = (len * len - offset * offset).max(0.0).sqrt() / len;
        let sin = if counter_clockwise { sin } else { -sin };
        apex.pos + rotate_2d(v, cos, sin)
    }

    /// Portal corner as seen from the apex, without correction on the apex edge
    fn sight(&self, apex: &Corner, apex_index: usize, target: &Corner, index: usize) -> Vec2 {
        if index == apex_index + 1 {
            target.pos
        } else {
            self.feeler(apex, target)
        }
    }

    /// Simple stupid funnel over the portals, returning the corners of the path
    fn pull(&self, portals: &[(Corner, Corner)]) -> Vec<Corner> {
        let first = portals[0].0;
        let mut corners = vec![first];

        let mut apex = first;
        let mut apex_index = 0;
        let (mut left, mut left_feeler, mut left_index) = (first, first.pos, 0);
        let (mut right, mut right_feeler, mut right_index) = (first, first.pos, 0);

        let mut i = 1;
        while i < portals.len() {
            let (new_left, new_right) = portals[i];

            let candidate = self.sight(&apex, apex_index, &new_right, i);
            if tri_area_2d(apex.pos, right_feeler, candidate) >= 0.0 {
                if same(apex.pos, right.pos) || tri_area_2d(apex.pos, left_feeler, candidate) < 0.0
                {
                    // Tighten the funnel
                    right = new_right;
                    right_feeler = candidate;
                    right_index = i;
                } else {
                    // Right over left: the left corner becomes the new apex
                    push_corner(&mut corners, left);
                    apex = left;
                    apex_index = left_index;
                    (left, left_feeler, left_index) = (apex, apex.pos, apex_index);
                    (right, right_feeler, right_index) = (apex, apex.pos, apex_index);
                    i = apex_index + 1;
                    continue;
                }
            }

            let candidate = self.sight(&apex, apex_index, &new_left, i);
            if tri_area_2d(apex.pos, left_feeler, candidate) <= 0.0 {
                if same(apex.pos, left.pos) || tri_area_2d(apex.pos, right_feeler, candidate) > 0.0
                {
                    left = new_left;
                    left_feeler = candidate;
                    left_index = i;
                } else {
                    // Left over right: the right corner becomes the new apex
                    push_corner(&mut corners, right);
                    apex = right;
                    apex_index = right_index;
                    (left, left_feeler, left_index) = (apex, apex.pos, apex_index);
                    (right, right_feeler, right_index) = (apex, apex.pos, apex_index);
                    i = apex_index + 1;
                    continue;
                }
            }

            i += 1;
        }

        push_corner(&mut corners, portals[portals.len() - 1].0);
        corners
    }

    /// Replaces obstructed corners by two points half the width off the corner,
    /// one square to the incoming and one to the outgoing leg
    fn step_around(&self, corners: &[Corner]) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(corners.len() * 2);
        points.push(lift(&corners[0]));

        for k in 1..corners.len() - 1 {
            let corner = corners[k];
            if corner.clearance_side() == Side::Center {
                points.push(lift(&corner));
                continue;
            }

            let away = |dir: Vec2| {
                let d = dir.normalize_or_zero();
                let normal = if corner.side == Side::Left {
                    Vec2::new(d.y, -d.x)
                } else {
                    Vec2::new(-d.y, d.x)
                };
                corner.pos + normal * self.half_width
            };
            let incoming = away(corner.pos - corners[k - 1].pos);
            let outgoing = away(corners[k + 1].pos - corner.pos);

            points.push(incoming.extend(self.height(incoming, Some(corner.height))));
            if !same(incoming, outgoing) {
                points.push(outgoing.extend(self.height(outgoing, Some(corner.height))));
            }
        }

        if let Some(last) = corners.last() {
            points.push(lift(last));
        }
        points
    }
}

fn lift(corner: &Corner) -> Vec3 {
    corner.pos.extend(corner.height)
}

fn push_corner(corners: &mut Vec<Corner>, corner: Corner) {
    if corners.last().map_or(true, |c| !same(c.pos, corner.pos)) {
        corners.push(corner);
    }
}

fn same(a: Vec2, b: Vec2) -> bool {
    a.distance_squared(b) < GEOMETRY_EPSILON * GEOMETRY_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::*;

    #[test]
    fn test_straight_two_face_path() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 0.0, None);
        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(3.0, 0.0);

        let points = funnel.smooth(start, end, &[0, 1]);
        assert_eq!(points, vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_single_face_path() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 1.0, None);
        let points = funnel.smooth(Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.1), &[0]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], Vec3::new(0.5, 0.1, 0.0));
    }

    #[test]
    fn test_portal_sides_follow_travel() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 0.0, None);
        let start = Corner::point(Vec2::ZERO, 0.0);
        let end = Corner::point(Vec2::new(3.0, 0.0), 0.0);

        let forward = funnel.portals(start, end, &[0, 1]);
        assert_eq!(forward.len(), 3);
        assert_eq!(forward[1].0.pos, Vec2::new(1.0, 1.0));
        assert_eq!(forward[1].1.pos, Vec2::new(1.0, -1.0));

        let backward = funnel.portals(end, start, &[1, 0]);
        assert_eq!(backward[1].0.pos, Vec2::new(1.0, -1.0));
        assert_eq!(backward[1].1.pos, Vec2::new(1.0, 1.0));
    }

    /// Face path from the lower left quad of [`doorway`] through the door into the
    /// upper right quad, with end points that cannot see each other
    fn door_route() -> (Vec<u32>, Vec2, Vec2) {
        let path = vec![
            doorway_face(0, 0, true),
            doorway_face(0, 1, false),
            doorway_face(1, 1, true),
            doorway_face(1, 1, false),
            doorway_face(2, 1, true),
            doorway_face(2, 2, false),
            doorway_face(2, 2, true),
        ];
        (path, Vec2::new(3.0, 1.3), Vec2::new(5.5, 3.9))
    }

    #[test]
    fn test_path_bends_around_a_wall() {
        let walkmesh = doorway(1.0);
        let (path, start, end) = door_route();
        for pair in path.windows(2) {
            assert!(walkmesh.get_adjacent_faces(pair[0]).any(|f| f == pair[1]));
        }
        assert_eq!(walkmesh.find_face(start.x, start.y, true), Some(path[0]));
        assert_eq!(walkmesh.find_face(end.x, end.y, true), Some(path[6]));

        let points = Funnel::new(&walkmesh, 0.0, None).smooth(start, end, &path);

        // Taut around the upper door post
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].truncate(), start);
        assert_eq!(points[1], Vec3::new(5.0, 2.5, 0.0));
        assert_eq!(points[2].truncate(), end);
    }

    #[test]
    fn test_width_keeps_clear_of_corners() {
        let walkmesh = doorway(1.0);
        let (path, start, end) = door_route();
        let width = 0.4;
        let points = Funnel::new(&walkmesh, width, None).smooth(start, end, &path);

        assert_eq!(points.first().unwrap().truncate(), start);
        assert_eq!(points.last().unwrap().truncate(), end);
        // The post is replaced by two points stepping around it
        assert_eq!(points.len(), 4);
        for p in &points {
            assert!(p.is_finite());
        }

        for post in [Vec2::new(4.0, 1.5), Vec2::new(5.0, 2.5)] {
            for p in &points {
                assert!(p.truncate().distance(post) >= width * 0.5 - 1e-4);
            }
        }
        for p in &points[1..points.len() - 1] {
            assert!(walkmesh.walkable(p.truncate()), "{p} is off the walkmesh");
        }
    }

    #[test]
    fn test_stop_length_limits_correction() {
        let walkmesh = doorway(1.0);
        let (path, start, end) = door_route();

        let plain = Funnel::new(&walkmesh, 0.0, None).smooth(start, end, &path);
        let stopped = Funnel::new(&walkmesh, 0.4, Some(0.5)).smooth(start, end, &path);
        assert_eq!(plain, stopped);
    }

    #[test]
    fn test_feeler_degenerate_lengths() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 2.0, None);
        let apex = Corner::point(Vec2::ZERO, 0.0);
        let close = Corner {
            pos: Vec2::new(0.5, 0.0),
            height: 0.0,
            side: Side::Left,
            obstructed: true,
        };
        // Closer than half the width: no tangent, no NaN
        assert_eq!(funnel.feeler(&apex, &close), close.pos);
        assert_eq!(funnel.feeler(&apex, &apex), apex.pos);

        let far = Corner {
            pos: Vec2::new(10.0, 0.0),
            ..close
        };
        let bent = funnel.feeler(&apex, &far);
        // A left corner is passed on its right
        assert!(bent.y < 0.0);
        assert!((bent.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_feeler_between_obstructed_corners() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 2.0, None);
        let corner = |x: f32, side: Side| Corner {
            pos: Vec2::new(x, 0.0),
            height: 0.0,
            side,
            obstructed: true,
        };

        // Crossing sides bends by the tangent of one half width
        let bent = funnel.feeler(&corner(0.0, Side::Left), &corner(10.0, Side::Right));
        assert!((bent.x - 9.949874).abs() < 1e-4, "{bent}");
        assert!((bent.y - 1.0).abs() < 1e-4, "{bent}");

        let bent = funnel.feeler(&corner(0.0, Side::Right), &corner(10.0, Side::Left));
        assert!((bent.y + 1.0).abs() < 1e-4, "{bent}");

        // Corners on one side are joined straight
        let target = corner(10.0, Side::Left);
        assert_eq!(funnel.feeler(&corner(0.0, Side::Left), &target), target.pos);
    }

    #[test]
    fn test_apex_edge_is_not_widened() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 2.0, None);
        let start = Corner::point(Vec2::ZERO, 0.0);
        let end = Corner::point(Vec2::new(4.0, 0.0), 0.0);
        let post = Corner {
            pos: Vec2::new(2.0, 0.0),
            height: 0.0,
            side: Side::Right,
            obstructed: true,
        };
        let free = Corner {
            pos: Vec2::new(2.0, 0.5),
            side: Side::Left,
            obstructed: false,
            ..post
        };

        // Bent, the post would swing past the left corner and turn the path
        assert!(tri_area_2d(start.pos, free.pos, funnel.feeler(&start, &post)) > 0.0);

        let corners = funnel.pull(&[(start, start), (free, post), (end, end)]);
        let points: Vec<Vec2> = corners.iter().map(|c| c.pos).collect();
        assert_eq!(points, vec![start.pos, end.pos]);
    }

    #[test]
    fn test_portal_on_the_apex_adds_no_corner() {
        let walkmesh = two_triangles();
        let funnel = Funnel::new(&walkmesh, 0.0, None);
        let start = Corner::point(Vec2::ZERO, 0.0);
        let end = Corner::point(Vec2::new(2.0, 1.0), 0.0);
        let on_start = Corner {
            side: Side::Left,
            ..start
        };
        let right = Corner {
            pos: Vec2::new(1.0, -1.0),
            side: Side::Right,
            ..start
        };

        let corners = funnel.pull(&[(start, start), (on_start, right), (end, end)]);
        let points: Vec<Vec2> = corners.iter().map(|c| c.pos).collect();
        assert_eq!(points, vec![start.pos, end.pos]);
    }
}
