//! Spatial and walkability queries on a finalized walkmesh
//!
//! Every query runs a broad phase over the room trees and confirms candidates with
//! exact geometry. Region queries treat space outside the walkmesh as blocked.

use glam::{Vec2, Vec3};
use walkmesh_common::{
    clip_segment_triangle_2d, point_in_triangle_2d, polygons_intersect_2d,
    segment_triangle_intersection, triangle_height_at, triangle_intersects_bounds_2d,
    GEOMETRY_EPSILON,
};

use crate::walkmesh::{Walkmesh, POLYGON_EDGES};

/// Length a segment may run over a blocked face before it counts as crossing it
///
/// Grazing a blocked corner or running along the far side of a shared edge stays
/// below this.
const BLOCKED_OVERLAP: f32 = GEOMETRY_EPSILON * 100.0;

impl Walkmesh {
    /// Face containing the point in the XY projection
    ///
    /// With `only_walkable`, non-walkable faces are passed over, so a walkable face
    /// below or above one that is not can still be found.
    pub fn find_face(&self, x: f32, y: f32, only_walkable: bool) -> Option<u32> {
        let p = Vec2::new(x, y);
        self.trees
            .iter()
            .flatten()
            .flat_map(|tree| tree.get_nodes_point(p))
            .filter_map(|leaf| leaf.face())
            .find(|&face| {
                if only_walkable && !self.face_walkable(face) {
                    return false;
                }
                let [a, b, c] = self.face_vertices_2d(face);
                point_in_triangle_2d(p, a, b, c)
            })
    }

    /// Nearest face crossed by the segment `start`-`end`, with the crossing point
    pub fn find_intersection(
        &self,
        start: Vec3,
        end: Vec3,
        only_walkable: bool,
    ) -> Option<(u32, Vec3)> {
        let mut best: Option<(u32, Vec3, f32)> = None;

        for tree in self.trees.iter().flatten() {
            for face in tree
                .get_nodes_segment_3d(start, end)
                .iter()
                .filter_map(|leaf| leaf.face())
            {
                if only_walkable && !self.face_walkable(face) {
                    continue;
                }
                let [a, b, c] = self.face_vertices(face);
                let Some(hit) = segment_triangle_intersection(&start, &end, &a, &b, &c) else {
                    continue;
                };
                let dist = start.distance_squared(hit);
                if best.map_or(true, |(_, _, d)| dist < d) {
                    best = Some((face, hit, dist));
                }
            }
        }

        best.map(|(face, hit, _)| (face, hit))
    }

    /// Height of the walkmesh at a point, from the first face containing it
    pub fn height_at(&self, p: Vec2) -> Option<f32> {
        let face = self
            .find_face(p.x, p.y, true)
            .or_else(|| self.find_face(p.x, p.y, false))?;
        let [a, b, c] = self.face_vertices(face);
        triangle_height_at(p, a, b, c)
    }

    /// Whether a face has a walkable surface material
    ///
    /// # Panics
    ///
    /// Panics if `face` is out of range.
    pub fn face_walkable(&self, face: u32) -> bool {
        self.check_face(face);
        self.walkability.is_walkable(self.materials[face as usize])
    }

    /// Whether a point lies on a walkable face
    pub fn walkable(&self, p: Vec2) -> bool {
        self.find_face(p.x, p.y, true).is_some()
    }

    /// Whether the axis-aligned square around `center` is free of obstacles
    ///
    /// Every face touching the square must be walkable, and the center and corners
    /// must lie on the walkmesh.
    pub fn walkable_aa_square(&self, center: Vec2, half_size: f32) -> bool {
        let min = center - Vec2::splat(half_size);
        let max = center + Vec2::splat(half_size);
        let samples = [
            center,
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];
        if !samples.iter().all(|p| self.walkable(*p)) {
            return false;
        }

        self.trees.iter().flatten().all(|tree| {
            tree.get_nodes_box_2d(min, max)
                .iter()
                .filter_map(|leaf| leaf.face())
                .all(|face| {
                    self.face_walkable(face)
                        || !triangle_intersects_bounds_2d(self.face_vertices_2d(face), min, max)
                })
        })
    }

    /// Whether a polygon is free of obstacles
    ///
    /// Every face touching the polygon must be walkable, and its vertices must lie
    /// on the walkmesh.
    pub fn walkable_polygon(&self, polygon: &[Vec2]) -> bool {
        if polygon.is_empty() || !polygon.iter().all(|p| self.walkable(*p)) {
            return false;
        }

        self.trees.iter().flatten().all(|tree| {
            tree.get_nodes_polygon(polygon)
                .iter()
                .filter_map(|leaf| leaf.face())
                .all(|face| {
                    self.face_walkable(face)
                        || !polygons_intersect_2d(&self.face_vertices_2d(face), polygon)
                })
        })
    }

    /// Whether the segment `a`-`b` runs over walkable faces only
    ///
    /// The segment may not run over a blocked face for more than a tolerance, so
    /// touching a blocked corner or edge is allowed. The walkable faces must cover
    /// the whole segment, so a segment crossing a hole in the walkmesh is rejected.
    ///
    /// Both tolerances are distances along the segment, so any part of a walkable
    /// segment is walkable too.
    pub fn walkable_segment(&self, a: Vec2, b: Vec2) -> bool {
        let length = a.distance(b).max(GEOMETRY_EPSILON);
        let mut covered: Vec<(f32, f32)> = Vec::new();

        for tree in self.trees.iter().flatten() {
            for face in tree
                .get_nodes_segment_2d(a, b)
                .iter()
                .filter_map(|leaf| leaf.face())
            {
                let tri = self.face_vertices_2d(face);
                let Some((t0, t1)) = clip_segment_triangle_2d(a, b, tri) else {
                    continue;
                };
                if self.face_walkable(face) {
                    covered.push((t0, t1));
                } else if (t1 - t0) * length > BLOCKED_OVERLAP {
                    return false;
                }
            }
        }

        covered.sort_by(|x, y| x.0.total_cmp(&y.0));
        let gap = GEOMETRY_EPSILON * 10.0 / length;

        let mut reached = 0.0f32;
        for (t0, t1) in covered {
            if t0 > reached + gap {
                return false;
            }
            reached = reached.max(t1);
        }
        reached >= 1.0 - gap
    }

    /// Whether an agent of the given width fits from one face into an adjacent one
    ///
    /// A shared edge at least `width` long always passes. Otherwise three probes of
    /// length `width` along the edge (centered, and aligned with either end) are
    /// tested with [`Walkmesh::walkable_segment`]; one clear probe suffices. This
    /// is a heuristic, not an exact sweep of the agent's footprint.
    ///
    /// # Panics
    ///
    /// Panics if the faces are not adjacent.
    pub fn go_through(&self, from: u32, to: u32, width: f32) -> bool {
        let [va, vb] = self.get_shared_vertices(from, to);
        let a = self.vertices[va as usize].truncate();
        let b = self.vertices[vb as usize].truncate();
        let length = a.distance(b);

        if length >= width {
            return true;
        }
        if length < GEOMETRY_EPSILON {
            return false;
        }

        let dir = (b - a) / length;
        let center = (a + b) * 0.5;
        let half = dir * (width * 0.5);
        let probes = [
            (center - half, center + half),
            (a, a + dir * width),
            (b - dir * width, b),
        ];

        probes
            .iter()
            .any(|&(start, end)| self.walkable_segment(start, end))
    }

    /// Vertex indices of the edge `a` shares with `b`, in `a`'s winding order
    ///
    /// # Panics
    ///
    /// Panics if the faces are not adjacent.
    pub fn get_shared_vertices(&self, a: u32, b: u32) -> [u32; 2] {
        self.check_face(a);
        self.check_face(b);
        let edge = self.adjacency[a as usize]
            .iter()
            .position(|n| *n == Some(b))
            .unwrap_or_else(|| panic!("faces {a} and {b} are not adjacent"));
        let face = self.faces[a as usize];
        [face[edge], face[(edge + 1) % POLYGON_EDGES]]
    }

    /// Faces across the edges of a face
    ///
    /// # Panics
    ///
    /// Panics if `face` is out of range.
    pub fn get_adjacent_faces(&self, face: u32) -> impl Iterator<Item = u32> + '_ {
        self.check_face(face);
        self.adjacency[face as usize].iter().flatten().copied()
    }

    /// Midpoint of the edge shared by two adjacent faces
    ///
    /// # Panics
    ///
    /// Panics if the faces are not adjacent.
    pub fn get_adjacency_center(&self, a: u32, b: u32) -> Vec3 {
        let [va, vb] = self.get_shared_vertices(a, b);
        (self.vertices[va as usize] + self.vertices[vb as usize]) * 0.5
    }
}
