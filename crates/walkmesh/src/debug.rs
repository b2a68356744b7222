//! Debug export of a walkmesh

use walkmesh_common::debug::{DebugConfig, DebugDraw, DebugVisualize, SurfaceColors};

use crate::walkmesh::Walkmesh;

impl DebugVisualize for Walkmesh {
    fn debug_draw(&self, debug_draw: &mut DebugDraw, config: &DebugConfig) {
        for face in 0..self.face_count() as u32 {
            let [a, b, c] = self.face_vertices(face).map(|v| v.to_array());

            if config.show_faces {
                let color = if self.face_walkable(face) {
                    SurfaceColors::WALKABLE
                } else {
                    SurfaceColors::BLOCKED
                };
                debug_draw.triangle(a, b, c, color);
            }
            if config.show_edges {
                debug_draw.wireframe_triangle(a, b, c, SurfaceColors::EDGE);
            }
            if config.show_face_ids {
                debug_draw.text(
                    self.face_center(face).to_array(),
                    face.to_string(),
                    SurfaceColors::EDGE,
                );
            }
        }

        if !config.show_aabb {
            return;
        }

        for tree in self.trees.iter().flatten() {
            for leaf in tree.leaves() {
                if config.only_selected_aabb && !leaf.is_selected() {
                    continue;
                }
                let color = if leaf.is_selected() {
                    SurfaceColors::AABB_SELECTED
                } else {
                    SurfaceColors::AABB
                };
                debug_draw.bounds(leaf.min().to_array(), leaf.max().to_array(), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::two_triangles;
    use glam::Vec2;

    #[test]
    fn test_draws_faces_and_selected_leaves() {
        let mut walkmesh = two_triangles();
        let mut draw = DebugDraw::new();
        walkmesh.debug_draw(&mut draw, &DebugConfig::default());
        // One filled and one wireframe triangle per face
        assert_eq!(draw.triangles.len(), 4);
        assert!(draw.bounds.is_empty());

        walkmesh.select_at(Vec2::new(0.0, 0.0));
        let config = DebugConfig {
            show_faces: false,
            show_edges: false,
            show_aabb: true,
            only_selected_aabb: true,
            ..Default::default()
        };
        let mut draw = DebugDraw::new();
        walkmesh.debug_draw(&mut draw, &config);
        assert_eq!(draw.bounds.len(), 1);
        assert_eq!(draw.bounds[0].color, SurfaceColors::AABB_SELECTED);
    }
}
