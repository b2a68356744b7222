//! Debug export of path query results

use walkmesh_common::debug::{DebugConfig, DebugDraw, DebugVisualize, PathColors};

use crate::query::PathQuery;

impl DebugVisualize for PathQuery<'_> {
    fn debug_draw(&self, debug_draw: &mut DebugDraw, config: &DebugConfig) {
        let walkmesh = self.walkmesh();

        if config.show_face_path {
            for &face in self.last_path() {
                let [a, b, c] = walkmesh.face_vertices(face).map(|v| v.to_array());
                debug_draw.triangle(a, b, c, PathColors::FACE);
            }
        }

        let points: Vec<[f32; 3]> = self.last_smoothed().iter().map(|p| p.to_array()).collect();
        if config.show_smoothed_path {
            debug_draw.polyline(&points, PathColors::SMOOTHED, config.path_thickness);
        }

        if config.show_agent_width && self.last_width() > 0.0 {
            for &p in &points {
                debug_draw.circle(p, self.last_width() * 0.5, PathColors::WIDTH);
            }
        }
    }
}
