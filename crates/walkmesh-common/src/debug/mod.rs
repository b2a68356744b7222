//! Debug visualization export for walkmeshes and paths
//!
//! The core never draws anything itself. Types implementing [`DebugVisualize`] push
//! renderer-agnostic primitives into a [`DebugDraw`] collection which an external
//! renderer may consume.

mod visualization;

pub use visualization::*;

/// Color representation for debug visualization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Creates a new color
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values (alpha = 1.0)
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);
}

/// Debug line for rendering
#[derive(Debug, Clone)]
pub struct DebugLine {
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub color: Color,
    pub thickness: f32,
}

/// Debug triangle for rendering
#[derive(Debug, Clone)]
pub struct DebugTriangle {
    pub vertices: [[f32; 3]; 3],
    pub color: Color,
    pub wireframe: bool,
}

/// Debug text for rendering
#[derive(Debug, Clone)]
pub struct DebugText {
    pub position: [f32; 3],
    pub text: String,
    pub color: Color,
}

/// Debug circle for rendering, lying in the XY plane
#[derive(Debug, Clone)]
pub struct DebugCircle {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: Color,
}

/// Debug bounding box for rendering
#[derive(Debug, Clone)]
pub struct DebugBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub color: Color,
}

/// Collection of debug drawing primitives
#[derive(Debug, Default)]
pub struct DebugDraw {
    pub lines: Vec<DebugLine>,
    pub triangles: Vec<DebugTriangle>,
    pub text: Vec<DebugText>,
    pub circles: Vec<DebugCircle>,
    pub bounds: Vec<DebugBounds>,
}

impl DebugDraw {
    /// Creates a new debug draw collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all debug drawing primitives
    pub fn clear(&mut self) {
        self.lines.clear();
        self.triangles.clear();
        self.text.clear();
        self.circles.clear();
        self.bounds.clear();
    }

    /// Adds a debug line
    pub fn line(&mut self, start: [f32; 3], end: [f32; 3], color: Color) {
        self.thick_line(start, end, color, 1.0);
    }

    /// Adds a debug line with thickness
    pub fn thick_line(&mut self, start: [f32; 3], end: [f32; 3], color: Color, thickness: f32) {
        self.lines.push(DebugLine {
            start,
            end,
            color,
            thickness,
        });
    }

    /// Adds a line strip through the given points
    pub fn polyline(&mut self, points: &[[f32; 3]], color: Color, thickness: f32) {
        for pair in points.windows(2) {
            self.thick_line(pair[0], pair[1], color, thickness);
        }
    }

    /// Adds a filled debug triangle
    pub fn triangle(&mut self, p0: [f32; 3], p1: [f32; 3], p2: [f32; 3], color: Color) {
        self.triangles.push(DebugTriangle {
            vertices: [p0, p1, p2],
            color,
            wireframe: false,
        });
    }

    /// Adds a wireframe debug triangle
    pub fn wireframe_triangle(&mut self, p0: [f32; 3], p1: [f32; 3], p2: [f32; 3], color: Color) {
        self.triangles.push(DebugTriangle {
            vertices: [p0, p1, p2],
            color,
            wireframe: true,
        });
    }

    /// Adds debug text
    pub fn text(&mut self, position: [f32; 3], text: impl Into<String>, color: Color) {
        self.text.push(DebugText {
            position,
            text: text.into(),
            color,
        });
    }

    /// Adds a debug circle
    pub fn circle(&mut self, center: [f32; 3], radius: f32, color: Color) {
        self.circles.push(DebugCircle {
            center,
            radius,
            color,
        });
    }

    /// Adds a debug bounding box
    pub fn bounds(&mut self, min: [f32; 3], max: [f32; 3], color: Color) {
        self.bounds.push(DebugBounds { min, max, color });
    }

    /// Gets the total number of debug primitives
    pub fn primitive_count(&self) -> usize {
        self.lines.len()
            + self.triangles.len()
            + self.text.len()
            + self.circles.len()
            + self.bounds.len()
    }

    /// Checks if the debug draw is empty
    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }
}

/// Debug visualization configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Draw walkmesh faces, colored by walkability
    pub show_faces: bool,
    /// Draw face outlines
    pub show_edges: bool,
    /// Draw AABB tree leaves
    pub show_aabb: bool,
    /// Only draw leaves marked with `select`
    pub only_selected_aabb: bool,
    /// Draw face indices at face centers
    pub show_face_ids: bool,
    /// Draw the faces of the last coarse path
    pub show_face_path: bool,
    /// Draw the last smoothed path
    pub show_smoothed_path: bool,
    /// Draw the agent width along the smoothed path
    pub show_agent_width: bool,
    /// Path line thickness
    pub path_thickness: f32,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_faces: true,
            show_edges: true,
            show_aabb: false,
            only_selected_aabb: false,
            show_face_ids: false,
            show_face_path: true,
            show_smoothed_path: true,
            show_agent_width: false,
            path_thickness: 2.0,
        }
    }
}
