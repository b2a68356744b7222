//! Navigation-specific visualization traits and palettes
//!
//! Implemented by the walkmesh and path-finding crates without creating a
//! dependency from this crate onto them.

use super::{Color, DebugConfig, DebugDraw};

/// Trait for types that can be visualized in debug mode
pub trait DebugVisualize {
    /// Draws debug visualization for this type
    fn debug_draw(&self, debug_draw: &mut DebugDraw, config: &DebugConfig);
}

/// Face colors by walkability
#[derive(Debug, Clone, Copy)]
pub struct SurfaceColors;

impl SurfaceColors {
    pub const WALKABLE: Color = Color::CYAN.with_alpha(0.25);
    pub const BLOCKED: Color = Color::RED.with_alpha(0.25);
    pub const EDGE: Color = Color::new(0.0, 0.0, 0.0, 0.5);
    pub const AABB: Color = Color::GRAY.with_alpha(0.6);
    pub const AABB_SELECTED: Color = Color::ORANGE;
}

/// Path colors
#[derive(Debug, Clone, Copy)]
pub struct PathColors;

impl PathColors {
    pub const FACE: Color = Color::YELLOW.with_alpha(0.4);
    pub const SMOOTHED: Color = Color::GREEN;
    pub const WIDTH: Color = Color::GREEN.with_alpha(0.3);
}
