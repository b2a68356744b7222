//! Placement of a room or tile inside an area

use glam::Vec3;
use walkmesh_common::{Error, Result};

/// Counter-clockwise rotation about +Z by a multiple of 90 degrees
///
/// Walkmesh boxes must stay axis-aligned, so no other angle exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Converts an angle in degrees; anything but a multiple of 90 is rejected
    pub fn from_degrees(degrees: f32) -> Result<Self> {
        let quarters = degrees / 90.0;
        if !quarters.is_finite() || (quarters - quarters.round()).abs() > 1e-4 {
            return Err(Error::InvalidRotation(degrees));
        }
        Ok(Self::from_quarter_turns(quarters.round() as i32))
    }

    /// Rotation by `n` quarter turns, negative turning clockwise
    pub fn from_quarter_turns(n: i32) -> Self {
        match n.rem_euclid(4) {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// Angle in degrees
    pub fn degrees(self) -> f32 {
        match self {
            Rotation::R0 => 0.0,
            Rotation::R90 => 90.0,
            Rotation::R180 => 180.0,
            Rotation::R270 => 270.0,
        }
    }

    /// Rotates a point about the Z axis through the origin
    ///
    /// Exact: no trigonometry, so rotated vertices still compare equal.
    pub fn apply(self, p: Vec3) -> Vec3 {
        match self {
            Rotation::R0 => p,
            Rotation::R90 => Vec3::new(-p.y, p.x, p.z),
            Rotation::R180 => Vec3::new(-p.x, -p.y, p.z),
            Rotation::R270 => Vec3::new(p.y, -p.x, p.z),
        }
    }
}

/// Where a room's local coordinates land in the area: rotate, then translate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Rotation,
}

impl Placement {
    /// Rooms already stored in area coordinates
    pub const IDENTITY: Placement = Placement {
        position: Vec3::ZERO,
        rotation: Rotation::R0,
    };

    /// Creates a placement
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    /// Transforms a room-local point into area coordinates
    pub fn apply(&self, p: Vec3) -> Vec3 {
        self.rotation.apply(p) + self.position
    }

    /// Whether this placement leaves coordinates untouched
    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation::R0 && self.position == Vec3::ZERO
    }
}
