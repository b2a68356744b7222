//! Common utilities and data structures shared by the walkmesh readers and the path finder

pub mod debug;
mod geometry;
mod vector;

pub use geometry::*;
pub use vector::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a position projected onto the XY plane
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("resource not found: {name}")]
    ResourceNotFound { name: String },

    #[error("malformed walkmesh {resource}: {reason}")]
    Malformed { resource: String, reason: String },

    #[error("invalid AABB node: {0}")]
    InvalidAabb(String),

    #[error("rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(f32),

    #[error("face {face} has material {material}, outside the walkability table ({table_len} entries)")]
    InvalidMaterial {
        face: usize,
        material: u32,
        table_len: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Malformed`] error
    pub fn malformed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Malformed {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for walkmesh operations
pub type Result<T> = std::result::Result<T, Error>;
