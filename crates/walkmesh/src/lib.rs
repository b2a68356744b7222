//! Walkmesh loading and walkability queries
//!
//! A walkmesh is the triangle surface creatures walk on. Each face carries a surface
//! material that a [`WalkabilityTable`] maps to walkable or not. Areas are made of
//! rooms (or tiles) that are read separately and merged into one [`Walkmesh`].
//!
//! # Example
//!
//! ```rust,ignore
//! use walkmesh::{AreaBuilder, AreaConfig, DirectoryLoader, Placement, WalkabilityTable};
//! use glam::Vec2;
//!
//! let mut builder = AreaBuilder::new(
//!     AreaConfig::default(),
//!     DirectoryLoader::new("rooms"),
//!     WalkabilityTable::kotor(),
//! )?;
//! builder.add_data("m01aa_01a", Placement::IDENTITY)?;
//! let walkmesh = builder.finalize()?;
//!
//! let face = walkmesh.find_face(10.0, 4.0, true);
//! let clear = walkmesh.walkable_segment(Vec2::new(10.0, 4.0), Vec2::new(12.0, 4.0));
//! ```
//!
//! # Architecture
//!
//! - [`formats`]: text, binary and tile readers producing room-local [`RoomMesh`]es
//! - [`AreaBuilder`]: places rooms and stitches adjacency across their borders
//! - [`Walkmesh`]: the merged, immutable result with its spatial queries
//! - [`AabbNode`]: per-room bounding volume trees backing every query

mod aabb;
mod builder;
mod config;
mod debug;
pub mod formats;
mod placement;
mod query;
mod resource;
mod room;
mod stitch;
mod walkability;
mod walkmesh;

#[cfg(test)]
mod test_mesh_helpers;
#[cfg(test)]
mod walkmesh_query_tests;

pub use aabb::AabbNode;
pub use builder::AreaBuilder;
pub use config::{AreaConfig, WalkmeshFormat};
pub use formats::{read_bwm, read_text, write_bwm, write_text, BwmHeader};
pub use placement::{Placement, Rotation};
pub use resource::{DirectoryLoader, MemoryLoader, ResourceLoader, ResourceType};
pub use room::{RoomMesh, RoomTransition};
pub use walkability::WalkabilityTable;
pub use walkmesh::{RoomInfo, Walkmesh, POLYGON_EDGES};
