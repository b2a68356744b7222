//! Path finding over walkmeshes
//!
//! A path is found in two steps. [`FaceSearch`] runs A* over the faces of a
//! [`Walkmesh`](walkmesh::Walkmesh), only crossing edges an agent of the requested
//! width fits through. [`Funnel`] then pulls the face path taut into waypoints, keeping
//! half the agent width away from blocked corners.
//!
//! [`PathQuery`] bundles both and remembers its last results for debug drawing.
//!
//! # Example
//!
//! ```rust,ignore
//! use glam::Vec2;
//! use pathfinding::{PathConfig, PathQuery};
//!
//! let config = PathConfig {
//!     agent_width: 0.6,
//!     ..Default::default()
//! };
//! let mut query = PathQuery::with_config(&walkmesh, config)?;
//! let waypoints = query.find_smooth_path(Vec2::new(1.0, 2.0), Vec2::new(30.0, 12.0))?;
//! ```

mod astar;
mod debug;
mod funnel;
mod query;
mod status;

#[cfg(test)]
mod test_mesh_helpers;

pub use astar::{FaceSearch, DEFAULT_MAX_ITERATIONS};
pub use funnel::Funnel;
pub use query::{PathConfig, PathQuery};
pub use status::{Result, Status};
