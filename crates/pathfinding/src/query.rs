//! Path queries against a finalized walkmesh

use glam::{Vec2, Vec3};
use walkmesh::Walkmesh;
use walkmesh_common::{Error, Result as WalkmeshResult};

use crate::astar::{FaceSearch, DEFAULT_MAX_ITERATIONS};
use crate::funnel::Funnel;
use crate::status::Result;

/// Parameters of a path query
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PathConfig {
    /// Cap on the number of faces one search expands
    pub max_iterations: usize,
    /// Width correction only applies to corners within this distance of the start.
    /// `None` corrects the whole path.
    pub stop_length: Option<f32>,
    /// Agent width used by [`PathQuery::find_smooth_path`]
    pub agent_width: f32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stop_length: None,
            agent_width: 0.0,
        }
    }
}

impl PathConfig {
    /// Validates the configuration parameters
    pub fn validate(&self) -> WalkmeshResult<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput(
                "max iterations must be positive".to_string(),
            ));
        }

        if let Some(stop) = self.stop_length {
            if !(stop >= 0.0) {
                return Err(Error::InvalidInput(
                    "stop length must be non-negative".to_string(),
                ));
            }
        }

        if !(self.agent_width >= 0.0) || !self.agent_width.is_finite() {
            return Err(Error::InvalidInput(
                "agent width must be finite and non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Path finder over one walkmesh
///
/// The walkmesh is borrowed immutably, so any number of queries may run against it
/// from different threads. A query keeps its search buffers and its last results
/// between calls.
#[derive(Debug)]
pub struct PathQuery<'a> {
    walkmesh: &'a Walkmesh,
    config: PathConfig,
    search: FaceSearch,
    last_path: Vec<u32>,
    last_smoothed: Vec<Vec3>,
    last_width: f32,
}

impl<'a> PathQuery<'a> {
    /// Creates a query with the default configuration
    pub fn new(walkmesh: &'a Walkmesh) -> Self {
        Self {
            walkmesh,
            config: PathConfig::default(),
            search: FaceSearch::new(),
            last_path: Vec::new(),
            last_smoothed: Vec::new(),
            last_width: 0.0,
        }
    }

    /// Creates a query with a custom configuration
    pub fn with_config(walkmesh: &'a Walkmesh, config: PathConfig) -> WalkmeshResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(walkmesh)
        })
    }

    pub fn walkmesh(&self) -> &'a Walkmesh {
        self.walkmesh
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// Finds the faces an agent of `width` crosses from `start` to `end`
    ///
    /// A start and end on the same face give that single face. The path is also
    /// kept as [`last_path`](Self::last_path); a failed search clears it.
    pub fn find_path(&mut self, start: Vec2, end: Vec2, width: f32) -> Result<Vec<u32>> {
        self.last_path.clear();
        self.last_width = width;

        let path = self.search.find_path(
            self.walkmesh,
            start,
            end,
            width,
            self.config.max_iterations,
        )?;
        self.last_path.clone_from(&path);
        Ok(path)
    }

    /// Turns a face path into waypoints from `start` to `end` for an agent of `width`
    ///
    /// The waypoints are also kept as [`last_smoothed`](Self::last_smoothed).
    pub fn smooth_path(&mut self, start: Vec2, end: Vec2, path: &[u32], width: f32) -> Vec<Vec3> {
        let funnel = Funnel::new(self.walkmesh, width, self.config.stop_length);
        let points = funnel.smooth(start, end, path);
        log::debug!(
            "Smoothed {} faces into {} waypoints (width {})",
            path.len(),
            points.len(),
            width
        );

        self.last_smoothed.clone_from(&points);
        self.last_width = width;
        points
    }

    /// Finds and smooths a path for the configured agent width
    pub fn find_smooth_path(&mut self, start: Vec2, end: Vec2) -> Result<Vec<Vec3>> {
        let width = self.config.agent_width;
        self.last_smoothed.clear();
        let path = self.find_path(start, end, width)?;
        Ok(self.smooth_path(start, end, &path, width))
    }

    /// Faces of the last successful search
    pub fn last_path(&self) -> &[u32] {
        &self.last_path
    }

    /// Waypoints of the last smoothing
    pub fn last_smoothed(&self) -> &[Vec3] {
        &self.last_smoothed
    }

    /// Agent width of the last search or smoothing
    pub fn last_width(&self) -> f32 {
        self.last_width
    }

    /// Number of faces expanded by the last search
    pub fn last_iterations(&self) -> usize {
        self.search.iterations()
    }
}
