//! Configuration for building an area walkmesh

use walkmesh_common::{Error, Result};

/// On-disk walkmesh format of an area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum WalkmeshFormat {
    /// Line-oriented text walkmeshes, rooms stitched along coinciding boundary edges
    Text,
    /// Binary room walkmeshes carrying adjacency and perimeter transitions
    Binary,
    /// Text walkmeshes laid out on a square tile grid
    Tiles,
}

/// Configuration parameters for area building
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AreaConfig {
    /// Format of every room added to the area
    pub format: WalkmeshFormat,
    /// Maximum distance between two vertices considered the same point when
    /// stitching rooms. Zero means exact comparison.
    pub stitch_tolerance: f32,
    /// Edge length of one tile of a tile mosaic
    pub tile_size: f32,
    /// Tolerance for tile border matching and face splitting
    pub tile_epsilon: f32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self::for_format(WalkmeshFormat::Binary)
    }
}

impl AreaConfig {
    /// Default configuration for a format
    pub fn for_format(format: WalkmeshFormat) -> Self {
        Self {
            format,
            stitch_tolerance: match format {
                WalkmeshFormat::Binary => 0.0,
                WalkmeshFormat::Text | WalkmeshFormat::Tiles => 1e-3,
            },
            tile_size: 10.0,
            tile_epsilon: 1e-3,
        }
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.stitch_tolerance >= 0.0) {
            return Err(Error::InvalidInput(
                "stitch tolerance must be non-negative".to_string(),
            ));
        }

        if !(self.tile_size > 0.0) {
            return Err(Error::InvalidInput("tile size must be positive".to_string()));
        }

        if !(self.tile_epsilon >= 0.0) || self.tile_epsilon >= self.tile_size * 0.5 {
            return Err(Error::InvalidInput(
                "tile epsilon must be non-negative and well below the tile size".to_string(),
            ));
        }

        Ok(())
    }
}
