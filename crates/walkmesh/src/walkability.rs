//! Surface material to walkability mapping

/// Ordered walkability flags, indexed by surface material
///
/// Which materials a creature may stand on is a per-game decision, so the table is
/// handed to the builder rather than baked into the readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct WalkabilityTable(Vec<bool>);

impl WalkabilityTable {
    /// Creates a table from per-material flags
    pub fn new(walkable: Vec<bool>) -> Self {
        Self(walkable)
    }

    /// Surface materials of the binary room format games
    ///
    /// Undefined, dirt, obscuring, grass, stone, wood, water, non-walk, transparent,
    /// carpet, metal, puddles, swamp, mud, leaves, lava, bottomless pit, deep water,
    /// door, non-walk grass, trigger.
    pub fn kotor() -> Self {
        Self(vec![
            false, true, true, true, true, true, true, false, false, true, true, true, true,
            true, true, false, false, false, true, false, true,
        ])
    }

    /// Surface materials of the tile-mosaic games
    ///
    /// Not defined, dirt, obscuring, grass, stone, wood, water, non-walk, transparent,
    /// carpet, metal, puddles, swamp, mud, leaves, lava, bottomless pit, deep water,
    /// door, snow, sand, bare bones, stone bridge.
    pub fn nwn() -> Self {
        Self(vec![
            false, true, false, true, true, true, true, false, false, true, true, true, true,
            true, true, false, false, false, true, true, true, true, true,
        ])
    }

    /// Whether the material is walkable; unknown materials are not
    #[inline]
    pub fn is_walkable(&self, material: u32) -> bool {
        self.0.get(material as usize).copied().unwrap_or(false)
    }

    /// Whether the material indexes into the table
    #[inline]
    pub fn contains(&self, material: u32) -> bool {
        (material as usize) < self.0.len()
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no materials
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<bool>> for WalkabilityTable {
    fn from(walkable: Vec<bool>) -> Self {
        Self(walkable)
    }
}
