//! Failure codes of path queries

/// Result type for path queries
pub type Result<T> = std::result::Result<T, Status>;

/// Why a path query produced no path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The start point is not over a walkable face
    StartNotOnMesh,
    /// The end point is not over a walkable face
    EndNotOnMesh,
    /// Every reachable face was searched without finding the end
    NoPath,
    /// The search gave up after its iteration budget
    IterationLimit,
}

impl Status {
    /// Whether one of the query end points was off the walkmesh
    pub fn is_off_mesh(&self) -> bool {
        matches!(self, Status::StartNotOnMesh | Status::EndNotOnMesh)
    }

    /// Whether the search itself ran and failed
    pub fn is_search_failure(&self) -> bool {
        matches!(self, Status::NoPath | Status::IterationLimit)
    }
}

impl std::error::Error for Status {}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::StartNotOnMesh => write!(f, "Start point is not on a walkable face"),
            Status::EndNotOnMesh => write!(f, "End point is not on a walkable face"),
            Status::NoPath => write!(f, "No path between start and end"),
            Status::IterationLimit => write!(f, "Search iteration limit reached"),
        }
    }
}
