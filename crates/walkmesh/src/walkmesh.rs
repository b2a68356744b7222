//! Finalized walkmesh of an area
//!
//! A [`Walkmesh`] is produced once by [`AreaBuilder::finalize`](crate::AreaBuilder::finalize)
//! and never changes afterwards, so it can be shared between threads freely.

use glam::{Vec2, Vec3};
#[cfg(feature = "serialization")]
use walkmesh_common::{Error, Result};

use crate::aabb::AabbNode;
use crate::builder::AreaData;
use crate::walkability::WalkabilityTable;

/// Number of edges of every walkmesh face
pub const POLYGON_EDGES: usize = 3;

/// Placement of one room or tile inside the area arrays
///
/// The face range covers the faces read from the room. Faces created later by tile
/// splitting are appended at the end of the face arrays; [`Walkmesh::face_room`] is
/// authoritative for those.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RoomInfo {
    pub name: String,
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub face_offset: u32,
    pub face_count: u32,
    /// Grid cell of a tile-mosaic tile
    pub tile: Option<(u32, u32)>,
}

/// Merged walkmesh of all rooms of an area
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Walkmesh {
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) faces: Vec<[u32; 3]>,
    pub(crate) materials: Vec<u32>,
    pub(crate) adjacency: Vec<[Option<u32>; 3]>,
    pub(crate) face_rooms: Vec<u32>,
    pub(crate) trees: Vec<Option<AabbNode>>,
    pub(crate) rooms: Vec<RoomInfo>,
    pub(crate) walkability: WalkabilityTable,
}

impl Walkmesh {
    pub(crate) fn from_area(area: AreaData, walkability: WalkabilityTable) -> Self {
        Self {
            vertices: area.vertices,
            faces: area.faces,
            materials: area.materials,
            adjacency: area.adjacency,
            face_rooms: area.face_rooms,
            trees: area.trees,
            rooms: area.rooms,
            walkability,
        }
    }

    /// All vertices of the area
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Vertex indices of every face
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Surface material of every face
    pub fn materials(&self) -> &[u32] {
        &self.materials
    }

    /// Neighbor across each edge of every face
    pub fn adjacency(&self) -> &[[Option<u32>; 3]] {
        &self.adjacency
    }

    /// One tree per room, `None` for rooms without geometry
    pub fn trees(&self) -> &[Option<AabbNode>] {
        &self.trees
    }

    /// Rooms in the order they were added
    pub fn rooms(&self) -> &[RoomInfo] {
        &self.rooms
    }

    /// The walkability table faces are checked against
    pub fn walkability(&self) -> &WalkabilityTable {
        &self.walkability
    }

    /// Number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Whether the area has no faces at all
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Room owning a face
    pub fn face_room(&self, face: u32) -> u32 {
        self.check_face(face);
        self.face_rooms[face as usize]
    }

    /// Corner positions of a face
    pub fn face_vertices(&self, face: u32) -> [Vec3; 3] {
        self.check_face(face);
        self.faces[face as usize].map(|v| self.vertices[v as usize])
    }

    /// Corner positions of a face projected onto the XY plane
    pub fn face_vertices_2d(&self, face: u32) -> [Vec2; 3] {
        self.face_vertices(face).map(|v| v.truncate())
    }

    /// Centroid of a face
    pub fn face_center(&self, face: u32) -> Vec3 {
        let [a, b, c] = self.face_vertices(face);
        (a + b + c) / 3.0
    }

    /// Bounds of the whole area
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.trees
            .iter()
            .flatten()
            .map(|tree| (tree.min(), tree.max()))
            .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
    }

    /// Deselects every tree node, then highlights the leaves under a point
    pub fn select_at(&mut self, p: Vec2) {
        for tree in self.trees.iter_mut().flatten() {
            tree.select(false, true);
            let faces: Vec<u32> = tree
                .get_nodes_point(p)
                .iter()
                .filter_map(|leaf| leaf.face())
                .collect();
            for face in faces {
                if let Some(leaf) = tree.find_leaf_mut(face) {
                    leaf.select(true, false);
                }
            }
        }
    }

    /// Panics when a face index is out of range
    #[inline]
    pub(crate) fn check_face(&self, face: u32) {
        assert!(
            (face as usize) < self.faces.len(),
            "face {} out of range, the walkmesh has {} faces",
            face,
            self.faces.len()
        );
    }

    /// Serializes the walkmesh to JSON
    #[cfg(feature = "serialization")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Restores a walkmesh serialized with [`Walkmesh::to_json`]
    #[cfg(feature = "serialization")]
    pub fn from_json(json: &str) -> Result<Self> {
        let walkmesh: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        walkmesh.validate()?;
        Ok(walkmesh)
    }

    /// Saves the walkmesh to a JSON file
    #[cfg(feature = "serialization")]
    pub fn save_to_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Loads a walkmesh from a JSON file
    #[cfg(feature = "serialization")]
    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    #[cfg(feature = "serialization")]
    fn validate(&self) -> Result<()> {
        let faces = self.faces.len();
        if self.materials.len() != faces
            || self.adjacency.len() != faces
            || self.face_rooms.len() != faces
            || self.trees.len() != self.rooms.len()
        {
            return Err(Error::Serialization(
                "array lengths do not match".to_string(),
            ));
        }

        let vertices = self.vertices.len() as u32;
        let in_range = self.faces.iter().flatten().all(|&v| v < vertices)
            && self
                .adjacency
                .iter()
                .flatten()
                .flatten()
                .all(|&n| (n as usize) < faces)
            && self.face_rooms.iter().all(|&r| (r as usize) < self.rooms.len());
        if !in_range {
            return Err(Error::Serialization(
                "index out of range".to_string(),
            ));
        }

        Ok(())
    }
}
