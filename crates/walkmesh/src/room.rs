//! Room-local walkmesh data produced by the format readers
//!
//! Every index in a [`RoomMesh`] is local to the room. The area builder shifts them
//! into the area-wide arrays once all rooms are known.

use std::collections::HashMap;

use glam::Vec3;
use walkmesh_common::{Error, Result};

use crate::aabb::AabbNode;
use crate::placement::Placement;

/// Edge of a room face that leads into another room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomTransition {
    /// Room-local face
    pub face: u32,
    /// Edge of the face, 0..3
    pub edge: u8,
    /// Index of the room on the other side
    pub room: u32,
}

/// One parsed room or tile
#[derive(Debug, Clone, Default)]
pub struct RoomMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub materials: Vec<u32>,
    /// Neighbor per face edge; edge `i` runs from vertex `i` to vertex `i + 1`
    pub adjacency: Vec<[Option<u32>; 3]>,
    pub transitions: Vec<RoomTransition>,
    pub tree: Option<AabbNode>,
}

impl RoomMesh {
    /// Whether the room has no geometry
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Corner positions of a face
    pub fn face_vertices(&self, face: usize) -> [Vec3; 3] {
        self.faces[face].map(|v| self.vertices[v as usize])
    }

    /// Links faces sharing an edge, by vertex index
    ///
    /// Edges shared by more than two faces are left for the first pair only.
    pub fn compute_adjacency(&mut self) {
        self.adjacency = vec![[None; 3]; self.faces.len()];

        let mut edges: HashMap<(u32, u32), (u32, usize)> = HashMap::new();
        let mut non_manifold = 0usize;
        for (face, verts) in self.faces.iter().enumerate() {
            for edge in 0..3 {
                let (a, b) = (verts[edge], verts[(edge + 1) % 3]);
                let key = (a.min(b), a.max(b));
                match edges.remove(&key) {
                    Some((other, other_edge)) => {
                        if self.adjacency[other as usize][other_edge].is_some() {
                            non_manifold += 1;
                            continue;
                        }
                        self.adjacency[face][edge] = Some(other);
                        self.adjacency[other as usize][other_edge] = Some(face as u32);
                    }
                    None => {
                        edges.insert(key, (face as u32, edge));
                    }
                }
            }
        }

        if non_manifold > 0 {
            log::debug!("{} non-manifold edges left unlinked", non_manifold);
        }
    }

    /// Builds a tree over the face bounds, for formats that do not store one
    pub fn build_tree(&mut self) {
        let leaves = (0..self.faces.len())
            .map(|f| AabbNode::from_points(&self.face_vertices(f), f as u32))
            .collect();
        self.tree = AabbNode::build(leaves);
    }

    /// Moves the room from local into area coordinates
    pub fn apply_placement(&mut self, placement: &Placement) {
        if placement.is_identity() {
            return;
        }
        for v in &mut self.vertices {
            *v = placement.apply(*v);
        }
        if let Some(tree) = self.tree.as_mut() {
            tree.rotate(placement.rotation);
            tree.translate(placement.position);
        }
    }

    /// Checks index consistency of a freshly parsed room
    pub fn validate(&self, resource: &str) -> Result<()> {
        let vertex_count = self.vertices.len() as u32;
        let face_count = self.faces.len() as u32;

        if self.materials.len() != self.faces.len() || self.adjacency.len() != self.faces.len() {
            return Err(Error::malformed(
                resource,
                "per-face arrays differ in length",
            ));
        }

        if let Some((face, _)) = self
            .faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&v| v >= vertex_count))
        {
            return Err(Error::malformed(
                resource,
                format!("face {face} references a vertex beyond {vertex_count}"),
            ));
        }

        if self
            .adjacency
            .iter()
            .flatten()
            .flatten()
            .any(|&n| n >= face_count)
        {
            return Err(Error::malformed(resource, "adjacency references a missing face"));
        }

        if let Some(tree) = &self.tree {
            if let Some(leaf) = tree
                .leaves()
                .into_iter()
                .find(|n| n.face().map_or(true, |f| f >= face_count))
            {
                return Err(Error::malformed(
                    resource,
                    format!("AABB leaf tagged {:?} outside {face_count} faces", leaf.face()),
                ));
            }
        }

        Ok(())
    }
}
