//! Area assembly
//!
//! Rooms are parsed one at a time into room-local buffers. [`AreaBuilder::finalize`]
//! concatenates them through an offset table and stitches adjacency across room
//! borders, which is only possible once every room is known.

use std::collections::HashSet;

use glam::Vec3;
use walkmesh_common::{Error, Result};

use crate::aabb::AabbNode;
use crate::config::{AreaConfig, WalkmeshFormat};
use crate::formats::{read_bwm, read_text, tiles::connect_tiles};
use crate::placement::{Placement, Rotation};
use crate::resource::{ResourceLoader, ResourceType};
use crate::room::RoomMesh;
use crate::stitch::{stitch_boundaries, stitch_transitions, AreaTransition};
use crate::walkability::WalkabilityTable;
use crate::walkmesh::{RoomInfo, Walkmesh};

/// Concatenated area arrays while stitching
#[derive(Debug, Default)]
pub(crate) struct AreaData {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub materials: Vec<u32>,
    pub adjacency: Vec<[Option<u32>; 3]>,
    pub face_rooms: Vec<u32>,
    pub trees: Vec<Option<AabbNode>>,
    pub rooms: Vec<RoomInfo>,
}

impl AreaData {
    /// End points of a face edge
    pub fn edge_points(&self, face: u32, edge: usize) -> (Vec3, Vec3) {
        let f = self.faces[face as usize];
        (
            self.vertices[f[edge] as usize],
            self.vertices[f[(edge + 1) % 3] as usize],
        )
    }

    /// Links two face edges in both directions
    pub fn link(&mut self, a: u32, edge_a: usize, b: u32, edge_b: usize) {
        self.adjacency[a as usize][edge_a] = Some(b);
        self.adjacency[b as usize][edge_b] = Some(a);
    }

    /// Edges of a room without a neighbor
    pub fn boundary_edges(&self, room: u32) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.face_rooms
            .iter()
            .enumerate()
            .filter(move |(_, r)| **r == room)
            .flat_map(move |(face, _)| {
                (0..3)
                    .filter(move |&edge| self.adjacency[face][edge].is_none())
                    .map(move |edge| (face as u32, edge))
            })
    }
}

struct PendingRoom {
    name: String,
    mesh: RoomMesh,
    tile: Option<(u32, u32)>,
}

/// Builds the walkmesh of one area
///
/// ```no_run
/// use walkmesh::{AreaBuilder, AreaConfig, DirectoryLoader, Placement, WalkabilityTable};
///
/// let mut builder = AreaBuilder::new(
///     AreaConfig::default(),
///     DirectoryLoader::new("rooms"),
///     WalkabilityTable::kotor(),
/// )?;
/// builder.add_data("m01aa_01a", Placement::IDENTITY)?;
/// builder.add_data("m01aa_01b", Placement::IDENTITY)?;
/// let walkmesh = builder.finalize()?;
/// # Ok::<(), walkmesh_common::Error>(())
/// ```
pub struct AreaBuilder<L: ResourceLoader> {
    config: AreaConfig,
    loader: L,
    walkability: WalkabilityTable,
    rooms: Vec<PendingRoom>,
    tiles: HashSet<(u32, u32)>,
}

impl<L: ResourceLoader> AreaBuilder<L> {
    /// Creates a builder reading rooms through `loader`
    pub fn new(config: AreaConfig, loader: L, walkability: WalkabilityTable) -> Result<Self> {
        config.validate()?;
        if walkability.is_empty() {
            return Err(Error::InvalidInput(
                "walkability table has no materials".to_string(),
            ));
        }

        Ok(Self {
            config,
            loader,
            walkability,
            rooms: Vec::new(),
            tiles: HashSet::new(),
        })
    }

    /// Configuration of the builder
    pub fn config(&self) -> &AreaConfig {
        &self.config
    }

    /// Number of rooms added so far
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Reads one room and places it in the area
    ///
    /// Returns the room index, which is also the room id transitions refer to.
    pub fn add_data(&mut self, name: &str, placement: Placement) -> Result<usize> {
        if self.config.format == WalkmeshFormat::Tiles {
            return Err(Error::InvalidInput(format!(
                "{name}: tile areas are built with add_tile"
            )));
        }

        let mesh = self.load(name)?;
        Ok(self.push(name, mesh, &placement, None))
    }

    /// Reads one tile and places it on the tile grid
    ///
    /// Tile geometry is centered on the origin; it is rotated and then moved to the
    /// center of cell (`x`, `y`).
    pub fn add_tile(&mut self, name: &str, x: u32, y: u32, rotation: Rotation) -> Result<usize> {
        if self.config.format != WalkmeshFormat::Tiles {
            return Err(Error::InvalidInput(format!(
                "{name}: add_tile needs the tile format"
            )));
        }
        if !self.tiles.insert((x, y)) {
            return Err(Error::InvalidInput(format!(
                "{name}: tile cell ({x}, {y}) is already taken"
            )));
        }

        let size = self.config.tile_size;
        let placement = Placement::new(
            Vec3::new((x as f32 + 0.5) * size, (y as f32 + 0.5) * size, 0.0),
            rotation,
        );
        let mesh = self.load(name)?;
        Ok(self.push(name, mesh, &placement, Some((x, y))))
    }

    fn load(&self, name: &str) -> Result<RoomMesh> {
        let data = self
            .loader
            .get_resource(name, ResourceType::Wok)?
            .ok_or_else(|| Error::ResourceNotFound {
                name: name.to_string(),
            })?;

        match self.config.format {
            WalkmeshFormat::Binary => read_bwm(name, &data, &self.walkability),
            WalkmeshFormat::Text | WalkmeshFormat::Tiles => read_text(name, &data),
        }
    }

    fn push(
        &mut self,
        name: &str,
        mut mesh: RoomMesh,
        placement: &Placement,
        tile: Option<(u32, u32)>,
    ) -> usize {
        mesh.apply_placement(placement);
        self.rooms.push(PendingRoom {
            name: name.to_string(),
            mesh,
            tile,
        });
        self.rooms.len() - 1
    }

    /// Concatenates all rooms and stitches them together
    pub fn finalize(self) -> Result<Walkmesh> {
        let mut area = AreaData::default();
        let mut transitions = Vec::new();

        for (index, room) in self.rooms.into_iter().enumerate() {
            let room_id = index as u32;
            let vertex_offset = area.vertices.len() as u32;
            let face_offset = area.faces.len() as u32;
            let PendingRoom { name, mesh, tile } = room;

            if mesh.is_empty() {
                log::debug!("Room {} ({}) has no geometry", index, name);
            }

            area.faces
                .extend(mesh.faces.iter().map(|f| f.map(|v| v + vertex_offset)));
            area.adjacency.extend(
                mesh.adjacency
                    .iter()
                    .map(|a| a.map(|n| n.map(|n| n + face_offset))),
            );
            area.materials.extend_from_slice(&mesh.materials);
            area.face_rooms
                .extend(std::iter::repeat(room_id).take(mesh.faces.len()));
            transitions.extend(mesh.transitions.iter().map(|t| AreaTransition {
                room: room_id,
                face: t.face + face_offset,
                edge: t.edge as usize,
                target: t.room,
            }));
            area.trees.push(mesh.tree.map(|mut tree| {
                tree.offset_faces(face_offset);
                tree
            }));
            area.rooms.push(RoomInfo {
                name,
                vertex_offset,
                vertex_count: mesh.vertices.len() as u32,
                face_offset,
                face_count: mesh.faces.len() as u32,
                tile,
            });
            area.vertices.extend(mesh.vertices);
        }

        if let Some((face, &material)) = area
            .materials
            .iter()
            .enumerate()
            .find(|(_, m)| !self.walkability.contains(**m))
        {
            return Err(Error::InvalidMaterial {
                face,
                material,
                table_len: self.walkability.len(),
            });
        }

        let linked = match self.config.format {
            WalkmeshFormat::Binary => {
                stitch_transitions(&mut area, &transitions, self.config.stitch_tolerance)
            }
            WalkmeshFormat::Text => stitch_boundaries(&mut area, self.config.stitch_tolerance),
            WalkmeshFormat::Tiles => {
                connect_tiles(&mut area, self.config.tile_size, self.config.tile_epsilon)?
            }
        };

        log::info!(
            "Finalized walkmesh: {} rooms, {} vertices, {} faces, {} edges stitched",
            area.rooms.len(),
            area.vertices.len(),
            area.faces.len(),
            linked
        );

        Ok(Walkmesh::from_area(area, self.walkability))
    }
}
