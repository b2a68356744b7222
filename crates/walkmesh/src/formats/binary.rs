//! Binary room walkmeshes (BWM V1.0)
//!
//! All values are little-endian. The 136-byte header is followed by the sections
//! it points at; section order in the file is free. Adjacency and edge records only
//! exist for walkable faces and address them through the list of walkable faces in
//! file order.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use glam::Vec3;
use walkmesh_common::{triangle_normal, Error, Result};

use crate::aabb::AabbNode;
use crate::room::{RoomMesh, RoomTransition};
use crate::walkability::WalkabilityTable;

/// File magic
pub const BWM_MAGIC: [u8; 4] = *b"BWM ";

/// Supported format version
pub const BWM_VERSION: [u8; 4] = *b"V1.0";

/// Size of the fixed header
pub const BWM_HEADER_SIZE: usize = 136;

/// Size of one AABB node record
pub const BWM_AABB_NODE_SIZE: usize = 44;

/// Child index meaning "no child"
const BWM_NO_CHILD: u32 = u32::MAX;

/// Walkmesh type of an area room
pub const BWM_TYPE_AREA: u32 = 1;

/// Fixed header of a binary walkmesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BwmHeader {
    pub magic: [u8; 4],
    pub version: [u8; 4],
    pub walkmesh_type: u32,
    /// Relative use positions 1 and 2, absolute use positions 1 and 2
    pub use_positions: [[f32; 3]; 4],
    pub position: [f32; 3],
    pub vertex_count: u32,
    pub vertex_offset: u32,
    pub face_count: u32,
    pub face_offset: u32,
    pub material_offset: u32,
    pub normal_offset: u32,
    pub planar_distance_offset: u32,
    pub aabb_count: u32,
    pub aabb_offset: u32,
    pub reserved: u32,
    pub adjacency_count: u32,
    pub adjacency_offset: u32,
    pub edge_count: u32,
    pub edge_offset: u32,
    pub perimeter_count: u32,
    pub perimeter_offset: u32,
}

impl BwmHeader {
    /// Reads a header from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header = Self::default();
        reader.read_exact(&mut header.magic)?;
        reader.read_exact(&mut header.version)?;
        header.walkmesh_type = reader.read_u32::<LittleEndian>()?;
        for position in &mut header.use_positions {
            for c in position.iter_mut() {
                *c = reader.read_f32::<LittleEndian>()?;
            }
        }
        for c in &mut header.position {
            *c = reader.read_f32::<LittleEndian>()?;
        }
        header.vertex_count = reader.read_u32::<LittleEndian>()?;
        header.vertex_offset = reader.read_u32::<LittleEndian>()?;
        header.face_count = reader.read_u32::<LittleEndian>()?;
        header.face_offset = reader.read_u32::<LittleEndian>()?;
        header.material_offset = reader.read_u32::<LittleEndian>()?;
        header.normal_offset = reader.read_u32::<LittleEndian>()?;
        header.planar_distance_offset = reader.read_u32::<LittleEndian>()?;
        header.aabb_count = reader.read_u32::<LittleEndian>()?;
        header.aabb_offset = reader.read_u32::<LittleEndian>()?;
        header.reserved = reader.read_u32::<LittleEndian>()?;
        header.adjacency_count = reader.read_u32::<LittleEndian>()?;
        header.adjacency_offset = reader.read_u32::<LittleEndian>()?;
        header.edge_count = reader.read_u32::<LittleEndian>()?;
        header.edge_offset = reader.read_u32::<LittleEndian>()?;
        header.perimeter_count = reader.read_u32::<LittleEndian>()?;
        header.perimeter_offset = reader.read_u32::<LittleEndian>()?;
        Ok(header)
    }

    /// Writes the header to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version)?;
        writer.write_u32::<LittleEndian>(self.walkmesh_type)?;
        for c in self.use_positions.iter().flatten().chain(&self.position) {
            writer.write_f32::<LittleEndian>(*c)?;
        }
        for value in [
            self.vertex_count,
            self.vertex_offset,
            self.face_count,
            self.face_offset,
            self.material_offset,
            self.normal_offset,
            self.planar_distance_offset,
            self.aabb_count,
            self.aabb_offset,
            self.reserved,
            self.adjacency_count,
            self.adjacency_offset,
            self.edge_count,
            self.edge_offset,
            self.perimeter_count,
            self.perimeter_offset,
        ] {
            writer.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }
}

/// AABB node record matching the on-disk layout
#[derive(Debug, Clone, Copy)]
struct AabbRecord {
    min: Vec3,
    max: Vec3,
    related_face: i32,
    plane: u32,
    left: u32,
    right: u32,
}

impl AabbRecord {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let min = read_vec3(reader)?;
        let max = read_vec3(reader)?;
        let related_face = reader.read_i32::<LittleEndian>()?;
        let _reserved = reader.read_u32::<LittleEndian>()?;
        let plane = reader.read_u32::<LittleEndian>()?;
        let left = reader.read_u32::<LittleEndian>()?;
        let right = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            min,
            max,
            related_face,
            plane,
            left,
            right,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_vec3(writer, self.min)?;
        write_vec3(writer, self.max)?;
        writer.write_i32::<LittleEndian>(self.related_face)?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_u32::<LittleEndian>(self.plane)?;
        writer.write_u32::<LittleEndian>(self.left)?;
        writer.write_u32::<LittleEndian>(self.right)?;
        Ok(())
    }
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

/// Bounds-checked view of one section
fn section<'d>(
    resource: &str,
    data: &'d [u8],
    offset: u32,
    count: u32,
    stride: usize,
    what: &str,
) -> Result<Cursor<&'d [u8]>> {
    if count == 0 {
        return Ok(Cursor::new(&data[..0]));
    }

    let start = offset as usize;
    let end = (count as usize)
        .checked_mul(stride)
        .and_then(|len| start.checked_add(len));

    end.and_then(|end| data.get(start..end))
        .map(Cursor::new)
        .ok_or_else(|| {
            Error::malformed(
                resource,
                format!(
                    "{what} section ({count} x {stride} bytes at {offset:#x}) runs past the end of the data ({} bytes)",
                    data.len()
                ),
            )
        })
}

/// Dominant axis of a normal, as stored in the plane field of AABB records
fn dominant_plane(normal: Vec3) -> u32 {
    let a = normal.abs();
    if a.x >= a.y && a.x >= a.z {
        1
    } else if a.y >= a.z {
        2
    } else {
        4
    }
}

/// Rebuilds the tree rooted at record 0 with an explicit stack
fn build_tree(resource: &str, records: &[AabbRecord]) -> Result<Option<AabbNode>> {
    enum Frame {
        Enter(u32),
        Exit(usize),
    }

    if records.is_empty() {
        return Ok(None);
    }

    let mut visited = vec![false; records.len()];
    let mut stack = vec![Frame::Enter(0)];
    let mut built: Vec<AabbNode> = Vec::new();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(index) => {
                let record = records.get(index as usize).ok_or_else(|| {
                    Error::malformed(resource, format!("AABB child index {index} out of range"))
                })?;
                let index = index as usize;
                if std::mem::replace(&mut visited[index], true) {
                    return Err(Error::malformed(
                        resource,
                        format!("AABB node {index} is referenced twice"),
                    ));
                }

                if record.related_face >= 0 {
                    built.push(AabbNode::new(
                        record.min,
                        record.max,
                        Some(record.related_face as u32),
                    ));
                    continue;
                }

                if record.left == BWM_NO_CHILD || record.right == BWM_NO_CHILD {
                    return Err(Error::malformed(
                        resource,
                        format!("internal AABB node {index} must have two children"),
                    ));
                }
                stack.push(Frame::Exit(index));
                stack.push(Frame::Enter(record.right));
                stack.push(Frame::Enter(record.left));
            }
            Frame::Exit(index) => {
                let record = &records[index];
                let right = built.pop();
                let left = built.pop();
                let mut node = AabbNode::new(record.min, record.max, None);
                node.set_children(left, right)
                    .map_err(|e| Error::malformed(resource, e.to_string()))?;
                built.push(node);
            }
        }
    }

    let unused = visited.iter().filter(|v| !**v).count();
    if unused > 0 {
        log::debug!("{}: {} AABB records unreachable from the root", resource, unused);
    }

    Ok(built.pop())
}

/// Parses a binary room walkmesh into room-local data
///
/// `walkability` decides which faces own adjacency and edge records.
pub fn read_bwm(resource: &str, data: &[u8], walkability: &WalkabilityTable) -> Result<RoomMesh> {
    if data.len() < BWM_HEADER_SIZE {
        return Err(Error::malformed(
            resource,
            format!("{} bytes is too short for a header", data.len()),
        ));
    }

    let header = BwmHeader::read_from(&mut Cursor::new(data))?;
    if header.magic != BWM_MAGIC {
        return Err(Error::malformed(resource, "wrong magic"));
    }
    if header.version != BWM_VERSION {
        return Err(Error::malformed(
            resource,
            format!(
                "unsupported version '{}'",
                String::from_utf8_lossy(&header.version)
            ),
        ));
    }

    let mut room = RoomMesh::default();

    let mut cursor = section(
        resource,
        data,
        header.vertex_offset,
        header.vertex_count,
        12,
        "vertex",
    )?;
    for _ in 0..header.vertex_count {
        room.vertices.push(read_vec3(&mut cursor)?);
    }

    let mut cursor = section(resource, data, header.face_offset, header.face_count, 12, "face")?;
    for _ in 0..header.face_count {
        room.faces.push([
            cursor.read_u32::<LittleEndian>()?,
            cursor.read_u32::<LittleEndian>()?,
            cursor.read_u32::<LittleEndian>()?,
        ]);
    }

    let mut cursor = section(
        resource,
        data,
        header.material_offset,
        header.face_count,
        4,
        "material",
    )?;
    for _ in 0..header.face_count {
        room.materials.push(cursor.read_u32::<LittleEndian>()?);
    }

    let mut cursor = section(
        resource,
        data,
        header.aabb_offset,
        header.aabb_count,
        BWM_AABB_NODE_SIZE,
        "AABB",
    )?;
    let records = (0..header.aabb_count)
        .map(|_| AabbRecord::read_from(&mut cursor))
        .collect::<Result<Vec<_>>>()?;

    let walkable: Vec<u32> = (0..header.face_count)
        .filter(|&f| walkability.is_walkable(room.materials[f as usize]))
        .collect();
    if header.adjacency_count as usize > walkable.len() {
        return Err(Error::malformed(
            resource,
            format!(
                "{} adjacency records for {} walkable faces",
                header.adjacency_count,
                walkable.len()
            ),
        ));
    }

    // Edge value `e` addresses edge `e % 3` of walkable face `e / 3`
    let edge_target = |e: i32| -> Result<Option<(u32, u8)>> {
        if e < 0 {
            return Ok(None);
        }
        let e = e as u32;
        walkable
            .get((e / 3) as usize)
            .map(|&face| Some((face, (e % 3) as u8)))
            .ok_or_else(|| {
                Error::malformed(resource, format!("edge {e} beyond the walkable faces"))
            })
    };

    room.adjacency = vec![[None; 3]; room.faces.len()];
    let mut cursor = section(
        resource,
        data,
        header.adjacency_offset,
        header.adjacency_count,
        12,
        "adjacency",
    )?;
    for position in 0..header.adjacency_count as usize {
        let face = walkable[position] as usize;
        for edge in 0..3 {
            let value = cursor.read_i32::<LittleEndian>()?;
            room.adjacency[face][edge] = edge_target(value)?.map(|(neighbor, _)| neighbor);
        }
    }

    let mut cursor = section(resource, data, header.edge_offset, header.edge_count, 8, "edge")?;
    for _ in 0..header.edge_count {
        let edge = cursor.read_i32::<LittleEndian>()?;
        let transition = cursor.read_i32::<LittleEndian>()?;
        let Some((face, edge)) = edge_target(edge)? else {
            continue;
        };
        if transition >= 0 {
            room.transitions.push(RoomTransition {
                face,
                edge,
                room: transition as u32,
            });
        }
    }

    // Perimeter loops only delimit the edge list; checked for truncation, otherwise unused
    section(
        resource,
        data,
        header.perimeter_offset,
        header.perimeter_count,
        4,
        "perimeter",
    )?;

    room.tree = build_tree(resource, &records)?;
    if room.tree.is_none() && !room.faces.is_empty() {
        room.build_tree();
    }

    room.validate(resource)?;

    log::debug!(
        "Parsed binary walkmesh {}: {} vertices, {} faces ({} walkable), {} AABB nodes, {} transitions",
        resource,
        room.vertices.len(),
        room.faces.len(),
        walkable.len(),
        records.len(),
        room.transitions.len()
    );

    Ok(room)
}

/// Serializes a room in the layout [`read_bwm`] reads
///
/// Sections are written in header order. Adjacency between a walkable and a
/// non-walkable face is dropped since only walkable faces own records.
pub fn write_bwm(room: &RoomMesh, walkability: &WalkabilityTable) -> Result<Vec<u8>> {
    let face_count = room.faces.len();
    let mut walkable_position = vec![None; face_count];
    let mut walkable = Vec::new();
    for face in 0..face_count {
        if walkability.is_walkable(room.materials[face]) {
            walkable_position[face] = Some(walkable.len() as u32);
            walkable.push(face);
        }
    }

    // Tree records in pre-order, children addressed by record index
    let generated;
    let tree = match &room.tree {
        Some(tree) => Some(tree),
        None => {
            let mut copy = room.clone();
            copy.build_tree();
            generated = copy.tree;
            generated.as_ref()
        }
    };
    let mut records: Vec<AabbRecord> = Vec::new();
    if let Some(tree) = tree {
        let mut stack: Vec<(&AabbNode, Option<(usize, bool)>)> = vec![(tree, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = records.len();
            let plane = node.face().map_or(0, |f| {
                let [a, b, c] = room.face_vertices(f as usize);
                dominant_plane(triangle_normal(&a, &b, &c))
            });
            records.push(AabbRecord {
                min: node.min(),
                max: node.max(),
                related_face: node.face().map_or(-1, |f| f as i32),
                plane,
                left: BWM_NO_CHILD,
                right: BWM_NO_CHILD,
            });
            if let Some((parent, is_right)) = parent {
                if is_right {
                    records[parent].right = index as u32;
                } else {
                    records[parent].left = index as u32;
                }
            }
            if let Some((left, right)) = node.children() {
                stack.push((right, Some((index, true))));
                stack.push((left, Some((index, false))));
            }
        }
    }

    let mut adjacency = Vec::with_capacity(walkable.len() * 3);
    let mut edges = Vec::new();
    for (position, &face) in walkable.iter().enumerate() {
        for edge in 0..3 {
            let value = room.adjacency[face][edge].and_then(|neighbor| {
                let neighbor = neighbor as usize;
                let back = room.adjacency[neighbor]
                    .iter()
                    .position(|n| *n == Some(face as u32))?;
                walkable_position[neighbor].map(|p| (p * 3 + back as u32) as i32)
            });
            adjacency.push(value.unwrap_or(-1));

            if value.is_none() {
                let transition = room
                    .transitions
                    .iter()
                    .find(|t| t.face as usize == face && t.edge as usize == edge)
                    .map_or(-1, |t| t.room as i32);
                edges.push(((position * 3 + edge) as i32, transition));
            }
        }
    }
    let perimeters: Vec<u32> = if edges.is_empty() {
        Vec::new()
    } else {
        vec![edges.len() as u32]
    };

    let mut header = BwmHeader {
        magic: BWM_MAGIC,
        version: BWM_VERSION,
        walkmesh_type: BWM_TYPE_AREA,
        vertex_count: room.vertices.len() as u32,
        face_count: face_count as u32,
        aabb_count: records.len() as u32,
        adjacency_count: walkable.len() as u32,
        edge_count: edges.len() as u32,
        perimeter_count: perimeters.len() as u32,
        ..Default::default()
    };

    let mut offset = BWM_HEADER_SIZE as u32;
    let mut place = |size: usize| {
        let at = offset;
        offset += size as u32;
        at
    };
    header.vertex_offset = place(room.vertices.len() * 12);
    header.face_offset = place(face_count * 12);
    header.material_offset = place(face_count * 4);
    header.normal_offset = place(face_count * 12);
    header.planar_distance_offset = place(face_count * 4);
    header.aabb_offset = place(records.len() * BWM_AABB_NODE_SIZE);
    header.adjacency_offset = place(adjacency.len() * 4);
    header.edge_offset = place(edges.len() * 8);
    header.perimeter_offset = place(perimeters.len() * 4);

    let mut out = Vec::with_capacity(offset as usize);
    header.write_to(&mut out)?;
    for v in &room.vertices {
        write_vec3(&mut out, *v)?;
    }
    for face in &room.faces {
        for index in face {
            out.write_u32::<LittleEndian>(*index)?;
        }
    }
    for material in &room.materials {
        out.write_u32::<LittleEndian>(*material)?;
    }
    let normals: Vec<Vec3> = (0..face_count)
        .map(|f| {
            let [a, b, c] = room.face_vertices(f);
            triangle_normal(&a, &b, &c)
        })
        .collect();
    for normal in &normals {
        write_vec3(&mut out, *normal)?;
    }
    for (f, normal) in normals.iter().enumerate() {
        let [a, _, _] = room.face_vertices(f);
        out.write_f32::<LittleEndian>(-normal.dot(a))?;
    }
    for record in &records {
        record.write_to(&mut out)?;
    }
    for value in &adjacency {
        out.write_i32::<LittleEndian>(*value)?;
    }
    for (edge, transition) in &edges {
        out.write_i32::<LittleEndian>(*edge)?;
        out.write_i32::<LittleEndian>(*transition)?;
    }
    for perimeter in &perimeters {
        out.write_u32::<LittleEndian>(*perimeter)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    /// Unit square of two walkable faces plus a non-walkable sliver
    fn room() -> RoomMesh {
        let mut room = RoomMesh {
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(3.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3], [1, 4, 2]],
            materials: vec![1, 1, 7],
            transitions: vec![RoomTransition {
                face: 1,
                edge: 2,
                room: 4,
            }],
            ..Default::default()
        };
        room.compute_adjacency();
        room.build_tree();
        room
    }

    #[test]
    fn test_header_size() {
        let mut out = Vec::new();
        BwmHeader::default().write_to(&mut out).unwrap();
        assert_eq!(out.len(), BWM_HEADER_SIZE);
    }

    #[test]
    fn test_round_trip_matches_header_counts() {
        let table = WalkabilityTable::kotor();
        let original = room();
        let data = write_bwm(&original, &table).unwrap();

        let header = BwmHeader::read_from(&mut Cursor::new(&data[..])).unwrap();
        assert_eq!(header.vertex_count, 5);
        assert_eq!(header.face_count, 3);
        assert_eq!(header.adjacency_count, 2);

        let parsed = read_bwm("room", &data, &table).unwrap();
        assert_eq!(parsed.vertices.len(), header.vertex_count as usize);
        assert_eq!(parsed.faces.len(), header.face_count as usize);
        assert_eq!(parsed.faces, original.faces);
        assert_eq!(parsed.materials, original.materials);
        assert_eq!(parsed.transitions, original.transitions);
        assert_eq!(parsed.tree, original.tree);

        // Walkable faces keep their mutual link, the sliver loses its links
        assert_eq!(parsed.adjacency[0][2], Some(1));
        assert_eq!(parsed.adjacency[1][0], Some(0));
        assert_eq!(parsed.adjacency[0][1], None);
        assert_eq!(parsed.adjacency[2], [None; 3]);

        assert_eq!(
            parsed.tree.as_ref().unwrap().get_node(Vec2::new(2.5, 1.0)).unwrap().face(),
            Some(2)
        );
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let table = WalkabilityTable::kotor();
        let data = write_bwm(&room(), &table).unwrap();

        for len in [0, 100, BWM_HEADER_SIZE + 10, data.len() - 1] {
            assert!(
                matches!(read_bwm("cut", &data[..len], &table), Err(Error::Malformed { .. })),
                "accepted {len} bytes"
            );
        }

        let mut bad = data.clone();
        bad[0] = b'X';
        assert!(read_bwm("magic", &bad, &table).is_err());
    }

    #[test]
    fn test_cyclic_tree_is_rejected() {
        let table = WalkabilityTable::kotor();
        let mut data = write_bwm(&room(), &table).unwrap();
        let header = BwmHeader::read_from(&mut Cursor::new(&data[..])).unwrap();

        // Point the root's left child back at the root
        let left = header.aabb_offset as usize + 36;
        data[left..left + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(read_bwm("cycle", &data, &table).is_err());
    }

    #[test]
    fn test_empty_room() {
        let table = WalkabilityTable::kotor();
        let data = write_bwm(&RoomMesh::default(), &table).unwrap();
        let parsed = read_bwm("empty", &data, &table).unwrap();
        assert!(parsed.is_empty());
        assert!(parsed.tree.is_none());
    }
}
