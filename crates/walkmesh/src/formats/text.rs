//! Line-oriented text walkmeshes
//!
//! ```text
//! # comment
//! position 10.0 0.0 0.0
//! verts 4
//!   0 0 0
//!   ...
//! faces 2
//!   0 1 2  1  0 0 0  1
//!   ...
//! aabb  0 0 0 2 2 0 -1
//!   0 0 0 2 2 0 0
//!   ...
//! endwalkmeshgeom
//! ```
//!
//! Face lines carry the three vertex indices first and the surface material last;
//! anything in between (smoothing group, texture indices) is ignored. AABB node
//! lines list the tree in pre-order, a face of `-1` marking an internal node.

use std::fmt::Write as _;

use glam::Vec3;
use walkmesh_common::{Error, Result};

use crate::aabb::AabbNode;
use crate::room::RoomMesh;

/// Tokens of one AABB line: two corners and a face
const AABB_TOKENS: usize = 7;

struct TextReader<'a> {
    resource: &'a str,
    lines: Vec<(usize, Vec<&'a str>)>,
    pos: usize,
}

impl<'a> TextReader<'a> {
    fn new(resource: &'a str, text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(number, line)| {
                let line = line.split('#').next().unwrap_or("");
                let tokens: Vec<&str> = line.split_whitespace().collect();
                (!tokens.is_empty()).then_some((number + 1, tokens))
            })
            .collect();

        Self {
            resource,
            lines,
            pos: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, Vec<&'a str>)> {
        let (number, tokens) = self.lines.get(self.pos)?;
        self.pos += 1;
        Some((*number, tokens.clone()))
    }

    fn peek_line(&self) -> Option<&[&'a str]> {
        self.lines.get(self.pos).map(|(_, tokens)| tokens.as_slice())
    }

    fn error(&self, line: usize, reason: impl std::fmt::Display) -> Error {
        Error::malformed(self.resource, format!("line {line}: {reason}"))
    }

    fn parse<T: std::str::FromStr>(&self, line: usize, token: &str) -> Result<T> {
        token
            .parse()
            .map_err(|_| self.error(line, format!("unexpected token '{token}'")))
    }

    fn vec3(&self, line: usize, tokens: &[&str]) -> Result<Vec3> {
        if tokens.len() < 3 {
            return Err(self.error(line, "expected three coordinates"));
        }
        Ok(Vec3::new(
            self.parse(line, tokens[0])?,
            self.parse(line, tokens[1])?,
            self.parse(line, tokens[2])?,
        ))
    }

    fn count(&self, line: usize, tokens: &[&str]) -> Result<usize> {
        let token = tokens
            .get(1)
            .ok_or_else(|| self.error(line, format!("'{}' needs a count", tokens[0])))?;
        self.parse(line, token)
    }

    fn read_verts(&mut self, count: usize, room: &mut RoomMesh) -> Result<()> {
        room.vertices.reserve(count);
        for _ in 0..count {
            let (line, tokens) = self
                .next_line()
                .ok_or_else(|| Error::malformed(self.resource, "vertex list ends early"))?;
            let v = self.vec3(line, &tokens)?;
            room.vertices.push(v);
        }
        Ok(())
    }

    fn read_faces(&mut self, count: usize, room: &mut RoomMesh) -> Result<()> {
        room.faces.reserve(count);
        room.materials.reserve(count);
        for _ in 0..count {
            let (line, tokens) = self
                .next_line()
                .ok_or_else(|| Error::malformed(self.resource, "face list ends early"))?;
            if tokens.len() < 4 {
                return Err(self.error(line, "expected three vertex indices and a material"));
            }
            let face = [
                self.parse(line, tokens[0])?,
                self.parse(line, tokens[1])?,
                self.parse(line, tokens[2])?,
            ];
            let material = self.parse(line, tokens[tokens.len() - 1])?;
            room.faces.push(face);
            room.materials.push(material);
        }
        Ok(())
    }

    /// Collects AABB node records, the first possibly sharing the keyword line
    fn read_aabb_records(
        &mut self,
        first: &[&str],
        line: usize,
    ) -> Result<Vec<(usize, Vec3, Vec3, i32)>> {
        let mut records = Vec::new();
        match first.len() {
            0 => {}
            n if n < AABB_TOKENS => {
                return Err(self.error(line, "expected six bounds and a face after aabb"));
            }
            _ => records.push(self.aabb_record(line, first)?),
        }

        while let Some(tokens) = self.peek_line() {
            if tokens.len() < AABB_TOKENS || tokens[0].parse::<f32>().is_err() {
                break;
            }
            let (line, tokens) = self
                .next_line()
                .ok_or_else(|| Error::malformed(self.resource, "AABB list ends early"))?;
            records.push(self.aabb_record(line, &tokens)?);
        }

        Ok(records)
    }

    fn aabb_record(&self, line: usize, tokens: &[&str]) -> Result<(usize, Vec3, Vec3, i32)> {
        let min = self.vec3(line, &tokens[0..3])?;
        let max = self.vec3(line, &tokens[3..6])?;
        let face = self.parse(line, tokens[6])?;
        Ok((line, min, max, face))
    }
}

/// Rebuilds a tree from pre-order records without recursion
fn build_preorder_tree(
    resource: &str,
    records: &[(usize, Vec3, Vec3, i32)],
) -> Result<Option<AabbNode>> {
    // Internal nodes waiting for their children, with the left child once known
    let mut pending: Vec<(AabbNode, Option<AabbNode>)> = Vec::new();
    let mut root = None;

    for &(line, min, max, face) in records {
        if root.is_some() {
            return Err(Error::malformed(
                resource,
                format!("line {line}: AABB node after the tree is complete"),
            ));
        }

        if face < 0 {
            pending.push((AabbNode::new(min, max, None), None));
            continue;
        }

        let mut complete = AabbNode::new(min, max, Some(face as u32));
        loop {
            let Some((_, left)) = pending.last_mut() else {
                root = Some(complete);
                break;
            };
            if left.is_none() {
                *left = Some(complete);
                break;
            }

            let (mut node, left) = pending
                .pop()
                .ok_or_else(|| Error::malformed(resource, "AABB stack underflow"))?;
            node.set_children(left, Some(complete))
                .map_err(|e| Error::malformed(resource, e.to_string()))?;
            complete = node;
        }
    }

    if !pending.is_empty() {
        return Err(Error::malformed(
            resource,
            format!("{} AABB nodes are missing children", pending.len()),
        ));
    }

    Ok(root)
}

/// Parses a text walkmesh into room-local data
///
/// Adjacency is derived from shared vertex indices. When the resource carries no
/// AABB section a tree is built from the face bounds.
pub fn read_text(resource: &str, data: &[u8]) -> Result<RoomMesh> {
    let text = String::from_utf8_lossy(data);
    let mut reader = TextReader::new(resource, &text);
    let mut room = RoomMesh::default();
    let mut position = Vec3::ZERO;
    let mut records = Vec::new();

    while let Some((line, tokens)) = reader.next_line() {
        match tokens[0].to_ascii_lowercase().as_str() {
            "position" => position = reader.vec3(line, &tokens[1..])?,
            "verts" => {
                let count = reader.count(line, &tokens)?;
                reader.read_verts(count, &mut room)?;
            }
            "faces" => {
                let count = reader.count(line, &tokens)?;
                reader.read_faces(count, &mut room)?;
            }
            "aabb" => records = reader.read_aabb_records(&tokens[1..], line)?,
            "endwalkmeshgeom" => break,
            _ => {}
        }
    }

    room.tree = build_preorder_tree(resource, &records)?;
    room.compute_adjacency();
    if room.tree.is_none() {
        room.build_tree();
    }

    if position != Vec3::ZERO {
        for v in &mut room.vertices {
            *v += position;
        }
        if let Some(tree) = room.tree.as_mut() {
            tree.translate(position);
        }
    }

    room.validate(resource)?;

    log::debug!(
        "Parsed text walkmesh {}: {} vertices, {} faces, {} AABB records",
        resource,
        room.vertices.len(),
        room.faces.len(),
        records.len()
    );

    Ok(room)
}

/// Writes a room as a text walkmesh
///
/// The tree is written in pre-order so [`read_text`] restores the same shape.
pub fn write_text(room: &RoomMesh) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "verts {}", room.vertices.len());
    for v in &room.vertices {
        let _ = writeln!(out, "  {} {} {}", v.x, v.y, v.z);
    }

    let _ = writeln!(out, "faces {}", room.faces.len());
    for (face, material) in room.faces.iter().zip(&room.materials) {
        let _ = writeln!(out, "  {} {} {} {}", face[0], face[1], face[2], material);
    }

    if let Some(tree) = &room.tree {
        out.push_str("aabb\n");
        let mut stack = vec![tree];
        while let Some(node) = stack.pop() {
            let (min, max) = (node.min(), node.max());
            let face = node.face().map_or(-1, |f| f as i64);
            let _ = writeln!(
                out,
                "  {} {} {} {} {} {} {}",
                min.x, min.y, min.z, max.x, max.y, max.z, face
            );
            if let Some((left, right)) = node.children() {
                stack.push(right);
                stack.push(left);
            }
        }
    }

    out.push_str("endwalkmeshgeom\n");
    out
}
