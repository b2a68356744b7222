//! Stitching of tile mosaics
//!
//! Tiles are authored independently, so the faces along a shared tile border rarely
//! line up vertex for vertex. Before linking, every border edge is cut at the
//! vertices the other side has strictly inside it; afterwards both sides consist of
//! edges with matching end points.

use std::collections::HashMap;

use glam::Vec2;
use walkmesh_common::{Error, Result};

use crate::aabb::AabbNode;
use crate::builder::AreaData;

/// Straight tile border: `coord[axis] == line`
#[derive(Debug, Clone, Copy)]
struct Border {
    axis: usize,
    line: f32,
    epsilon: f32,
}

impl Border {
    /// Coordinate along the border
    fn along(&self, p: Vec2) -> f32 {
        p[1 - self.axis]
    }

    fn contains(&self, p: Vec2) -> bool {
        (p[self.axis] - self.line).abs() <= self.epsilon
    }
}

fn vertex_2d(area: &AreaData, vertex: u32) -> Vec2 {
    area.vertices[vertex as usize].truncate()
}

/// Unlinked edges of a room lying on the border
fn border_edges(area: &AreaData, room: u32, border: &Border) -> Vec<(u32, usize)> {
    area.boundary_edges(room)
        .filter(|&(face, edge)| {
            let f = area.faces[face as usize];
            border.contains(vertex_2d(area, f[edge]))
                && border.contains(vertex_2d(area, f[(edge + 1) % 3]))
        })
        .collect()
}

/// First edge of `edges` with an end point of `others` strictly inside it
fn find_split(
    area: &AreaData,
    edges: &[(u32, usize)],
    others: &[(u32, usize)],
    border: &Border,
) -> Option<(u32, usize, u32)> {
    for &(face, edge) in edges {
        let f = area.faces[face as usize];
        let s0 = border.along(vertex_2d(area, f[edge]));
        let s1 = border.along(vertex_2d(area, f[(edge + 1) % 3]));
        let (lo, hi) = (s0.min(s1), s0.max(s1));

        for &(other, other_edge) in others {
            let o = area.faces[other as usize];
            for vertex in [o[other_edge], o[(other_edge + 1) % 3]] {
                let s = border.along(vertex_2d(area, vertex));
                if s > lo + border.epsilon && s < hi - border.epsilon {
                    return Some((face, edge, vertex));
                }
            }
        }
    }
    None
}

fn face_leaf(area: &AreaData, face: u32) -> AabbNode {
    let points = area.faces[face as usize].map(|v| area.vertices[v as usize]);
    AabbNode::from_points(&points, face)
}

/// Cuts `edge` of `face` at `vertex`
///
/// Face `a b c` with the cut on edge `a b` becomes `a p c`, and the new face
/// `p b c` takes over the neighbor across `b c`. The leaf of the face in its room
/// tree becomes an internal node over the two halves.
fn split_face_edge(area: &mut AreaData, face: u32, edge: usize, vertex: u32) -> Result<u32> {
    let f = face as usize;
    let old = area.faces[f];
    let (b, c) = (old[(edge + 1) % 3], old[(edge + 2) % 3]);
    let bc_neighbor = area.adjacency[f][(edge + 1) % 3];
    let new_face = area.faces.len() as u32;

    area.faces[f][(edge + 1) % 3] = vertex;
    area.adjacency[f][(edge + 1) % 3] = Some(new_face);

    area.faces.push([vertex, b, c]);
    area.adjacency.push([None, bc_neighbor, Some(face)]);
    area.materials.push(area.materials[f]);
    area.face_rooms.push(area.face_rooms[f]);

    if let Some(neighbor) = bc_neighbor {
        let n = neighbor as usize;
        let nv = area.faces[n];
        let back = (0..3)
            .find(|&e| {
                area.adjacency[n][e] == Some(face) && {
                    let (p, q) = (nv[e], nv[(e + 1) % 3]);
                    (p == b && q == c) || (p == c && q == b)
                }
            })
            .or_else(|| (0..3).find(|&e| area.adjacency[n][e] == Some(face)));
        if let Some(e) = back {
            area.adjacency[n][e] = Some(new_face);
        }
    }

    let cut = face_leaf(area, face);
    let remainder = face_leaf(area, new_face);
    let room = area.face_rooms[f] as usize;
    area.trees[room]
        .as_mut()
        .ok_or_else(|| Error::InvalidAabb(format!("room {room} has faces but no tree")))?
        .split_leaf(face, cut, remainder)?;

    Ok(new_face)
}

/// Splits and links the faces along the border between two tiles
fn connect_border(area: &mut AreaData, room_a: u32, room_b: u32, border: Border) -> Result<usize> {
    let mut splits = 0;
    loop {
        let a_edges = border_edges(area, room_a, &border);
        let b_edges = border_edges(area, room_b, &border);
        let split = find_split(area, &a_edges, &b_edges, &border)
            .or_else(|| find_split(area, &b_edges, &a_edges, &border));
        let Some((face, edge, vertex)) = split else {
            break;
        };
        split_face_edge(area, face, edge, vertex)?;
        splits += 1;
    }

    let mut linked = 0;
    let b_edges = border_edges(area, room_b, &border);
    for (face, edge) in border_edges(area, room_a, &border) {
        let (p, q) = area.edge_points(face, edge);
        let (p, q) = (p.truncate(), q.truncate());
        let found = b_edges.iter().copied().find(|&(other, other_edge)| {
            if area.adjacency[other as usize][other_edge].is_some() {
                return false;
            }
            let (r, s) = area.edge_points(other, other_edge);
            let (r, s) = (r.truncate(), s.truncate());
            let close = |x: Vec2, y: Vec2| x.distance(y) <= border.epsilon;
            (close(p, s) && close(q, r)) || (close(p, r) && close(q, s))
        });
        if let Some((other, other_edge)) = found {
            area.link(face, edge, other, other_edge);
            linked += 1;
        }
    }

    log::debug!(
        "Tile border {} | {}: {} faces split, {} edges linked",
        room_a,
        room_b,
        splits,
        linked
    );

    Ok(linked)
}

/// Connects every pair of neighboring tiles of a mosaic
///
/// Tiles are `tile_size` squares; tile (x, y) covers `[x, x + 1) * tile_size` by
/// `[y, y + 1) * tile_size`. Returns the number of linked edge pairs.
pub(crate) fn connect_tiles(area: &mut AreaData, tile_size: f32, epsilon: f32) -> Result<usize> {
    let cells: HashMap<(u32, u32), u32> = area
        .rooms
        .iter()
        .enumerate()
        .filter_map(|(room, info)| info.tile.map(|cell| (cell, room as u32)))
        .collect();

    let mut ordered: Vec<((u32, u32), u32)> = cells.iter().map(|(c, r)| (*c, *r)).collect();
    ordered.sort_unstable();

    let mut linked = 0;
    for ((x, y), room) in ordered {
        if let Some(&right) = cells.get(&(x + 1, y)) {
            let border = Border {
                axis: 0,
                line: (x + 1) as f32 * tile_size,
                epsilon,
            };
            linked += connect_border(area, room, right, border)?;
        }
        if let Some(&top) = cells.get(&(x, y + 1)) {
            let border = Border {
                axis: 1,
                line: (y + 1) as f32 * tile_size,
                epsilon,
            };
            linked += connect_border(area, room, top, border)?;
        }
    }

    Ok(linked)
}
