//! Adjacency across room borders
//!
//! Rooms are read separately, so faces on either side of a room border do not know
//! each other until the whole area is assembled.

use glam::Vec3;

use crate::builder::AreaData;

/// Room transition with area-wide face indices
#[derive(Debug, Clone, Copy)]
pub(crate) struct AreaTransition {
    pub room: u32,
    pub face: u32,
    pub edge: usize,
    pub target: u32,
}

/// Whether two points coincide; a tolerance of zero requires exact equality
#[inline]
pub(crate) fn points_match(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    a.distance(b) <= tolerance
}

/// Whether an edge runs between `a` and `b`, in either direction
pub(crate) fn edge_matches(
    area: &AreaData,
    face: u32,
    edge: usize,
    a: Vec3,
    b: Vec3,
    tolerance: f32,
) -> bool {
    let (p, q) = area.edge_points(face, edge);
    (points_match(p, b, tolerance) && points_match(q, a, tolerance))
        || (points_match(p, a, tolerance) && points_match(q, b, tolerance))
}

/// Links perimeter edges of binary rooms to the rooms they lead into
///
/// An edge is matched first against the target room's transitions leading back,
/// then against any unlinked edge of the target room. Returns the number of links.
pub(crate) fn stitch_transitions(
    area: &mut AreaData,
    transitions: &[AreaTransition],
    tolerance: f32,
) -> usize {
    let mut linked = 0;
    let mut dangling = 0;

    for t in transitions {
        if area.adjacency[t.face as usize][t.edge].is_some() {
            continue;
        }
        if t.target as usize >= area.rooms.len() {
            log::debug!(
                "Face {} leads into room {}, which is not loaded",
                t.face,
                t.target
            );
            dangling += 1;
            continue;
        }

        let (a, b) = area.edge_points(t.face, t.edge);
        let is_free = |face: u32, edge: usize| {
            face != t.face
                && area.adjacency[face as usize][edge].is_none()
                && edge_matches(area, face, edge, a, b, tolerance)
        };

        let found = transitions
            .iter()
            .filter(|o| o.room == t.target && o.target == t.room)
            .map(|o| (o.face, o.edge))
            .find(|&(face, edge)| is_free(face, edge))
            .or_else(|| {
                area.boundary_edges(t.target)
                    .find(|&(face, edge)| is_free(face, edge))
            });

        match found {
            Some((face, edge)) => {
                area.link(t.face, t.edge, face, edge);
                linked += 1;
            }
            None => dangling += 1,
        }
    }

    if dangling > 0 {
        log::warn!("{} room transitions have no matching edge", dangling);
    }
    log::debug!("Stitched {} room transitions", linked);

    linked
}

/// Links coinciding unlinked edges of different faces
///
/// Edges are swept in order of their smallest X so only nearby candidates are
/// compared. Returns the number of links.
pub(crate) fn stitch_boundaries(area: &mut AreaData, tolerance: f32) -> usize {
    let mut edges: Vec<(f32, u32, usize)> = (0..area.faces.len() as u32)
        .flat_map(|face| (0..3).map(move |edge| (face, edge)))
        .filter(|&(face, edge)| area.adjacency[face as usize][edge].is_none())
        .map(|(face, edge)| {
            let (p, q) = area.edge_points(face, edge);
            (p.x.min(q.x), face, edge)
        })
        .collect();
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut linked = 0;
    for i in 0..edges.len() {
        let (key, face, edge) = edges[i];
        if area.adjacency[face as usize][edge].is_some() {
            continue;
        }
        let (a, b) = area.edge_points(face, edge);

        for &(other_key, other, other_edge) in &edges[i + 1..] {
            if other_key - key > tolerance {
                break;
            }
            if other != face
                && area.adjacency[other as usize][other_edge].is_none()
                && edge_matches(area, other, other_edge, a, b, tolerance)
            {
                area.link(face, edge, other, other_edge);
                linked += 1;
                break;
            }
        }
    }

    log::debug!("Stitched {} boundary edges", linked);
    linked
}
