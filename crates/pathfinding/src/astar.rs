//! A* search over walkmesh faces
//!
//! Nodes are faces. A face is entered at the midpoint of the edge it was reached
//! through, and the cost of a step is the 3D distance between consecutive entry
//! points. The end face's cost runs on to the end point itself, so the straight XY
//! distance to the end never overestimates the remaining cost.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use glam::{Vec2, Vec3};
use walkmesh::Walkmesh;

use crate::status::{Result, Status};

/// Default cap on the number of faces expanded by one search
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// State of a node in the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    /// Node is in the open list
    Open,
    /// Node has been expanded
    Closed,
}

/// A face reached by the search
#[derive(Debug, Clone)]
struct Node {
    face: u32,
    /// Point the face was entered at
    pos: Vec3,
    parent: Option<usize>,
    g: f32,
    h: f32,
    f: f32,
    state: NodeState,
    /// Sequence number of the node's current open list entry
    seq: u64,
}

/// Node wrapper for the binary heap (priority queue)
#[derive(Debug)]
struct HeapNode {
    /// Index into the node pool
    index: usize,
    /// Total cost (f value) when pushed
    f: f32,
    /// Insertion order, breaks ties between equal costs
    seq: u64,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap: lowest f first, then earliest insertion
        match other.f.partial_cmp(&self.f) {
            Some(Ordering::Equal) => other.seq.cmp(&self.seq),
            Some(ordering) => ordering,
            None => {
                // Order NaN values last
                if other.f.is_nan() && !self.f.is_nan() {
                    Ordering::Greater
                } else if !other.f.is_nan() && self.f.is_nan() {
                    Ordering::Less
                } else {
                    other.seq.cmp(&self.seq)
                }
            }
        }
    }
}

/// Reusable A* state
///
/// The node pool and open list keep their allocations between searches.
#[derive(Debug, Default)]
pub struct FaceSearch {
    nodes: Vec<Node>,
    lookup: HashMap<u32, usize>,
    open_list: BinaryHeap<HeapNode>,
    next_seq: u64,
    iterations: usize,
}

impl FaceSearch {
    /// Creates an empty search
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of faces expanded by the last search
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of faces the last search reached
    pub fn visited(&self) -> usize {
        self.nodes.len()
    }

    /// Finds a face path from the face under `start` to the face under `end`
    ///
    /// Only walkable faces are entered, and only through edges an agent of `width`
    /// fits through according to [`Walkmesh::go_through`]. The returned faces are
    /// ordered from start to end.
    pub fn find_path(
        &mut self,
        walkmesh: &Walkmesh,
        start: Vec2,
        end: Vec2,
        width: f32,
        max_iterations: usize,
    ) -> Result<Vec<u32>> {
        let start_face = walkmesh
            .find_face(start.x, start.y, true)
            .ok_or(Status::StartNotOnMesh)?;
        let end_face = walkmesh
            .find_face(end.x, end.y, true)
            .ok_or(Status::EndNotOnMesh)?;

        self.nodes.clear();
        self.lookup.clear();
        self.open_list.clear();
        self.iterations = 0;

        // Return early if start and end are the same
        if start_face == end_face {
            return Ok(vec![start_face]);
        }

        let start_pos = start.extend(walkmesh.height_at(start).unwrap_or(0.0));
        let end_pos = end.extend(walkmesh.height_at(end).unwrap_or(0.0));
        let h = start.distance(end);
        self.push_new(start_face, start_pos, None, 0.0, h);

        while let Some(HeapNode { index, seq, .. }) = self.open_list.pop() {
            let node = &self.nodes[index];
            if node.state == NodeState::Closed || node.seq != seq {
                // Superseded by a cheaper entry
                continue;
            }

            if node.face == end_face {
                log::debug!(
                    "Found path of cost {:.3} after {} iterations, {} faces reached",
                    node.g,
                    self.iterations,
                    self.nodes.len()
                );
                return Ok(self.reconstruct(index));
            }

            if self.iterations >= max_iterations {
                log::debug!("Path search stopped after {} iterations", self.iterations);
                return Err(Status::IterationLimit);
            }
            self.iterations += 1;

            self.nodes[index].state = NodeState::Closed;
            self.expand(walkmesh, index, end_face, end_pos, width);
        }

        log::debug!(
            "No path from face {} to face {}, {} faces reached",
            start_face,
            end_face,
            self.nodes.len()
        );
        Err(Status::NoPath)
    }

    /// Pushes the walkable, passable neighbors of a node
    fn expand(
        &mut self,
        walkmesh: &Walkmesh,
        current: usize,
        end_face: u32,
        end_pos: Vec3,
        width: f32,
    ) {
        let Node { face, pos, g, .. } = self.nodes[current];

        for neighbor in walkmesh.get_adjacent_faces(face) {
            let existing = self.lookup.get(&neighbor).copied();
            if existing.is_some_and(|i| self.nodes[i].state == NodeState::Closed) {
                continue;
            }
            if !walkmesh.face_walkable(neighbor) || !walkmesh.go_through(face, neighbor, width) {
                continue;
            }

            let entry = walkmesh.get_adjacency_center(face, neighbor);
            let mut new_g = g + pos.distance(entry);
            let new_h = if neighbor == end_face {
                new_g += entry.distance(end_pos);
                0.0
            } else {
                entry.truncate().distance(end_pos.truncate())
            };

            match existing {
                Some(i) if self.nodes[i].g <= new_g => {}
                Some(i) => {
                    let seq = self.next_seq();
                    let node = &mut self.nodes[i];
                    node.pos = entry;
                    node.parent = Some(current);
                    node.g = new_g;
                    node.h = new_h;
                    node.f = new_g + new_h;
                    node.seq = seq;
                    let f = node.f;
                    self.open_list.push(HeapNode { index: i, f, seq });
                }
                None => self.push_new(neighbor, entry, Some(current), new_g, new_h),
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn push_new(&mut self, face: u32, pos: Vec3, parent: Option<usize>, g: f32, h: f32) {
        let index = self.nodes.len();
        let seq = self.next_seq();
        self.nodes.push(Node {
            face,
            pos,
            parent,
            g,
            h,
            f: g + h,
            state: NodeState::Open,
            seq,
        });
        self.lookup.insert(face, index);
        self.open_list.push(HeapNode { index, f: g + h, seq });
    }

    /// Walks parent links back to the start
    fn reconstruct(&self, goal: usize) -> Vec<u32> {
        let mut path = Vec::new();
        let mut current = Some(goal);
        while let Some(index) = current {
            let node = &self.nodes[index];
            path.push(node.face);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Cost so far and estimate of a face reached by the last search
    #[cfg(test)]
    fn costs(&self, face: u32) -> Option<(f32, f32)> {
        self.lookup
            .get(&face)
            .map(|&i| (self.nodes[i].g, self.nodes[i].h))
    }
}
