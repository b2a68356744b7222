//! Small walkmeshes shared by the tests
//!
//! Every fixture is written as a text walkmesh and goes through the regular
//! [`AreaBuilder`] path, so the tests exercise the same code real areas do.

use std::fmt::Write as _;

use glam::Vec3;

use walkmesh::{
    AreaBuilder, AreaConfig, MemoryLoader, Placement, ResourceType, WalkabilityTable, Walkmesh,
    WalkmeshFormat,
};

/// Walkable material of [`WalkabilityTable::kotor`]
pub const WALK: u32 = 1;
/// Blocked material of [`WalkabilityTable::kotor`]
pub const WALL: u32 = 7;

/// Writes a text walkmesh without an AABB section
pub fn text_room(vertices: &[Vec3], faces: &[([u32; 3], u32)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "verts {}", vertices.len());
    for v in vertices {
        let _ = writeln!(out, "  {} {} {}", v.x, v.y, v.z);
    }
    let _ = writeln!(out, "faces {}", faces.len());
    for ([a, b, c], material) in faces {
        let _ = writeln!(out, "  {a} {b} {c}  1  0 0 0  {material}");
    }
    out.push_str("endwalkmeshgeom\n");
    out
}

/// Builds a text-format area from named rooms already in area coordinates
pub fn text_area(rooms: &[(&str, String)]) -> Walkmesh {
    let mut loader = MemoryLoader::new();
    for (name, text) in rooms {
        loader.insert(name, ResourceType::Wok, text.as_bytes());
    }

    let mut builder = AreaBuilder::new(
        AreaConfig::for_format(WalkmeshFormat::Text),
        loader,
        WalkabilityTable::kotor(),
    )
    .unwrap();
    for (name, _) in rooms {
        builder.add_data(name, Placement::IDENTITY).unwrap();
    }
    builder.finalize().unwrap()
}

/// Two walkable triangles sharing the edge x = 1 from y = -1 to y = 1
pub fn two_triangles() -> Walkmesh {
    let vertices = [
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
    ];
    let faces = [([0, 1, 2], WALK), ([1, 3, 2], WALK)];
    text_area(&[("two", text_room(&vertices, &faces))])
}

/// Straight corridor from x = 0 to x = 2 * `segments`, two units wide
///
/// Segment `i` holds faces `2 * i` and `2 * i + 1`.
pub fn corridor(segments: u32) -> Walkmesh {
    let n = segments;
    let mut vertices = Vec::new();
    for i in 0..=n {
        vertices.push(Vec3::new(2.0 * i as f32, -1.0, 0.0));
    }
    for i in 0..=n {
        vertices.push(Vec3::new(2.0 * i as f32, 1.0, 0.0));
    }

    let bottom = |i: u32| i;
    let top = |i: u32| n + 1 + i;
    let mut faces = Vec::new();
    for i in 0..n {
        faces.push(([bottom(i), bottom(i + 1), top(i + 1)], WALK));
        faces.push(([bottom(i), top(i + 1), top(i)], WALK));
    }
    text_area(&[("corridor", text_room(&vertices, &faces))])
}

/// 3x3 grid of quads with a doorway `door` units wide in the middle column
///
/// Columns span x in [0, 4], [4, 5] and [5, 9]; rows span y in [0, 2 - door / 2],
/// [2 - door / 2, 2 + door / 2] and [2 + door / 2, 4]. The quads above and below
/// the doorway are walls. Quad (i, j) holds faces `2 * (3 * j + i)` and the next.
pub fn doorway(door: f32) -> Walkmesh {
    let xs = [0.0, 4.0, 5.0, 9.0];
    let ys = [0.0, 2.0 - door * 0.5, 2.0 + door * 0.5, 4.0];
    let mut vertices = Vec::new();
    for y in ys {
        for x in xs {
            vertices.push(Vec3::new(x, y, 0.0));
        }
    }

    let v = |i: u32, j: u32| j * 4 + i;
    let mut faces = Vec::new();
    for j in 0..3 {
        for i in 0..3 {
            let material = if i == 1 && j != 1 { WALL } else { WALK };
            faces.push(([v(i, j), v(i + 1, j), v(i + 1, j + 1)], material));
            faces.push(([v(i, j), v(i + 1, j + 1), v(i, j + 1)], material));
        }
    }
    text_area(&[("doorway", text_room(&vertices, &faces))])
}

/// Face of quad (i, j) of [`doorway`]; `upper` picks the face above the diagonal
pub fn doorway_face(i: u32, j: u32, upper: bool) -> u32 {
    2 * (3 * j + i) + upper as u32
}
