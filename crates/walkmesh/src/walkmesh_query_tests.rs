//! Query tests on assembled walkmeshes

#[cfg(test)]
mod tests {
    use crate::test_mesh_helpers::*;
    use crate::Walkmesh;
    use glam::{Vec2, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::thread;

    fn v2(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn assert_adjacency_symmetric(walkmesh: &Walkmesh) {
        for (face, neighbors) in walkmesh.adjacency().iter().enumerate() {
            for &n in neighbors.iter().flatten() {
                assert!(
                    walkmesh.adjacency()[n as usize].contains(&Some(face as u32)),
                    "face {face} links {n} but not back"
                );
            }
        }
    }

    #[test]
    fn test_find_face() {
        let walkmesh = two_triangles();
        assert_eq!(walkmesh.find_face(0.0, 0.0, true), Some(0));
        assert_eq!(walkmesh.find_face(2.0, 0.0, true), Some(1));
        assert_eq!(walkmesh.find_face(10.0, 10.0, true), None);
        assert_eq!(walkmesh.find_face(10.0, 10.0, false), None);
    }

    #[test]
    fn test_find_face_skips_blocked_faces_on_request() {
        let walkmesh = doorway(1.0);
        let wall = doorway_face(1, 0, false);
        let p = v2(4.8, 0.2);
        assert_eq!(walkmesh.find_face(p.x, p.y, false), Some(wall));
        assert_eq!(walkmesh.find_face(p.x, p.y, true), None);
        assert!(!walkmesh.walkable(p));
        assert!(walkmesh.walkable(v2(2.0, 2.0)));
    }

    #[test]
    fn test_find_face_covers_the_area() {
        let mut rng = StdRng::seed_from_u64(3);
        let walkmesh = doorway(1.0);

        for _ in 0..500 {
            let p = v2(rng.gen_range(-1.0..10.0), rng.gen_range(-1.0..5.0));
            let inside = p.x > 0.0 && p.x < 9.0 && p.y > 0.0 && p.y < 4.0;

            match walkmesh.find_face(p.x, p.y, false) {
                Some(face) => {
                    assert!(inside, "{p} is outside but hit face {face}");
                    let [a, b, c] = walkmesh.face_vertices_2d(face);
                    assert!(walkmesh_common::point_in_triangle_2d(p, a, b, c));
                    for leaf in walkmesh.trees()[0].as_ref().unwrap().leaves() {
                        if leaf.face() == Some(face) {
                            assert!(leaf.contains_2d(p));
                        }
                    }
                }
                None => assert!(!inside, "{p} is inside but found no face"),
            }
        }
    }

    #[test]
    fn test_adjacency() {
        let walkmesh = two_triangles();
        assert_eq!(walkmesh.get_shared_vertices(0, 1), [1, 2]);
        assert_eq!(walkmesh.get_shared_vertices(1, 0), [2, 1]);
        assert_eq!(walkmesh.get_adjacency_center(0, 1), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(walkmesh.get_adjacent_faces(0).collect::<Vec<_>>(), vec![1]);

        assert_adjacency_symmetric(&walkmesh);
        assert_adjacency_symmetric(&corridor(5));
        assert_adjacency_symmetric(&doorway(1.0));

        // Interior faces of a corridor have two neighbors, the end caps one
        let walkmesh = corridor(3);
        assert_eq!(walkmesh.get_adjacent_faces(0).count(), 2);
        assert_eq!(walkmesh.get_adjacent_faces(1).count(), 1);
        assert_eq!(walkmesh.get_adjacent_faces(2).count(), 2);
        assert_eq!(walkmesh.get_adjacent_faces(4).count(), 1);
    }

    #[test]
    #[should_panic(expected = "not adjacent")]
    fn test_shared_vertices_of_distant_faces_panics() {
        corridor(3).get_shared_vertices(0, 5);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_face_index_out_of_range_panics() {
        two_triangles().face_walkable(2);
    }

    #[test]
    fn test_height_at() {
        let vertices = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(2.0, 2.0, 2.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        let faces = [([0, 1, 2], WALK), ([0, 2, 3], WALK)];
        let walkmesh = text_area(&[("ramp", text_room(&vertices, &faces))]);

        let h = walkmesh.height_at(v2(1.0, 1.5)).unwrap();
        assert!((h - 1.0).abs() < 1e-5);
        assert_eq!(walkmesh.height_at(v2(3.0, 1.0)), None);
    }

    #[test]
    fn test_find_intersection() {
        let walkmesh = two_triangles();
        let (face, hit) = walkmesh
            .find_intersection(Vec3::new(2.0, 0.0, 5.0), Vec3::new(2.0, 0.0, -5.0), true)
            .unwrap();
        assert_eq!(face, 1);
        assert!(hit.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-4);

        assert!(walkmesh
            .find_intersection(Vec3::new(2.0, 0.0, 5.0), Vec3::new(2.0, 0.0, 1.0), true)
            .is_none());
    }

    #[test]
    fn test_walkable_segment() {
        let walkmesh = corridor(3);
        // Along the corridor, across every face
        assert!(walkmesh.walkable_segment(v2(0.5, 0.0), v2(5.5, 0.0)));
        // Leaving the corridor
        assert!(!walkmesh.walkable_segment(v2(0.5, 0.0), v2(0.5, 3.0)));
        // Starting outside
        assert!(!walkmesh.walkable_segment(v2(-1.0, 0.0), v2(1.0, 0.0)));

        // Through the doorway, but not through a wall
        let walkmesh = doorway(1.0);
        assert!(walkmesh.walkable_segment(v2(1.0, 2.0), v2(8.0, 2.0)));
        assert!(!walkmesh.walkable_segment(v2(1.0, 0.5), v2(8.0, 0.5)));
    }

    #[test]
    fn test_walkable_segment_rejects_holes() {
        // Two rooms with a gap between x = 2 and x = 3
        let left = text_room(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
            &[([0, 1, 2], WALK), ([0, 2, 3], WALK)],
        );
        let right = text_room(
            &[
                Vec3::new(3.0, 0.0, 0.0),
                Vec3::new(5.0, 0.0, 0.0),
                Vec3::new(5.0, 2.0, 0.0),
                Vec3::new(3.0, 2.0, 0.0),
            ],
            &[([0, 1, 2], WALK), ([0, 2, 3], WALK)],
        );
        let walkmesh = text_area(&[("left", left), ("right", right)]);

        assert!(walkmesh.walkable_segment(v2(0.5, 1.0), v2(1.5, 1.0)));
        assert!(!walkmesh.walkable_segment(v2(0.5, 1.0), v2(4.5, 1.0)));
    }

    #[test]
    fn test_walkable_aa_square() {
        let walkmesh = corridor(3);
        assert!(walkmesh.walkable_aa_square(v2(3.0, 0.0), 0.5));
        assert!(!walkmesh.walkable_aa_square(v2(3.0, 0.0), 1.5));

        let walkmesh = doorway(1.0);
        assert!(walkmesh.walkable_aa_square(v2(4.5, 2.0), 0.4));
        assert!(!walkmesh.walkable_aa_square(v2(4.5, 2.0), 0.6));
        assert!(walkmesh.walkable_aa_square(v2(2.0, 2.0), 1.0));
    }

    #[test]
    fn test_walkable_polygon() {
        let walkmesh = doorway(1.0);
        let inside = [v2(4.2, 1.8), v2(4.8, 1.8), v2(4.5, 2.3)];
        assert!(walkmesh.walkable_polygon(&inside));

        let over_wall = [v2(3.0, 1.0), v2(6.0, 1.0), v2(4.5, 2.3)];
        assert!(!walkmesh.walkable_polygon(&over_wall));

        assert!(!walkmesh.walkable_polygon(&[]));
    }

    #[test]
    fn test_go_through_by_edge_length() {
        let walkmesh = two_triangles();
        // The shared edge is two units long
        assert!(walkmesh.go_through(0, 1, 1.0));
        assert!(walkmesh.go_through(0, 1, 2.0));

        let walkmesh = doorway(1.0);
        let before = doorway_face(0, 1, false);
        let door = doorway_face(1, 1, true);
        assert_eq!(walkmesh.get_adjacent_faces(before).filter(|&f| f == door).count(), 1);
        assert!(walkmesh.go_through(before, door, 0.5));
        assert!(walkmesh.go_through(before, door, 1.0));
        assert!(!walkmesh.go_through(before, door, 1.5));
    }

    #[test]
    fn test_go_through_monotone_in_width() {
        for door in [0.5, 1.0, 2.0] {
            let walkmesh = doorway(door);
            let pairs: Vec<(u32, u32)> = (0..walkmesh.face_count() as u32)
                .flat_map(|f| walkmesh.get_adjacent_faces(f).map(move |n| (f, n)))
                .collect();

            for (from, to) in pairs {
                let mut blocked = false;
                for step in 1..=40 {
                    let width = step as f32 * 0.1;
                    let fits = walkmesh.go_through(from, to, width);
                    assert!(
                        !(blocked && fits),
                        "{from} -> {to} fits at {width} after failing a narrower width"
                    );
                    blocked |= !fits;
                }
            }
        }
    }

    #[test]
    fn test_diagonal_door_edge_passes_wall_corners() {
        // The shared diagonal of the door quad ends on the wall corners (4, 1) and (5, 3)
        let walkmesh = doorway(2.0);
        let (lower, upper) = (doorway_face(1, 1, false), doorway_face(1, 1, true));
        assert!(walkmesh.get_adjacent_faces(lower).any(|f| f == upper));

        // Extending the diagonal only grazes the walls
        assert!(walkmesh.walkable_segment(v2(3.9, 0.8), v2(5.1, 3.2)));
        // A parallel line a little to the side runs into them
        assert!(!walkmesh.walkable_segment(v2(4.0, 0.7), v2(5.2, 3.1)));

        let widths: Vec<bool> = (21..=40)
            .map(|step| walkmesh.go_through(lower, upper, step as f32 * 0.1))
            .collect();
        assert!(widths.iter().all(|&fits| fits), "{widths:?}");
    }

    #[test]
    fn test_bounds_and_selection() {
        let mut walkmesh = corridor(2);
        let (min, max) = walkmesh.bounds().unwrap();
        assert_eq!(min, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(max, Vec3::new(4.0, 1.0, 0.0));

        walkmesh.select_at(v2(1.5, -0.8));
        let selected: Vec<u32> = walkmesh.trees()[0]
            .as_ref()
            .unwrap()
            .leaves()
            .iter()
            .filter(|leaf| leaf.is_selected())
            .filter_map(|leaf| leaf.face())
            .collect();
        assert!(selected.contains(&0));
        assert!(!selected.contains(&3));
    }

    #[test]
    fn test_concurrent_queries() {
        let walkmesh = Arc::new(doorway(1.0));

        let handles: Vec<_> = (0..4)
            .map(|thread_id| {
                let walkmesh = Arc::clone(&walkmesh);
                thread::spawn(move || {
                    for i in 0..100 {
                        let y = 0.2 + (thread_id * 100 + i) as f32 * 0.009;
                        let face = walkmesh.find_face(1.0, y, true);
                        assert!(face.is_some(), "left column is walkable at y = {y}");
                        assert!(walkmesh.walkable_segment(v2(1.0, y), v2(3.0, y)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn test_json_round_trip() {
        let walkmesh = doorway(1.0);
        let json = walkmesh.to_json().unwrap();
        let restored = Walkmesh::from_json(&json).unwrap();

        assert_eq!(restored.faces(), walkmesh.faces());
        assert_eq!(restored.adjacency(), walkmesh.adjacency());
        assert_eq!(restored.rooms(), walkmesh.rooms());
        assert_eq!(restored.find_face(4.5, 2.0, true), walkmesh.find_face(4.5, 2.0, true));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doorway.json");
        walkmesh.save_to_json(&path).unwrap();
        let loaded = Walkmesh::load_from_json(&path).unwrap();
        assert_eq!(loaded.face_count(), walkmesh.face_count());
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn test_json_rejects_inconsistent_arrays() {
        let json = two_triangles().to_json().unwrap();
        let broken = json.replacen("\"materials\":[1,1]", "\"materials\":[1]", 1);
        assert_ne!(broken, json);
        assert!(Walkmesh::from_json(&broken).is_err());
    }
}
