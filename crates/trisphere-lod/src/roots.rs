//! Base polyhedron that seeds the patch tree.

use glam::DVec3;

const FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// The 20 faces of a unit icosahedron as corner directions.
///
/// Every face is counter-clockwise when seen from outside the sphere, so
/// patches seeded from them tessellate into outward-facing triangles.
pub fn icosahedron_faces() -> [[DVec3; 3]; 20] {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let vertices = [
        DVec3::new(-1.0, t, 0.0),
        DVec3::new(1.0, t, 0.0),
        DVec3::new(-1.0, -t, 0.0),
        DVec3::new(1.0, -t, 0.0),
        DVec3::new(0.0, -1.0, t),
        DVec3::new(0.0, 1.0, t),
        DVec3::new(0.0, -1.0, -t),
        DVec3::new(0.0, 1.0, -t),
        DVec3::new(t, 0.0, -1.0),
        DVec3::new(t, 0.0, 1.0),
        DVec3::new(-t, 0.0, -1.0),
        DVec3::new(-t, 0.0, 1.0),
    ]
    .map(DVec3::normalize);

    FACES.map(|[a, b, c]| [vertices[a], vertices[b], vertices[c]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use trisphere_mesh::triangle_winds_outward;

    #[test]
    fn test_corners_on_unit_sphere() {
        for face in icosahedron_faces() {
            for corner in face {
                assert!((corner.length() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_faces_wind_outward() {
        for (i, [a, b, c]) in icosahedron_faces().into_iter().enumerate() {
            assert!(triangle_winds_outward(a, b, c), "face {i} winds inward");
        }
    }

    #[test]
    fn test_faces_are_equilateral() {
        let faces = icosahedron_faces();
        let edge = faces[0][0].distance(faces[0][1]);
        for [a, b, c] in faces {
            for len in [a.distance(b), b.distance(c), c.distance(a)] {
                assert!((len - edge).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_every_edge_shared_by_two_faces() {
        let mut edges = std::collections::HashMap::new();
        for [a, b, c] in FACES {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        assert_eq!(edges.len(), 30);
        assert!(edges.values().all(|&n| n == 2));
    }
}
