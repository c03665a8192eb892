//! Winding order checks for planet-centred triangles.
//!
//! All patch triangles are counter-clockwise when viewed from outside the
//! planet, so backface culling and area-weighted normals agree everywhere.

use glam::DVec3;

/// Signed measure of a triangle's orientation relative to the planet centre.
///
/// Positive when the triangle's face normal (via `(v1 - v0) x (v2 - v0)`)
/// points away from the origin, negative when it points inward.
pub fn signed_volume(v0: DVec3, v1: DVec3, v2: DVec3) -> f64 {
    let face_normal = (v1 - v0).cross(v2 - v0);
    let centroid = (v0 + v1 + v2) / 3.0;
    face_normal.dot(centroid)
}

/// Returns `true` if the triangle winds counter-clockwise seen from outside.
///
/// Vertices are planet-relative positions (planet centre at the origin).
pub fn triangle_winds_outward(v0: DVec3, v1: DVec3, v2: DVec3) -> bool {
    signed_volume(v0, v1, v2) > 0.0
}
