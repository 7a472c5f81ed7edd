//! Sample scene content for exercising a relay without a real producer.

use crate::protocol::{Face, MeshDelta, MeshSnapshot, SilhouetteBitmap, Vec3};

/// Unit octahedron: 6 vertices, 8 faces.
pub fn octahedron() -> MeshSnapshot {
    let vertices = vec![
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        Face::new(0, 2, 4),
        Face::new(2, 1, 4),
        Face::new(1, 3, 4),
        Face::new(3, 0, 4),
        Face::new(2, 0, 5),
        Face::new(1, 2, 5),
        Face::new(3, 1, 5),
        Face::new(0, 3, 5),
    ];
    MeshSnapshot::new(vertices, faces)
}

/// Scale every vertex radially by a factor oscillating with `t`.
pub fn pulse(mesh: &MeshSnapshot, t: f32) -> MeshDelta {
    let scale = 1.0 + 0.25 * t.sin();
    MeshDelta::new(
        mesh.vertices
            .iter()
            .map(|v| Vec3::new(v.x * scale, v.y * scale, v.z * scale))
            .collect(),
    )
}

/// Filled disc of the given radius on a `size × size` canvas.
pub fn disc(size: i32, radius: f32) -> SilhouetteBitmap {
    let side = size.max(0);
    let center = side as f32 / 2.0;
    let pixels = (0..side)
        .flat_map(|y| (0..side).map(move |x| (x, y)))
        .map(|(x, y)| {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            if dx * dx + dy * dy <= radius * radius {
                u8::MAX
            } else {
                0
            }
        })
        .collect();
    SilhouetteBitmap::new(side, side, pixels)
}
