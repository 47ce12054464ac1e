use glam::{Mat4, Vec3};

/// Spin around the origin, step out to (1, -0.5) and spin again about Z.
pub fn frame_transform(time: f32) -> Mat4 {
    Mat4::from_rotation_z(time)
        * Mat4::from_translation(Vec3::new(1.0, -0.5, 0.0))
        * Mat4::from_rotation_z(time)
}

/// Rotated quad parked in the bottom-right corner.
pub fn corner_transform(time: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.5, -0.5, 0.0)) * Mat4::from_rotation_z(time)
}

/// Half size, tilted 90 degrees.
pub fn scale_rotate_transform() -> Mat4 {
    Mat4::from_rotation_z(90f32.to_radians()) * Mat4::from_scale(Vec3::splat(0.5))
}
