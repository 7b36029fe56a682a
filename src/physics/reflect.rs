use glam::DVec3;

/// Specular, lossless bounce: flips the velocity component along `normal`
/// and keeps the tangential part.
pub fn reflect(velocity: DVec3, normal: DVec3) -> DVec3 {
    let n = normal.normalize_or_zero();
    velocity - 2.0 * velocity.dot(n) * n
}
