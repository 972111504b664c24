use nalgebra::{Rotation3, Unit, Vector3};

/// Unit vector for the polar angle `theta` (from +z) and azimuth `phi` (from +x), in radians.
pub fn direction_from_spherical(theta: f64, phi: f64) -> Unit<Vector3<f64>> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Unit::new_normalize(Vector3::new(
        sin_theta * cos_phi,
        sin_theta * sin_phi,
        cos_theta,
    ))
}

pub fn rotation_from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle)
}

/// Some unit vector perpendicular to `v`.
pub fn any_perpendicular(v: &Vector3<f64>) -> Unit<Vector3<f64>> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(v.cross(&helper))
}

/// Tilts `direction` by `polar` away from itself, then spins the result by `azimuth` around it.
pub fn deflect(direction: &Unit<Vector3<f64>>, polar: f64, azimuth: f64) -> Unit<Vector3<f64>> {
    if polar == 0.0 {
        return *direction;
    }
    let axis = any_perpendicular(direction);
    let tilted = rotation_from_axis_angle(&axis, polar) * direction.into_inner();
    let spun = rotation_from_axis_angle(direction, azimuth) * tilted;
    Unit::new_normalize(spun)
}
