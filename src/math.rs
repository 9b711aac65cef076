//! Celestial-sphere coordinate transforms.
//!
//! Rotation matrices for camera attitude, RA/Dec to unit vectors, and the
//! perspective projection shared by the view and the picking code.

use nalgebra::{Matrix3, Vector3};

/// Camera rotation from a pointer drag, in radians per axis.
pub fn rotation_from_drag(dx: f64, dy: f64) -> Matrix3<f64> {
    let rot_y = Matrix3::new(
        dx.cos(), 0.0, dx.sin(),
        0.0, 1.0, 0.0,
        -dx.sin(), 0.0, dx.cos(),
    );
    let rot_x = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, dy.cos(), -dy.sin(),
        0.0, dy.sin(), dy.cos(),
    );
    rot_x * rot_y
}

/// Unit direction on the celestial sphere from RA/Dec in degrees.
pub fn unit_from_ra_dec(ra_deg: f64, dec_deg: f64) -> Vector3<f64> {
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    Vector3::new(dec.cos() * ra.cos(), dec.sin(), dec.cos() * ra.sin())
}

/// Perspective-project a direction through the camera rotation.
///
/// The camera sits at the sphere centre looking down -Z; directions behind
/// the camera yield None. Visible output spans ±tan(fov/2).
pub fn project(rotation: &Matrix3<f64>, direction: &Vector3<f64>) -> Option<(f64, f64)> {
    let view = rotation * direction;
    if view.z >= -1e-9 {
        return None;
    }
    Some((view.x / -view.z, view.y / -view.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ra_dec_cardinal_directions() {
        let v = unit_from_ra_dec(0.0, 0.0);
        assert!((v - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        let v = unit_from_ra_dec(90.0, 0.0);
        assert!((v - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
        let v = unit_from_ra_dec(123.0, 90.0);
        assert!((v - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn projection_centres_the_view_axis_and_culls_behind() {
        let identity = Matrix3::identity();
        let ahead = Vector3::new(0.0, 0.0, -1.0);
        assert_eq!(project(&identity, &ahead), Some((0.0, 0.0)));
        let behind = Vector3::new(0.0, 0.0, 1.0);
        assert_eq!(project(&identity, &behind), None);
    }

    #[test]
    fn drag_rotation_brings_a_side_direction_into_view() {
        let rot = rotation_from_drag(std::f64::consts::FRAC_PI_2, 0.0);
        let side = Vector3::new(-1.0, 0.0, 0.0);
        let visible = project(&rot, &side).is_some()
            || project(&rot, &Vector3::new(1.0, 0.0, 0.0)).is_some();
        assert!(visible);
    }

    #[test]
    fn drag_rotation_is_orthonormal() {
        let rot = rotation_from_drag(0.3, -0.7);
        let product = rot * rot.transpose();
        assert!((product - Matrix3::identity()).norm() < 1e-12);
    }
}
