pub mod polygon_2d;

use nalgebra::Unit;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type (rotations, projections).
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Builds the rotation matrix for the angle triple used by object and view orientations.
///
/// * `angles[0]` - angle between the z-axis and the rotation axis.
/// * `angles[1]` - angle of the rotation axis projected on the x-y plane.
/// * `angles[2]` - rotation angle about that axis.
///
/// All angles are in radians. The matrix acts on column vectors.
#[must_use]
pub fn axis_angles_to_matrix(angles: [f64; 3]) -> Matrix3 {
    let [a1, a2, a3] = angles;
    let axis = Vector3::new(a1.sin() * a2.cos(), a1.sin() * a2.sin(), a1.cos());
    nalgebra::Rotation3::from_axis_angle(&Unit::new_normalize(axis), a3).into_inner()
}

/// Inverse of [`axis_angles_to_matrix`] for a proper rotation matrix.
///
/// The identity yields `[0, 0, 0]`. The rotation angle is in `[0, pi]`.
#[must_use]
pub fn matrix_to_axis_angles(m: &Matrix3) -> [f64; 3] {
    let rot = nalgebra::Rotation3::from_matrix_unchecked(*m);
    match rot.axis_angle() {
        Some((axis, angle)) => [
            axis.z.clamp(-1.0, 1.0).acos(),
            axis.y.atan2(axis.x),
            angle,
        ],
        None => [0.0, 0.0, 0.0],
    }
}

/// Reflection through the plane with unit normal `normal` passing through the origin.
#[must_use]
pub fn mirror_matrix(normal: &Vector3) -> Matrix3 {
    Matrix3::identity() - normal * normal.transpose() * 2.0
}

/// Rounds half away from zero, as `rint` does for the values used here.
#[must_use]
pub(crate) fn round_i32(v: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let r = v.round() as i32;
    r
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn zero_angles_are_identity() {
        let m = axis_angles_to_matrix([0.0, 0.0, 0.0]);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn rotation_about_z() {
        // Axis along z (a1 = 0), quarter turn.
        let m = axis_angles_to_matrix([0.0, 0.3, FRAC_PI_2]);
        let v = m * Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn rotation_about_x() {
        // a1 = 90 deg, a2 = 0 puts the axis on +x.
        let m = axis_angles_to_matrix([FRAC_PI_2, 0.0, FRAC_PI_2]);
        let v = m * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(v, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn angles_round_trip_through_matrix() {
        let angles = [0.7, -1.1, 2.0];
        let m = axis_angles_to_matrix(angles);
        let back = axis_angles_to_matrix(matrix_to_axis_angles(&m));
        assert_relative_eq!(m, back, epsilon = 1e-9);
        assert_eq!(matrix_to_axis_angles(&Matrix3::identity()), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn mirror_flips_normal_component() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let m = mirror_matrix(&n);
        assert_relative_eq!(
            m * Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(1.0, 2.0, -3.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn rounding() {
        assert_eq!(round_i32(2.5), 3);
        assert_eq!(round_i32(-2.5), -3);
        assert_eq!(round_i32(1.49), 1);
    }
}
