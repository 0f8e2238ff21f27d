//! Half-space membership in voxel index space.

use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::render::transform::Pose;
use crate::shell::ShellData;

use super::voi::VoxelOfIntersectionList;

/// Slack on the inside test so voxels exactly on the plane count as inside.
const PLANE_EPSILON: f64 = 1e-9;

/// The half-space `n . p <= d` (plan frame) expressed over voxel indices.
///
/// `value(c, r, s)` is `d - n . p` for the center of voxel `(c, r, s)`, so it
/// is non-negative inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelPlane {
    cf: f64,
    rf: f64,
    sf: f64,
    dist: f64,
    normal_obj: Vector3,
    /// `d` moved into the object frame.
    limit: f64,
}

impl VoxelPlane {
    /// Places the plane `normal . p = d` against `data` posed by `pose`.
    ///
    /// `normal` should be a unit vector.
    #[must_use]
    pub fn new(data: &ShellData, pose: &Pose, normal: &Vector3, d: f64) -> Self {
        let f = data.file().borrow();
        let u = f.unit.size_mm();
        let info = &f.structures[data.shell_number()];
        let (min, max) = (info.min_coordinate, info.max_coordinate);
        let n = pose.rotation.transpose() * normal;
        let half_extent = n.x * (max[0] + min[0]) + n.y * (max[1] - min[1]) + n.z * (max[2] - min[2]);
        let limit = d - normal.dot(&pose.displacement);
        Self {
            cf: -f.xysize[0] * n.x * u,
            rf: -f.xysize[1] * n.y * u,
            sf: -f.slice_spacing() * n.z * u,
            dist: -limit - 0.5 * u * half_extent,
            normal_obj: n,
            limit,
        }
    }

    #[must_use]
    pub fn value(&self, c: f64, r: f64, s: f64) -> f64 {
        s * self.sf - self.dist + r * self.rf + c * self.cf
    }

    /// Whether voxel `(c, r, s)` is inside; the plane itself counts as inside.
    #[must_use]
    pub fn contains(&self, c: f64, r: f64, s: f64) -> bool {
        self.value(c, r, s) >= -PLANE_EPSILON
    }

    /// Whether a mark, in millimetres from the object center, is inside.
    #[must_use]
    pub fn contains_mark(&self, mark: &Point3) -> bool {
        self.normal_obj.dot(&mark.coords) <= self.limit + PLANE_EPSILON
    }

    /// The normal in the object frame.
    #[must_use]
    pub fn normal_obj(&self) -> Vector3 {
        self.normal_obj
    }

    /// Unit normal pointing into the half-space, in the object frame.
    ///
    /// Differs in direction from the gradient of `value` over indices when
    /// the voxels are not cubes.
    #[must_use]
    pub fn inward(&self) -> Vector3 {
        -self.normal_obj
    }

    /// Inclusive run of columns `0..clmns` inside the plane on row `(r, s)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn inside_run(&self, r: usize, s: usize, clmns: usize) -> Option<(u16, u16)> {
        if clmns == 0 {
            return None;
        }
        let last = (clmns - 1) as f64;
        let base = self.value(0.0, r as f64, s as f64);
        // Solve base + cf * c >= -eps for c.
        let bound = (-PLANE_EPSILON - base) / self.cf;
        let (c0, c1) = if self.cf.abs() < 1e-12 {
            if base < -PLANE_EPSILON {
                return None;
            }
            (0.0, last)
        } else if self.cf > 0.0 {
            (bound.ceil().max(0.0), last)
        } else {
            (0.0, bound.floor().min(last))
        };
        if c0 > c1 {
            return None;
        }
        Some((c0 as u16, c1 as u16))
    }

    /// Inside runs for every row of a `rows` by `slices` shell.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::OutOfMemory` if the list cannot be allocated.
    pub fn enumerate(&self, rows: usize, slices: usize, clmns: usize) -> Result<VoxelOfIntersectionList> {
        let mut list = VoxelOfIntersectionList::new(rows, slices)?;
        for s in 0..slices {
            for r in 0..rows {
                if let Some((a, b)) = self.inside_run(r, s, clmns) {
                    list.push_run(s, r, a, b)?;
                }
            }
        }
        Ok(list)
    }
}
