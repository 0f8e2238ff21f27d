//! Splitting an object's marks between the pieces of a cut.

use crate::math::{Point3, Vector3};
use crate::shell::ShellData;

use super::voi::VoxelOfIntersectionList;

/// Splits `marks` into those `inside` accepts and the rest, keeping order.
pub fn partition(marks: &[Point3], inside: impl Fn(&Point3) -> bool) -> (Vec<Point3>, Vec<Point3>) {
    marks.iter().copied().partition(|m| inside(m))
}

/// The voxel `(column, row, slice)` whose center is nearest to a mark.
///
/// Returns `None` for marks outside the shell's grid.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn voxel_of_mark(data: &ShellData, mark: &Point3) -> Option<[usize; 3]> {
    let f = data.file().borrow();
    let u = f.unit.size_mm();
    let info = &f.structures[data.shell_number()];
    let (min, max) = (info.min_coordinate, info.max_coordinate);
    let v0 = Vector3::new(max[0] + min[0], max[1] - min[1], max[2] - min[2]) * (-0.5 * u);
    let step = Vector3::new(f.xysize[0], f.xysize[1], f.slice_spacing()) * u;
    let clmns = usize::from(info.largest_y1) + 1;
    let limits = [clmns, data.rows(), data.slices()];

    let mut index = [0; 3];
    for axis in 0..3 {
        if step[axis] <= 0.0 {
            return None;
        }
        let i = ((mark[axis] - v0[axis]) / step[axis]).round();
        if i < 0.0 || i >= limits[axis] as f64 {
            return None;
        }
        index[axis] = i as usize;
    }
    Some(index)
}

/// Whether the voxel nearest to a mark is in `list`.
#[must_use]
pub fn mark_in_list(data: &ShellData, list: &VoxelOfIntersectionList, mark: &Point3) -> bool {
    voxel_of_mark(data, mark).is_some_and(|[c, r, s]| list.contains(c, r, s))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shell::{fixtures, Kind};

    #[test]
    fn partition_keeps_order() {
        let marks = [
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, -3.0),
        ];
        let (inside, outside) = partition(&marks, |m| m.z <= 0.0);
        assert_eq!(inside, vec![marks[0], marks[2]]);
        assert_eq!(outside, vec![marks[1]]);
    }

    #[test]
    fn marks_round_to_voxels() {
        // The 4-cube's center lies between voxels 1 and 2 on each axis.
        let data = fixtures::cube(Kind::BinaryA, 4);
        assert_eq!(voxel_of_mark(&data, &Point3::new(-1.5, -1.5, -1.5)), Some([0, 0, 0]));
        assert_eq!(voxel_of_mark(&data, &Point3::new(0.6, -0.6, 1.4)), Some([2, 1, 3]));
        assert_eq!(voxel_of_mark(&data, &Point3::new(2.2, 0.0, 0.0)), None);
        assert_eq!(voxel_of_mark(&data, &Point3::new(0.0, -2.1, 0.0)), None);
    }

    #[test]
    fn list_membership_of_marks() {
        let data = fixtures::cube(Kind::BinaryA, 4);
        let mut list = VoxelOfIntersectionList::new(4, 4).unwrap();
        list.push_run(1, 2, 0, 1).unwrap();
        assert!(mark_in_list(&data, &list, &Point3::new(-1.4, 0.5, -0.5)));
        assert!(!mark_in_list(&data, &list, &Point3::new(0.5, 0.5, -0.5)));
        assert!(!mark_in_list(&data, &list, &Point3::new(-9.0, 0.5, -0.5)));
    }
}
