//! Shrinking shells to the bounding box of their TSEs.

use crate::error::{Result, StoreError};
use crate::math::{axis_angles_to_matrix, Vector3};

use super::data::ShellData;
use super::object::ShellObject;

/// Occupied box of a shell, in slices, rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occupied {
    slices: (usize, usize),
    rows: (usize, usize),
    columns: (u16, u16),
}

fn occupied(data: &ShellData) -> Result<Option<Occupied>> {
    let mut found: Option<Occupied> = None;
    for s in 0..data.slices() {
        for r in 0..data.rows() {
            let row = data.row(s, r)?;
            if row.is_empty() {
                continue;
            }
            let first = row.get(0).column();
            let last = row.get(row.len() - 1).column();
            found = Some(match found {
                None => Occupied {
                    slices: (s, s),
                    rows: (r, r),
                    columns: (first, last),
                },
                Some(o) => Occupied {
                    slices: (o.slices.0, s),
                    rows: (o.rows.0.min(r), o.rows.1.max(r)),
                    columns: (o.columns.0.min(first), o.columns.1.max(last)),
                },
            });
        }
    }
    Ok(found)
}

/// Shrinks `data` to the bounding box of its TSEs and updates the header to match.
///
/// Rows and slices are dropped from the edges. Column numbers are kept; the
/// header's column range and x extent are narrowed instead. Running it twice
/// changes nothing the second time.
///
/// # Errors
///
/// Returns `StoreError::NotInMemory` for on-disk data, and
/// `StoreError::SliceLocationMissing` if no slice location equals the stored
/// minimum z coordinate. In both cases `data` is unchanged.
pub fn compactify(data: &mut ShellData) -> Result<()> {
    let offsets = data.in_memory_offsets()?.to_vec();
    let Some(o) = occupied(data)? else {
        tracing::debug!(shell = data.shell_number(), "compacting empty shell");
        data.set_box(0, 0, vec![0]);
        data.record_counts(0);
        return Ok(());
    };

    let (rows, slices) = (data.rows(), data.slices());
    let (min_z, xysize, locations) = {
        let f = data.file().borrow();
        (
            f.structures[data.shell_number()].min_coordinate[2],
            f.xysize,
            f.slice_locations.clone(),
        )
    };
    let Some(old_first) = locations.iter().position(|&l| (l - min_z).abs() < 1e-6) else {
        tracing::warn!(min_z, shell = data.shell_number(), "slice location missing; shell left as is");
        return Err(StoreError::SliceLocationMissing { location: min_z }.into());
    };
    let (Some(&z_lo), Some(&z_hi)) = (
        locations.get(old_first + o.slices.0),
        locations.get(old_first + o.slices.1),
    ) else {
        return Err(StoreError::InvalidLayout("fewer slice locations than slices".into()).into());
    };

    let new_rows = o.rows.1 - o.rows.0 + 1;
    let new_slices = o.slices.1 - o.slices.0 + 1;
    let mut new_offsets = Vec::with_capacity(new_rows * new_slices + 1);
    for s in o.slices.0..=o.slices.1 {
        for r in o.rows.0..=o.rows.1 {
            new_offsets.push(offsets[s * rows + r]);
        }
    }
    let total = offsets[rows * slices];
    new_offsets.push(total);
    // Rows outside the box are empty, so the word buffer itself is unchanged.
    debug_assert_eq!(new_offsets[0], 0);

    {
        let mut f = data.file().borrow_mut();
        let info = &mut f.structures[data.shell_number()];
        info.smallest_y1 = o.columns.0;
        info.largest_y1 = o.columns.1;
        info.min_coordinate[0] = f64::from(o.columns.0) * xysize[0];
        info.max_coordinate[0] = f64::from(o.columns.1) * xysize[0];
        #[allow(clippy::cast_precision_loss)]
        {
            info.min_coordinate[1] += o.rows.0 as f64 * xysize[1];
            info.max_coordinate[1] -= (rows - 1 - o.rows.1) as f64 * xysize[1];
        }
        info.min_coordinate[2] = z_lo;
        info.max_coordinate[2] = z_hi;
    }
    data.set_box(new_rows, new_slices, new_offsets);
    data.record_counts(total);
    tracing::debug!(
        shell = data.shell_number(),
        rows = new_rows,
        slices = new_slices,
        "compacted shell"
    );
    Ok(())
}

/// Physical center of the shell's header box, in millimetres.
fn box_center(data: &ShellData) -> Vector3 {
    let f = data.file().borrow();
    let u = f.unit.size_mm();
    let info = &f.structures[data.shell_number()];
    Vector3::from_fn(|i, _| 0.5 * u * (info.min_coordinate[i] + info.max_coordinate[i]))
}

/// Diagonal of the shell's occupied box, in millimetres.
#[must_use]
pub fn shell_diameter(data: &ShellData) -> f64 {
    let f = data.file().borrow();
    let u = f.unit.size_mm();
    let info = &f.structures[data.shell_number()];
    #[allow(clippy::cast_precision_loss)]
    let (rows, slices) = (data.rows() as f64, data.slices() as f64);
    let width = if data.rows() == 0 {
        0.0
    } else {
        f64::from(info.largest_y1.saturating_sub(info.smallest_y1) + 1) * f.xysize[0] * u
    };
    let length = rows * f.xysize[1] * u;
    let depth = slices * f.slice_spacing() * u;
    (width * width + length * length + depth * depth).sqrt()
}

/// Compacts both representations of `object` and moves it so nothing shifts in space.
///
/// Marks are re-expressed relative to the new center, and the displacements
/// absorb the rotated center change. The diameter is recomputed.
///
/// # Errors
///
/// Returns any error from [`compactify`]; a failure on the icon leaves the
/// already compacted main data in place.
pub fn compactify_object(object: &mut ShellObject) -> Result<()> {
    let before = box_center(&object.main);
    compactify(&mut object.main)?;
    let shift = box_center(&object.main) - before;

    for mark in &mut object.marks {
        *mark -= shift;
    }
    object.displacement += axis_angles_to_matrix(object.angle) * shift;
    object.plan_displacement += axis_angles_to_matrix(object.plan_angle) * shift;

    let mut diameter = shell_diameter(&object.main);
    if let Some(icon) = object.icon.as_mut() {
        compactify(icon)?;
        diameter = diameter.max(shell_diameter(icon));
    }
    object.diameter = diameter;
    Ok(())
}
