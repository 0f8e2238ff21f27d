use crate::error::{try_filled, OperationError, Result, StoreError};
use crate::shell::tse::PX;

/// Per-row runs of voxels inside a secondary region.
///
/// Each (slice, row) holds sorted markers: `x | PX` opens an inclusive run at
/// column `x` and a bare `x` closes it. Runs are disjoint and ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelOfIntersectionList {
    rows: usize,
    slices: usize,
    markers: Vec<Vec<u16>>,
}

impl VoxelOfIntersectionList {
    /// Creates an empty list for a shell of `rows` by `slices`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::OutOfMemory` if the row table cannot be allocated.
    pub fn new(rows: usize, slices: usize) -> Result<Self> {
        Ok(Self {
            rows,
            slices,
            markers: try_filled("intersection rows", rows * slices, Vec::new())?,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Appends the inclusive run `start..=end` to a row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::RowOutOfRange` for a row outside the list, and
    /// `OperationError::InvalidInput` if the run is reversed, touches or
    /// precedes the row's last run, or its columns collide with the marker flag.
    pub fn push_run(&mut self, slice: usize, row: usize, start: u16, end: u16) -> Result<()> {
        if slice >= self.slices || row >= self.rows {
            return Err(StoreError::RowOutOfRange { slice, row }.into());
        }
        if start > end || end >= PX {
            return Err(OperationError::InvalidInput(format!("run {start}..={end}")).into());
        }
        let markers = &mut self.markers[slice * self.rows + row];
        if markers.last().is_some_and(|&last| u32::from(start) <= u32::from(last) + 1) {
            return Err(OperationError::InvalidInput(format!(
                "run {start}..={end} overlaps or touches the previous run in row ({slice}, {row})"
            ))
            .into());
        }
        markers.push(start | PX);
        markers.push(end);
        Ok(())
    }

    /// Moves the end of the row's last run to `end`.
    pub(crate) fn extend_last_run(&mut self, slice: usize, row: usize, end: u16) {
        if let Some(last) = self.markers[slice * self.rows + row].last_mut() {
            debug_assert!(end >= *last && end < PX);
            *last = end;
        }
    }

    /// Markers of one row; rows outside the list are empty.
    #[must_use]
    pub fn row(&self, slice: usize, row: usize) -> &[u16] {
        if slice >= self.slices || row >= self.rows {
            return &[];
        }
        &self.markers[slice * self.rows + row]
    }

    /// Inclusive runs of one row.
    pub fn runs(&self, slice: usize, row: usize) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.row(slice, row)
            .chunks_exact(2)
            .map(|pair| (pair[0] & !PX, pair[1]))
    }

    /// Whether voxel `(column, row, slice)` lies in a run.
    #[must_use]
    pub fn contains(&self, column: usize, row: usize, slice: usize) -> bool {
        self.runs(slice, row)
            .any(|(a, b)| (usize::from(a)..=usize::from(b)).contains(&column))
    }

    /// Total number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.markers.iter().map(|m| m.len() / 2).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::VoxshellError;

    #[test]
    fn runs_round_through_markers() {
        let mut list = VoxelOfIntersectionList::new(2, 3).unwrap();
        list.push_run(1, 0, 2, 4).unwrap();
        list.push_run(1, 0, 7, 7).unwrap();
        assert_eq!(list.row(1, 0), &[2 | PX, 4, 7 | PX, 7]);
        assert_eq!(list.runs(1, 0).collect::<Vec<_>>(), vec![(2, 4), (7, 7)]);
        assert!(list.contains(3, 0, 1));
        assert!(list.contains(7, 0, 1));
        assert!(!list.contains(5, 0, 1));
        assert!(!list.contains(3, 1, 1));
        assert_eq!(list.run_count(), 2);
        assert!(list.row(9, 9).is_empty());
    }

    #[test]
    fn rejects_bad_runs() {
        let mut list = VoxelOfIntersectionList::new(1, 1).unwrap();
        assert!(matches!(
            list.push_run(0, 1, 0, 1),
            Err(VoxshellError::Store(StoreError::RowOutOfRange { .. }))
        ));
        assert!(list.push_run(0, 0, 3, 2).is_err());
        list.push_run(0, 0, 0, 2).unwrap();
        assert!(list.push_run(0, 0, 3, 4).is_err());
        assert!(list.push_run(0, 0, 4, 5).is_ok());
    }
}
