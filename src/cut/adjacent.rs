//! Combining the markers of a row and its four neighbors, and deriving the
//! boundary voxels of the secondary region on that row.

use crate::shell::tse::{ALL_NEIGHBORS, NX, NY, NZ, PX, PY, PZ};

/// Marker flag of the row itself.
pub const VHERE: u16 = PX;
/// Marker flags of the four neighboring rows.
pub const OFF_ROW: u16 = PY | PZ | NY | NZ;

/// Which side of the secondary region a pass keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Inside,
    Outside,
}

/// A column where at least one of the five rows starts or ends a run.
///
/// `start_code` and `end_code` hold the flags of the rows doing so: `PX` for
/// the row itself, and `NZ`, `NY`, `PY`, `PZ` for its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacentVoi {
    pub x: i32,
    pub start_code: u16,
    pub end_code: u16,
}

/// A boundary voxel of the secondary region with the flags of its
/// face-neighbors that are also in the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SVoxel {
    pub x: i32,
    pub code: u16,
}

/// Merges one row's markers into `list`, tagging them with `row_code`.
///
/// `list` stays sorted by `x` with one entry per column. Under
/// [`Sense::Outside`] the runs are complemented: a start at `x` becomes an
/// end at `x - 1` and an end at `x` becomes a start at `x + 1`.
pub fn insert_adjacent_vois(list: &mut Vec<AdjacentVoi>, markers: &[u16], row_code: u16, sense: Sense) {
    for &m in markers {
        let x = i32::from(m & !PX);
        let (x, is_start) = match (sense, m & PX != 0) {
            (Sense::Inside, start) => (x, start),
            (Sense::Outside, true) => (x - 1, false),
            (Sense::Outside, false) => (x + 1, true),
        };
        let i = list.partition_point(|v| v.x < x);
        if list.get(i).is_none_or(|v| v.x != x) {
            list.insert(
                i,
                AdjacentVoi {
                    x,
                    start_code: 0,
                    end_code: 0,
                },
            );
        }
        if is_start {
            list[i].start_code |= row_code;
        } else {
            list[i].end_code |= row_code;
        }
    }
}

/// Boundary voxels of the secondary region on one row, in column order.
///
/// Under [`Sense::Outside`] everything before the first marker is in the
/// region. Fills never run past column `clmns - 1`.
#[must_use]
pub fn derive_secondary_row(list: &[AdjacentVoi], sense: Sense, clmns: usize) -> Vec<SVoxel> {
    let (mut neighbors, mut in_segment) = match sense {
        Sense::Inside => (0, false),
        Sense::Outside => (ALL_NEIGHBORS, true),
    };
    let limit = i32::try_from(clmns).unwrap_or(i32::MAX);
    let mut out = Vec::new();

    for (k, voi) in list.iter().enumerate() {
        neighbors |= voi.start_code & OFF_ROW;
        if voi.start_code & VHERE != 0 {
            in_segment = true;
            neighbors |= PX;
        }
        if in_segment {
            if voi.end_code & VHERE != 0 {
                neighbors &= !PX;
            }
            if neighbors != ALL_NEIGHBORS {
                out.push(SVoxel {
                    x: voi.x,
                    code: neighbors,
                });
            }
        }
        neighbors &= !(voi.end_code & OFF_ROW);
        if !in_segment {
            continue;
        }
        if neighbors & PX == 0 {
            neighbors &= !NX;
            in_segment = false;
            continue;
        }
        neighbors |= NX;
        if neighbors != ALL_NEIGHBORS {
            let stop = list.get(k + 1).map_or(limit, |next| next.x.min(limit));
            out.extend((voi.x + 1..stop).map(|x| SVoxel { x, code: neighbors }));
        }
    }
    out
}
