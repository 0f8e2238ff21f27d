//! Test shells built from voxel predicates.

use crate::error::Result;

use super::data::ShellData;
use super::file::ShellFile;
use super::normal::{neighbor_gradient, NormalCodec};
use super::tse::{Kind, Tse, NX, NY, NZ, PX, PY, PZ};

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxshell=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Grid dimensions: columns, rows, slices.
pub type Dims = [usize; 3];

/// Header for a unit-spaced grid, with the box covering the whole grid.
pub fn header(kind: Kind, dims: Dims) -> ShellFile {
    let [cols, rows, slices] = dims;
    #[allow(clippy::cast_precision_loss)]
    let locations = (0..slices).map(|s| s as f64).collect();
    let mut f = ShellFile::new(kind, [1.0, 1.0], locations, 1);
    let info = &mut f.structures[0];
    #[allow(clippy::cast_precision_loss)]
    {
        info.max_coordinate = [
            (cols - 1) as f64,
            (rows - 1) as f64,
            (slices - 1) as f64,
        ];
    }
    info.smallest_y1 = 0;
    info.largest_y1 = u16::try_from(cols - 1).unwrap_or(u16::MAX);
    f
}

/// Encodes the voxels selected by `inside(column, row, slice)` as a shell.
///
/// Gradient and direct shells carry magnitude `0x80`; percent shells are
/// fully material 1.
pub fn try_shell_from_voxels(
    kind: Kind,
    dims: Dims,
    inside: impl Fn(usize, usize, usize) -> bool,
) -> Result<ShellData> {
    let [cols, rows, slices] = dims;
    let at = |c: isize, r: isize, s: isize| {
        c >= 0
            && r >= 0
            && s >= 0
            && (c as usize) < cols
            && (r as usize) < rows
            && (s as usize) < slices
            && inside(c as usize, r as usize, s as usize)
    };
    let codec = NormalCodec::for_kind(kind);
    let mut words = Vec::new();
    let mut offsets = vec![0];
    let mut count = 0;
    for s in 0..slices {
        for r in 0..rows {
            for c in 0..cols {
                if !inside(c, r, s) {
                    continue;
                }
                let (ci, ri, si) = (c as isize, r as isize, s as isize);
                let mut n = 0;
                for (flag, dc, dr, ds) in [
                    (PX, 1, 0, 0),
                    (PY, 0, 1, 0),
                    (PZ, 0, 0, 1),
                    (NX, -1, 0, 0),
                    (NY, 0, -1, 0),
                    (NZ, 0, 0, -1),
                ] {
                    if at(ci + dc, ri + dr, si + ds) {
                        n |= flag;
                    }
                }
                if n == PX | PY | PZ | NX | NY | NZ {
                    continue;
                }
                let code = codec.encode(&neighbor_gradient(n));
                let column = u16::try_from(c).unwrap_or(u16::MAX);
                let mut t = Tse::new(kind, column, n, code);
                match kind {
                    Kind::Gradient | Kind::Direct => t = t.with_payload(0x80, 0xff),
                    Kind::Percent => t = t.with_percent(0b01_111).with_payload(0x80, 0xff),
                    _ => {}
                }
                t.write_to(&mut words);
                count += 1;
            }
            offsets.push(count);
        }
    }
    ShellData::in_memory(header(kind, dims).shared(), 0, rows, slices, words, offsets)
}

#[allow(clippy::unwrap_used)]
pub fn shell_from_voxels(
    kind: Kind,
    dims: Dims,
    inside: impl Fn(usize, usize, usize) -> bool,
) -> ShellData {
    try_shell_from_voxels(kind, dims, inside).unwrap()
}

/// An `n` x `n` x `n` solid cube filling its grid.
pub fn cube(kind: Kind, n: usize) -> ShellData {
    shell_from_voxels(kind, [n, n, n], |_, _, _| true)
}

/// Every TSE of `data` as `(slice, row, tse)`.
#[allow(clippy::unwrap_used)]
pub fn all_tses(data: &ShellData) -> Vec<(usize, usize, Tse)> {
    let mut out = Vec::new();
    for s in 0..data.slices() {
        for r in 0..data.rows() {
            out.extend(data.row(s, r).unwrap().iter().map(|t| (s, r, t)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_boundary_only() {
        let data = cube(Kind::BinaryA, 3);
        assert_eq!(data.tse_count(), 26);
        let center_row = data.row(1, 1).unwrap();
        assert_eq!(center_row.len(), 2);
        assert_eq!(center_row.get(0).neighbors() & PX, PX);
        assert_eq!(center_row.get(1).neighbors() & PX, 0);
    }

    #[test]
    fn percent_cube_carries_payload() {
        let data = cube(Kind::Percent, 2);
        let t = data.row(0, 0).unwrap().get(0);
        assert_eq!(t.percent(), 0b01_111);
        assert_eq!(t.magnitude(), 0x80);
    }
}
