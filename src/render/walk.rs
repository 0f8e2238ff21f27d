//! The per-voxel loop shared by object and reflection projection.

use crate::cancel::{should_stop, Interrupt};
use crate::cut::plane::VoxelPlane;
use crate::error::Result;
use crate::math::Vector2;
use crate::shading::angle::AngleShades;
use crate::shading::mixing::MixingTables;
use crate::shell::{Kind, ShellData, Tse};

use super::patch::Patch;
use super::raster::{Pixels, RasterImage, RasterParts, V_MAX_SHADE};
use super::transform::StructureTransform;
use super::{MIDDLE_DEPTH, SHADE_SCALE_FACTOR, V_SHADE_SCALE_FACTOR, Z_BUFFER_LEVELS};

/// Everything the walk needs besides the data and the raster.
pub(crate) struct WalkParams<'a> {
    pub transform: &'a StructureTransform,
    pub perspective: f64,
    /// Raster location in buffer pixels.
    pub center_loc: Vector2,
    pub patch: Option<&'a Patch>,
    pub shades: &'a AngleShades,
    pub tables: Option<&'a MixingTables>,
    pub mip: bool,
    /// Voxels outside this half-space are skipped.
    pub clip: Option<&'a VoxelPlane>,
}

#[derive(Debug, Clone, Copy)]
enum Sample {
    Binary(u8),
    Gray(u16),
    Rgb([u16; 3]),
    Mip { intensity: u8, value: u16 },
}

#[derive(Debug, Clone, Copy)]
struct Voxel {
    z: i32,
    sample: Sample,
    opacity: u8,
    likelihood: u8,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_shade(v: f64) -> u16 {
    v.round().clamp(0.0, f64::from(V_MAX_SHADE)) as u16
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn faded(opacity: f64, fade: u8) -> u8 {
    scale_u8(opacity * f64::from(fade) / 255.0)
}

/// Color, opacity and likelihood of one voxel seen at depth `z`.
fn shade_voxel(t: &Tse, shade: i32, fade: u8, z: i32, params: &WalkParams<'_>) -> Option<Voxel> {
    let kind = t.kind();
    let lit = i64::from(shade) * i64::from(z);
    let Some(tables) = params.tables.filter(|_| !kind.is_binary()) else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = (lit / SHADE_SCALE_FACTOR).clamp(0, 125) as u8;
        return Some(Voxel {
            z,
            sample: Sample::Binary(v),
            opacity: 255,
            likelihood: 255,
        });
    };
    if params.mip {
        let intensity = t.magnitude();
        return Some(Voxel {
            z,
            sample: Sample::Mip {
                intensity,
                value: tables.mip_lut[usize::from(intensity)],
            },
            opacity: 255,
            likelihood: intensity,
        });
    }
    #[allow(clippy::cast_precision_loss)]
    let sv = (lit / V_SHADE_SCALE_FACTOR).min(i64::from(V_MAX_SHADE)) as f64;
    let voxel = match kind {
        Kind::Gradient => {
            let g = usize::from(t.magnitude());
            let gray = tables.gray_emission() + tables.surf_pct[g] * sv * tables.gray_surface();
            Voxel {
                z,
                sample: Sample::Gray(clamp_shade(gray)),
                opacity: faded(f64::from(tables.surf_opacity[g]), fade),
                likelihood: t.likelihood(),
            }
        }
        Kind::Percent => {
            let p = t.percent();
            let m = usize::from(p >> 3);
            let f = usize::from(p & 7);
            let weight = tables.surf_pct[f * 255 / 7];
            let rgb = std::array::from_fn(|c| {
                clamp_shade(f64::from(tables.emission[m][c]) + weight * sv * tables.material_rgb[m][c])
            });
            #[allow(clippy::cast_precision_loss)]
            let opacity = 255.0 * tables.material_opacity[m] * f as f64 / 7.0;
            Voxel {
                z,
                sample: Sample::Rgb(rgb),
                opacity: faded(opacity, fade),
                likelihood: t.likelihood(),
            }
        }
        Kind::Direct => {
            let weight = tables.surf_pct[usize::from(t.magnitude())];
            let rgb = std::array::from_fn(|c| {
                clamp_shade(f64::from(tables.emission[0][c]) + weight * sv * tables.material_rgb[0][c])
            });
            Voxel {
                z,
                sample: Sample::Rgb(rgb),
                opacity: faded(255.0 * tables.material_opacity[0] * weight, fade),
                likelihood: t.likelihood(),
            }
        }
        Kind::BinaryA | Kind::BinaryB | Kind::TShell => return None,
    };
    Some(voxel)
}

fn stamp(parts: &mut RasterParts<'_>, x: i32, y: i32, voxel: &Voxel) {
    let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
        return;
    };
    if x >= parts.size || y >= parts.size {
        return;
    }
    let i = y * parts.size + x;
    if let Sample::Mip { intensity, .. } = voxel.sample {
        let stored = parts.likelihood.as_deref().map_or(0, |l| l[i]);
        if intensity <= stored && parts.z_buffer[i] != 0 {
            return;
        }
    } else if voxel.z <= parts.z_buffer[i] {
        return;
    }
    parts.z_buffer[i] = voxel.z;
    match (&mut *parts.pixels, voxel.sample) {
        (Pixels::Binary(p), Sample::Binary(v)) => p[i] = v,
        (Pixels::Gray(p), Sample::Gray(v) | Sample::Mip { value: v, .. }) => p[i] = v,
        (Pixels::Rgb(p), Sample::Rgb(rgb)) => p[3 * i..3 * i + 3].copy_from_slice(&rgb),
        (Pixels::Rgb(p), Sample::Mip { value, .. }) => p[3 * i..3 * i + 3].fill(value),
        _ => {}
    }
    if let Some(o) = parts.opacity.as_deref_mut() {
        o[i] = voxel.opacity;
    }
    if let Some(l) = parts.likelihood.as_deref_mut() {
        l[i] = voxel.likelihood;
    }
}

/// Projects every TSE of `data` into `raster`.
///
/// Returns `Ok(false)` if `interrupt` fired; the raster is then partly drawn.
///
/// # Errors
///
/// Returns `StoreError::NotInMemory` for on-disk data.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(crate) fn walk(
    data: &ShellData,
    params: &WalkParams<'_>,
    raster: &mut RasterImage,
    interrupt: &mut dyn Interrupt,
) -> Result<bool> {
    let m = &params.transform.matrix;
    let o = &params.transform.offset;
    let z_levels = f64::from(Z_BUFFER_LEVELS);
    let p = params.perspective;
    let l = params.center_loc;
    let mut parts = raster.parts_mut();

    for s in 0..data.slices() {
        if should_stop(interrupt) {
            return Ok(false);
        }
        tracing::trace!(slice = s, "projecting slice");
        for r in 0..data.rows() {
            let row = data.row(s, r)?;
            if row.is_empty() {
                continue;
            }
            let (rf, sf) = (r as f64, s as f64);
            let base = o + m.column(1) * rf + m.column(2) * sf;
            for t in row.iter() {
                let c = f64::from(t.column());
                if params.clip.is_some_and(|plane| !plane.contains(c, rf, sf)) {
                    continue;
                }
                let shade = params.shades.shade(t.normal_code());
                if shade == 0 {
                    continue;
                }
                let mut x = base.x + m[(0, 0)] * c;
                let mut y = base.y + m[(1, 0)] * c;
                let zf = MIDDLE_DEPTH + base.z + m[(2, 0)] * c;
                if p > 0.0 {
                    let f = z_levels * (100.0 - p) / (100.0 * z_levels - p * zf);
                    x = -l.x + f * (x + l.x);
                    y = -l.y + f * (y + l.y);
                }
                let z = zf as i32;
                if z <= 0 || z >= Z_BUFFER_LEVELS {
                    continue;
                }
                let Some(voxel) = shade_voxel(&t, shade, params.shades.fade(t.normal_code()), z, params) else {
                    continue;
                };
                match params.patch {
                    None => stamp(&mut parts, (x + 0.5).floor() as i32, (y + 0.5).floor() as i32, &voxel),
                    Some(patch) => {
                        let (ax, ay) = ((x + 0.25).floor() as i32, (y + 0.25).floor() as i32);
                        for (dx, dy) in patch.offsets() {
                            stamp(&mut parts, ax + dx, ay + dy, &voxel);
                        }
                    }
                }
            }
        }
    }
    Ok(true)
}
