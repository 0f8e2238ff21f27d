//! Polygonal prisms drawn on the view and swept back in depth.

use std::ops::Range;

use crate::error::Result;
use crate::math::polygon_2d::{contains_point, line_crossings};
use crate::math::{Matrix3, Point2, Point3, Vector2, Vector3};
use crate::render::raster::RasterImage;
use crate::render::transform::{buffer_scale, location_in_pixels, Pose};
use crate::render::{RendererContext, MIDDLE_DEPTH};
use crate::shell::ShellData;

use super::voi::VoxelOfIntersectionList;

const EDGE_EPSILON: f64 = 1e-9;

/// A polygon in view pixels at main scale, relative to the view center,
/// extended from the z-buffer level `near_z` back by `depth` millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct Prism {
    pub vertices: Vec<Point2>,
    pub near_z: i32,
    pub depth: f64,
}

/// Affine map from voxel indices to view coordinates in millimetres.
#[derive(Debug, Clone, Copy)]
struct ViewMap {
    a: Matrix3,
    b: Vector3,
}

impl ViewMap {
    fn new(data: &ShellData, pose: &Pose, ctx: &RendererContext) -> Self {
        let f = data.file().borrow();
        let u = f.unit.size_mm();
        let info = &f.structures[data.shell_number()];
        let (min, max) = (info.min_coordinate, info.max_coordinate);
        let g = ctx.view_rotation();
        let voxel = Matrix3::from_diagonal(&Vector3::new(
            u * f.xysize[0],
            u * f.xysize[1],
            u * f.slice_spacing(),
        ));
        let v0 = Vector3::new(max[0] + min[0], max[1] - min[1], max[2] - min[2]) * (-0.5 * u);
        Self {
            a: g * pose.rotation * voxel,
            b: g * (pose.rotation * v0 + pose.displacement),
        }
    }
}

/// Parameters `t` for which `z0 + t * dz` lies in `near..=far`.
fn depth_interval(z0: f64, dz: f64, near: f64, far: f64) -> Option<(f64, f64)> {
    if dz.abs() < 1e-12 {
        return (near - EDGE_EPSILON..=far + EDGE_EPSILON)
            .contains(&z0)
            .then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let (ta, tb) = ((near - z0) / dz, (far - z0) / dz);
    Some((ta.min(tb), ta.max(tb)))
}

impl Prism {
    /// Depth range of the prism in view millimetres, near end first.
    #[must_use]
    pub fn slab(&self, ctx: &RendererContext) -> (f64, f64) {
        let near = (MIDDLE_DEPTH - f64::from(self.near_z)) / ctx.depth_scale;
        (near, near + self.depth)
    }

    /// Whether a view-space point (millimetres) is inside.
    #[must_use]
    pub fn contains_view_point(&self, q: &Vector3, ctx: &RendererContext) -> bool {
        let (near, far) = self.slab(ctx);
        (near - EDGE_EPSILON..=far + EDGE_EPSILON).contains(&q.z)
            && contains_point(&self.vertices, &Point2::new(q.x * ctx.scale, q.y * ctx.scale))
    }

    /// Whether a mark of an object posed by `pose` is inside.
    ///
    /// Marks are in millimetres relative to the object center.
    #[must_use]
    pub fn contains_mark(&self, mark: &Point3, pose: &Pose, ctx: &RendererContext) -> bool {
        let q = ctx.view_rotation() * (pose.rotation * mark.coords + pose.displacement);
        self.contains_view_point(&q, ctx)
    }

    /// Runs of voxel centers of `data` inside the prism.
    ///
    /// Points on the prism's faces count as inside. Perspective is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::OutOfMemory` if the list cannot be allocated.
    #[allow(clippy::cast_precision_loss)]
    pub fn enumerate(&self, data: &ShellData, pose: &Pose, ctx: &RendererContext) -> Result<VoxelOfIntersectionList> {
        let (rows, slices) = (data.rows(), data.slices());
        let clmns = usize::from(data.structure().largest_y1) + 1;
        let mut list = VoxelOfIntersectionList::new(rows, slices)?;
        if self.vertices.len() < 3 || rows == 0 || slices == 0 {
            return Ok(list);
        }
        let map = ViewMap::new(data, pose, ctx);
        let (near, far) = self.slab(ctx);
        let (row_range, slice_range) = self.voxel_bounds(&map, ctx.scale, (near, far), (rows, slices));
        let axis = map.a.column(0).into_owned();
        let dir = Vector2::new(axis.x, axis.y) * ctx.scale;
        let last = (clmns - 1) as f64;

        for s in slice_range {
            for r in row_range.clone() {
                let q0 = map.a * Vector3::new(0.0, r as f64, s as f64) + map.b;
                let Some((t_near, t_far)) = depth_interval(q0.z, axis.z, near, far) else {
                    continue;
                };
                let (lo, hi) = (t_near.max(0.0), t_far.min(last));
                let origin = Point2::new(q0.x * ctx.scale, q0.y * ctx.scale);
                let mut prev_end: Option<u16> = None;
                for (t0, t1) in self.row_intervals(&origin, &dir) {
                    let a = (t0.max(lo) - EDGE_EPSILON).ceil();
                    let b = (t1.min(hi) + EDGE_EPSILON).floor();
                    if a > b {
                        continue;
                    }
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let (a, b) = (a as u16, b as u16);
                    match prev_end {
                        Some(e) if u32::from(a) <= u32::from(e) + 1 => {
                            if b > e {
                                list.extend_last_run(s, r, b);
                                prev_end = Some(b);
                            }
                        }
                        _ => {
                            list.push_run(s, r, a, b)?;
                            prev_end = Some(b);
                        }
                    }
                }
            }
        }
        tracing::debug!(runs = list.run_count(), "enumerated prism");
        Ok(list)
    }

    /// Parameter intervals along `origin + t * dir` inside the polygon.
    fn row_intervals(&self, origin: &Point2, dir: &Vector2) -> Vec<(f64, f64)> {
        if dir.norm_squared() < EDGE_EPSILON {
            return if contains_point(&self.vertices, origin) {
                vec![(f64::NEG_INFINITY, f64::INFINITY)]
            } else {
                Vec::new()
            };
        }
        line_crossings(&self.vertices, origin, dir)
            .chunks_exact(2)
            .map(|p| (p[0], p[1]))
            .collect()
    }

    /// Rows and slices that can hold voxels inside the prism.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn voxel_bounds(
        &self,
        map: &ViewMap,
        scale: f64,
        (near, far): (f64, f64),
        (rows, slices): (usize, usize),
    ) -> (Range<usize>, Range<usize>) {
        let Some(inv) = map.a.try_inverse() else {
            return (0..rows, 0..slices);
        };
        let mut lo = Vector3::repeat(f64::INFINITY);
        let mut hi = Vector3::repeat(f64::NEG_INFINITY);
        for p in &self.vertices {
            for z in [near, far] {
                let v = inv * (Vector3::new(p.x / scale, p.y / scale, z) - map.b);
                lo = lo.inf(&v);
                hi = hi.sup(&v);
            }
        }
        let range = |a: f64, b: f64, n: usize| {
            let start = a.floor().max(0.0) as usize;
            let end = (b.ceil() + 1.0).max(0.0) as usize;
            start.min(n)..end.min(n)
        };
        (range(lo.y, hi.y, rows), range(lo.z, hi.z, slices))
    }
}

/// Largest z-buffer value drawn under `polygon` in `image`.
///
/// `polygon` is in view pixels at main scale, as for [`Prism`]. Returns
/// `None` when nothing is drawn under it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nearest_depth_in_polygon(image: &RasterImage, ctx: &RendererContext, polygon: &[Point2]) -> Option<i32> {
    let size = image.size();
    let location = location_in_pixels(image.image_location, image.mode);
    let to_main = ctx.scale / buffer_scale(image.mode, ctx);
    image
        .z_buffer()
        .iter()
        .enumerate()
        .filter(|&(_, &z)| z > 0)
        .filter(|&(i, _)| {
            let (x, y) = ((i % size) as f64, (i / size) as f64);
            let p = Point2::new((x + location.x) * to_main, (y + location.y) * to_main);
            contains_point(polygon, &p)
        })
        .map(|(_, &z)| z)
        .max()
}
