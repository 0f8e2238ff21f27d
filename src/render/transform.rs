//! Mapping from voxel indices to raster coordinates.

use crate::math::{mirror_matrix, round_i32, Matrix3, Vector2, Vector3};
use crate::shell::ShellData;

use super::context::RendererContext;
use super::raster::Mode;
use super::Z_BUFFER_LEVELS;

/// Pixels per millimetre of the raster in `mode`.
#[must_use]
pub fn buffer_scale(mode: Mode, ctx: &RendererContext) -> f64 {
    match mode {
        Mode::Icon => ctx.icon_scale * 0.25,
        Mode::OneToOne => ctx.scale,
        Mode::PixelReplicate => ctx.scale * 0.5,
        Mode::AntiAlias => 2.0 * ctx.scale,
    }
}

/// Picks the projection mode for an object.
#[must_use]
pub fn select_mode(icon: bool, opacity: f64, ctx: &RendererContext) -> Mode {
    if icon {
        Mode::Icon
    } else if !ctx.anti_alias {
        Mode::PixelReplicate
    } else if (opacity - 0.5).abs() < f64::EPSILON {
        Mode::OneToOne
    } else {
        Mode::AntiAlias
    }
}

/// Pose of an object for one projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Matrix3,
    pub displacement: Vector3,
}

impl Pose {
    /// The pose mirrored through the plane `normal . p = d`.
    #[must_use]
    pub fn mirrored(&self, normal: &Vector3, d: f64) -> Self {
        Self {
            rotation: mirror_matrix(normal) * self.rotation,
            displacement: self.displacement + normal * (2.0 * (d - normal.dot(&self.displacement))),
        }
    }
}

/// Affine map from `(column, row, slice)` to `(x, y, z)` in raster units.
///
/// `x` and `y` are buffer pixels relative to the frame center until
/// [`StructureTransform::locate`] moves them to the raster origin. `z` is in
/// z-buffer levels around the middle depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureTransform {
    pub matrix: Matrix3,
    pub offset: Vector3,
    /// Object center in buffer pixels and z levels.
    pub center: Vector3,
    pub buffer_scale: f64,
}

impl StructureTransform {
    /// Builds the transform for `data` placed by `pose` under the view of `ctx`.
    #[must_use]
    pub fn new(data: &ShellData, pose: &Pose, ctx: &RendererContext, buffer_scale: f64) -> Self {
        let f = data.file().borrow();
        let u = f.unit.size_mm();
        let info = &f.structures[data.shell_number()];
        let spacing = f.slice_spacing();
        let min = info.min_coordinate;
        let max = info.max_coordinate;

        let s = Matrix3::from_diagonal(&Vector3::new(buffer_scale, buffer_scale, -ctx.depth_scale));
        let g = ctx.view_rotation();
        let voxel = Matrix3::from_diagonal(&Vector3::new(f.xysize[0] * u, f.xysize[1] * u, spacing * u));
        let v0 = -0.5 * u * Vector3::new(max[0] + min[0], max[1] - min[1], max[2] - min[2]);

        Self {
            matrix: s * g * pose.rotation * voxel,
            offset: s * (g * pose.rotation * v0 + g * pose.displacement),
            center: s * g * pose.displacement,
            buffer_scale,
        }
    }

    /// Raster side length for an object of `diameter` millimetres.
    #[must_use]
    pub fn raster_size(&self, diameter: f64, mode: Mode, pad: bool) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut size = (diameter * self.buffer_scale).ceil().max(0.0) as usize + 1;
        if mode == Mode::AntiAlias && size % 2 == 1 {
            size += 1;
        }
        if pad {
            size += 2;
        }
        size
    }

    /// Places a raster of `size` pixels around the object center and moves the
    /// offset to the raster origin.
    ///
    /// Returns the raster's location; in one-to-one mode it is expressed in
    /// half pixels.
    pub fn locate(&mut self, size: usize, mode: Mode, perspective: f64) -> [i32; 2] {
        let z_levels = f64::from(Z_BUFFER_LEVELS);
        let dimin = (100.0 - perspective) / (100.0 - perspective * (0.5 + self.center.z / z_levels));
        #[allow(clippy::cast_precision_loss)]
        let half = 0.5 * size as f64;
        let at = |c: f64| match mode {
            Mode::AntiAlias => 2 * round_i32(0.5 * (dimin * c - half)),
            Mode::OneToOne => 2 * round_i32(dimin * c - half),
            Mode::PixelReplicate => round_i32(dimin * c - half),
            Mode::Icon => round_i32(c - half),
        };
        let location = [at(self.center.x), at(self.center.y)];
        let shift = location_in_pixels(location, mode);
        self.offset.x -= shift.x;
        self.offset.y -= shift.y;
        location
    }
}

/// A raster location in buffer pixels.
#[must_use]
pub fn location_in_pixels(location: [i32; 2], mode: Mode) -> Vector2 {
    let l = Vector2::new(f64::from(location[0]), f64::from(location[1]));
    if mode == Mode::OneToOne {
        l * 0.5
    } else {
        l
    }
}
