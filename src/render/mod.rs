pub mod context;
pub mod patch;
pub mod project;
pub mod raster;
pub mod reflect;
pub mod transform;
mod walk;

pub use context::RendererContext;
pub use patch::{needs_patch, Patch};
pub use project::Project;
pub use raster::{Mode, ObjectImage, Pixels, RasterImage};
pub use reflect::ProjectReflection;
pub use transform::{buffer_scale, Pose, StructureTransform};

use crate::shading::lut::MAX_ANGLE_SHADE;
use crate::shading::mixing::{MixingCache, MixingTables};

/// Number of z-buffer levels. Larger values are nearer the viewer.
pub const Z_BUFFER_LEVELS: i32 = 0x10_0000;
/// Z level of the scene center.
pub const MIDDLE_DEPTH: f64 = Z_BUFFER_LEVELS as f64 / 2.0 - 0.5;
/// Sub-levels per displayed depth step.
pub const Z_SUBLEVELS: i32 = 256;
/// Divides `shade * z` into a binary pixel value in `0..=125`.
pub const SHADE_SCALE_FACTOR: i64 = MAX_ANGLE_SHADE as i64 * (Z_BUFFER_LEVELS as i64 / 125);
/// Divides `shade * z` into a non-binary surface value.
pub const V_SHADE_SCALE_FACTOR: i64 = MAX_ANGLE_SHADE as i64 * (Z_BUFFER_LEVELS as i64 / 65533);

/// Owns the rendering context and the tables derived from it.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub context: RendererContext,
    pub(crate) mixing: MixingCache,
}

impl Renderer {
    #[must_use]
    pub fn new(context: RendererContext) -> Self {
        Self {
            context,
            mixing: MixingCache::default(),
        }
    }

    /// Mixing tables for the current context, rebuilt if it changed.
    pub fn mixing_tables(&mut self) -> &MixingTables {
        self.mixing.refresh(&self.context)
    }
}
