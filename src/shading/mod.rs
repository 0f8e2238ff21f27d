//! Surface shading: the angle-shade lookup table, per-normal shades and the
//! mixing tables used for non-binary kinds.

pub mod angle;
pub mod lut;
pub mod mixing;

pub use angle::{angle_shades, AngleShades};
pub use lut::{compute_shade_lut, ObjectShading, ShadeLut, MAX_ANGLE_SHADE, SHADE_LUT_SIZE};
pub use mixing::{MixingCache, MixingInputs, MixingTables};
