pub mod cancel;
pub mod cut;
pub mod error;
pub mod math;
pub mod render;
pub mod shading;
pub mod shell;

pub use error::{Result, VoxshellError};
