//! Cutting a shell with a secondary region.
//!
//! The region is reduced to a [`VoxelOfIntersectionList`] over the primary's
//! grid, either by a half-space or a prism enumerator or directly by the
//! caller. Each primary row is then intersected with the boundary voxels of
//! that region, derived from the list rows around it.

pub mod adjacent;
pub mod engine;
pub mod marks;
pub mod merge;
pub mod plane;
pub mod prism;
pub mod voi;

pub use adjacent::{derive_secondary_row, insert_adjacent_vois, AdjacentVoi, SVoxel, Sense};
pub use engine::{Cut, CutResult, Secondary, OUT_BLOCK_SIZE};
pub use merge::{merge_row, NewTseRule};
pub use plane::VoxelPlane;
pub use prism::{nearest_depth_in_polygon, Prism};
pub use voi::VoxelOfIntersectionList;
