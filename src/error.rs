use thiserror::Error;

/// Top-level error type for the voxshell engine.
#[derive(Debug, Error)]
pub enum VoxshellError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Errors related to shell data and their shared headers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("shell data are not in memory")]
    NotInMemory,

    #[error("no slice location matches minimum z coordinate {location}")]
    SliceLocationMissing { location: f64 },

    #[error("invalid TSE layout: {0}")]
    InvalidLayout(String),

    #[error("row ({slice}, {row}) is outside the shell")]
    RowOutOfRange { slice: usize, row: usize },

    #[error("cannot read TSE data: {0}")]
    Source(String),
}

/// Errors related to projection and cutting operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Allocation failures.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("out of memory allocating {what} ({bytes} bytes)")]
    OutOfMemory { what: &'static str, bytes: usize },
}

impl ResourceError {
    pub(crate) fn out_of_memory<T>(what: &'static str, len: usize) -> Self {
        Self::OutOfMemory {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        }
    }
}

/// Convenience type alias for results using [`VoxshellError`].
pub type Result<T> = std::result::Result<T, VoxshellError>;

/// Allocates a vector of `len` copies of `value`, reporting failure instead of aborting.
///
/// # Errors
///
/// Returns `ResourceError::OutOfMemory` if the allocation cannot be satisfied.
pub(crate) fn try_filled<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| ResourceError::out_of_memory::<T>(what, len))?;
    v.resize(len, value);
    Ok(v)
}

/// Grows `v` so that `additional` more elements fit, reporting failure instead of aborting.
///
/// # Errors
///
/// Returns `ResourceError::OutOfMemory` if the allocation cannot be satisfied.
pub(crate) fn try_grow<T>(what: &'static str, v: &mut Vec<T>, additional: usize) -> Result<()> {
    v.try_reserve(additional)
        .map_err(|_| ResourceError::out_of_memory::<T>(what, v.len() + additional))?;
    Ok(())
}
