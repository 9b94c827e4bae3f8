//! Crate-level error type

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced by the renderer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Borrow limit of {limit} reached for {key}")]
    BorrowLimitExceeded { key: String, limit: usize },
    #[error("Failed to allocate resource: {0}")]
    Allocation(BackendError),
    #[error("Graphics API error: {0}")]
    Api(#[from] BackendError),
    #[error("Not supported: {0}")]
    Unsupported(String),
    #[error("All {0} texture units are bound")]
    TextureUnitsExhausted(u32),
    #[error("Program not found: {0}")]
    ProgramNotFound(String),
    #[error("Incompatible targets: {0}")]
    IncompatibleTargets(String),
    #[error("Region {region:?} does not fit in {width}x{height}")]
    RegionOutOfBounds {
        region: crate::backend::Area,
        width: u32,
        height: u32,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
