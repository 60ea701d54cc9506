use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum HllError {
    #[error("precision must be between 4 and 16, got {0}")]
    InvalidPrecision(u32),

    #[error("cannot merge sketches with different m (left m={left_m}, right m={right_m})")]
    IncompatiblePrecision { left_m: u32, right_m: u32 },

    #[error("unsupported wire format major version {0}")]
    IncompatibleFormat(u16),

    #[error("operation attempted on a disposed sketch")]
    Disposed,
}
