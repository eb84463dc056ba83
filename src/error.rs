use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Only structural problems with the input get reported here. Geometric edge
/// cases (degenerate triangles, points outside the mesh, non-finite
/// coordinates) are absorbed internally and show up as NaN sentinels in the
/// output arrays instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The mesh description itself is malformed.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Two arrays that must agree in size do not.
    #[error("size mismatch for {name}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Size implied by the rest of the input.
        expected: usize,
        /// Size actually received.
        actual: usize,
    },
}

impl Error {
    pub(crate) fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh(message.into())
    }

    /// Checks that an array has the size implied by the rest of the input.
    pub(crate) fn check_size(name: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            Err(Self::SizeMismatch {
                name,
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    }
}
