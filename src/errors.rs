//! Error Types
//!
//! The main error type [`KilnError`] covers the failure modes the engine can
//! report to callers: asset loading and decoding, and render-time capacity
//! limits. Recoverable runtime issues (a missing animation target, a missing
//! texture) are logged and patched with a safe default instead of surfacing
//! here; malformed geometry is skipped by the rasterizer rather than failed.

use thiserror::Error;

/// Triangle count ceiling for a single draw call.
///
/// Dynamic batches that would grow past this return
/// [`KilnError::BatchCapacity`] instead of silently truncating.
pub const MAX_BATCH_TRIANGLES: usize = 21_845;

/// The main error type for the kiln engine.
#[derive(Error, Debug)]
pub enum KilnError {
    /// The requested resource was not found in a [`Library`](crate::resources::Library).
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// glTF parsing or validation error, surfaced verbatim from the parser.
    #[error("glTF error: {0}")]
    Gltf(String),

    /// Texture image decoding error.
    #[error("image decode error: {0}")]
    ImageDecode(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A dynamic batch would exceed the per-draw triangle maximum.
    #[error("dynamic batch of {triangles} triangles exceeds the per-draw maximum of {MAX_BATCH_TRIANGLES}")]
    BatchCapacity {
        /// The triangle count the batch would have reached.
        triangles: usize,
    },
}

impl From<image::ImageError> for KilnError {
    fn from(err: image::ImageError) -> Self {
        KilnError::ImageDecode(err.to_string())
    }
}

impl From<gltf::Error> for KilnError {
    fn from(err: gltf::Error) -> Self {
        KilnError::Gltf(err.to_string())
    }
}

/// Alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;
