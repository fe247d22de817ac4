//! Error types for the play-state engine and its persistence gateway.

use thiserror::Error;

/// Result type alias for engine operations.
pub type PlayResult<T> = Result<T, PlayError>;

/// Result type alias for persistence gateway operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by `PlayEngine` operations.
///
/// Rejections leave the document untouched. Not-found cases (deleting an
/// absent id, undo at the start of history) are not errors at all.
#[derive(Error, Debug)]
pub enum PlayError {
    /// Align/distribute called with too few selected objects.
    #[error("{operation} needs at least {required} selected objects, got {actual}")]
    InsufficientSelection {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    /// Attempted to delete the only remaining frame.
    #[error("Cannot delete the last remaining frame")]
    LastFrame,

    /// Frame durations must be positive.
    #[error("Invalid frame duration: {0} ms")]
    InvalidDuration(u32),

    /// NaN or infinite coordinate, rotation or size.
    #[error("Non-finite geometry for {0}")]
    NonFiniteGeometry(String),

    /// Annotation stroke that cannot be drawn.
    #[error("Malformed annotation {id}: {reason}")]
    MalformedAnnotation { id: String, reason: String },

    /// No formation preset with this id.
    #[error("Unknown formation preset: {0}")]
    UnknownPreset(String),

    /// An object with this id already exists. Callers generate ids.
    #[error("Object already exists: {0}")]
    DuplicateObject(String),

    /// Frame index outside the play's frame sequence.
    #[error("Frame index {index} out of bounds for play with {length} frames")]
    FrameIndexOutOfRange { index: usize, length: usize },

    /// No saved play with this id in the library.
    #[error("Saved play not found: {0}")]
    PlayNotFound(String),

    /// Imported or stored document is structurally invalid.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from the persistence gateway.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl PlayError {
    /// Creates an InsufficientSelection error.
    pub fn insufficient_selection(operation: &'static str, required: usize, actual: usize) -> Self {
        Self::InsufficientSelection {
            operation,
            required,
            actual,
        }
    }

    /// Creates a MalformedAnnotation error.
    pub fn malformed_annotation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAnnotation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a NonFiniteGeometry error.
    pub fn non_finite(id: impl Into<String>) -> Self {
        Self::NonFiniteGeometry(id.into())
    }

    /// Creates an UnknownPreset error.
    pub fn unknown_preset(id: impl Into<String>) -> Self {
        Self::UnknownPreset(id.into())
    }

    /// Creates a DuplicateObject error.
    pub fn duplicate_object(id: impl Into<String>) -> Self {
        Self::DuplicateObject(id.into())
    }

    /// Creates a FrameIndexOutOfRange error.
    pub fn frame_out_of_range(index: usize, length: usize) -> Self {
        Self::FrameIndexOutOfRange { index, length }
    }

    /// Creates a PlayNotFound error.
    pub fn play_not_found(id: impl Into<String>) -> Self {
        Self::PlayNotFound(id.into())
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// True for validation rejections the presentation layer should show as
    /// a message rather than treat as a bug.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientSelection { .. }
                | Self::LastFrame
                | Self::InvalidDuration(_)
                | Self::NonFiniteGeometry(_)
                | Self::MalformedAnnotation { .. }
                | Self::UnknownPreset(_)
        )
    }
}

/// Errors from the key-value persistence gateway.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record is not valid JSON or does not match the schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record written by a newer schema than this build understands.
    #[error("Unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    /// Key cannot be mapped onto the backend.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    /// Creates an UnsupportedVersion error.
    pub fn unsupported_version(found: u64, supported: u64) -> Self {
        Self::UnsupportedVersion { found, supported }
    }

    /// Creates an InvalidKey error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }
}
