/// Core error types for shelf
use thiserror::Error;

/// Result type alias using `ShelfError`
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Core error type for shelf
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShelfError {
    /// Extension list named no extension at all
    #[error("At least one extension is required")]
    EmptyExtensionList,

    /// Extension contains characters that cannot appear in a file extension
    #[error("Invalid extension: {0:?}")]
    InvalidExtension(String),
}
