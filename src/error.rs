use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input path not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Cannot read input directory {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Cannot decode {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation '{job}' timed out after {secs}s")]
    Timeout { job: String, secs: u64 },

    #[error("Cancelled before start")]
    Cancelled,

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Image too large: {0}x{1}. Maximum allowed: {2}x{2}")]
    ImageTooLarge(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

impl BatchError {
    /// Short machine-readable name, used in the JSON report.
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::Io(_) => "io",
            BatchError::InputNotFound(_) => "input_not_found",
            BatchError::InputUnreadable { .. } => "input_unreadable",
            BatchError::UnreadableFile { .. } => "unreadable_file",
            BatchError::UnsupportedOperation(_) => "unsupported_operation",
            BatchError::Encode { .. } => "encode",
            BatchError::WriteFailure { .. } => "write_failure",
            BatchError::Timeout { .. } => "timeout",
            BatchError::Cancelled => "cancelled",
            BatchError::InvalidQuality(_) => "invalid_quality",
            BatchError::InvalidDimensions(_) => "invalid_dimensions",
            BatchError::ImageTooLarge(..) => "image_too_large",
            BatchError::FileTooLarge(..) => "file_too_large",
            BatchError::UnsupportedFormat(_) => "unsupported_format",
            BatchError::InvalidConfig(_) => "invalid_config",
            BatchError::DirectoryCreationFailed(_) => "directory_creation_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
