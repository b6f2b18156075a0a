use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MizuError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive could not be opened at all; fatal for that archive only.
    #[error("cannot open archive {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, MizuError>;
