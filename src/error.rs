use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeckBuddyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("Unable to create card #{index}: {reason}")]
    Load { index: usize, reason: String },

    #[error("Bundled asset missing: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Interrupted")]
    Interrupted,
}

impl DeckBuddyError {
    /// True for cooperative cancellation, which callers treat as normal flow.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, DeckBuddyError::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, DeckBuddyError>;
