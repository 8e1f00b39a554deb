/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Upstream returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Media storage error: {0}")]
    Io(#[from] std::io::Error),
}
