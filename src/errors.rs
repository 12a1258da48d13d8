/// Flapjack error types
#[derive(Debug, thiserror::Error)]
pub enum FlapjackError {
    /// Git object-database errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Branch lookup errors (branch or parent not found)
    #[error("Branch error: {0}")]
    Branch(String),

    /// Stack invariant violations (cycles, duplicate names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rebase conflicts that need manual resolution
    #[error("Conflict error: {0}")]
    Conflict(String),

    /// Remote git / host API failures
    #[error("Remote error: {0}")]
    Remote(String),

    /// The user declined or interrupted an interactive prompt
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl FlapjackError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Config(msg.into())
    }

    pub fn branch<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Branch(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Validation(msg.into())
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Conflict(msg.into())
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Remote(msg.into())
    }

    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        FlapjackError::Cancelled(msg.into())
    }

    pub fn github_api(status: u16, message: String) -> Self {
        FlapjackError::Remote(format!("GitHub API error: {status} - {message}"))
    }

    /// True for errors a run should exit quietly on (message only, no context chain)
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FlapjackError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, FlapjackError>;
