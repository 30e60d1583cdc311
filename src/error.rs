use thiserror::Error;

/// Rejections of an uploaded image. These are client errors and are
/// surfaced to the caller as-is; nothing upstream retries them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The upload carried zero bytes.
    #[error("empty")]
    Empty,

    /// The declared content type is not JPEG or PNG.
    #[error("unsupported-format: {0}")]
    UnsupportedFormat(String),

    /// The upload exceeds the size ceiling.
    #[error("too-large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The bytes could not be decoded as an image.
    #[error("undecodable image: {0}")]
    Undecodable(String),

    /// Re-encoding to JPEG failed.
    #[error("failed to encode JPEG: {0}")]
    Encode(String),
}

impl ValidationError {
    /// Short stable code for the rejection ("empty", "unsupported-format", ...).
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Empty => "empty",
            ValidationError::UnsupportedFormat(_) => "unsupported-format",
            ValidationError::TooLarge { .. } => "too-large",
            ValidationError::Undecodable(_) => "undecodable",
            ValidationError::Encode(_) => "encode-failed",
        }
    }
}

/// Failures of the outbound model call. The orchestrator recovers from all
/// of them by falling back to simulation.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Cannot connect to model API at {0}: {1}")]
    Connection(String, String),

    #[error("Model API request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Model API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response from model API: {0}")]
    InvalidResponse(String),

    #[error("Model API response contained no text content")]
    EmptyContent,
}

/// The extracted candidate could not be turned into a result.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed analysis JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Character catalog is empty; nothing to resolve against")]
    EmptyCatalog,
}

/// Problems loading or validating the character catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate character id: {0}")]
    DuplicateId(String),

    #[error("Duplicate character name (case-insensitive): {0}")]
    DuplicateName(String),

    #[error("Character '{0}' has no traits")]
    MissingTraits(String),
}

/// Errors surfaced by the upload-level entry point.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Invalid image: {0}")]
    Validation(#[from] ValidationError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Why a real model call did not produce a result. Never surfaced past the
/// orchestrator; it only decides the fallback log line.
#[derive(Error, Debug)]
pub enum RealCallError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
