use thiserror::Error;

/// Failures on the describe path: encoding the image and asking the proxy for
/// a description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescribeError {
    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Failed to read image: {0}")]
    Read(String),

    #[error("Could not reach the description service: {0}")]
    Transport(String),

    #[error("{0}")]
    Description(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Clipboard write failed: {0}")]
pub struct ClipboardError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    Read,
    Transport,
    Description,
    Clipboard,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Fetch => "fetch",
            ErrorKind::Read => "read",
            ErrorKind::Transport => "transport",
            ErrorKind::Description => "description",
            ErrorKind::Clipboard => "clipboard",
        }
    }
}

impl DescribeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DescribeError::Fetch(_) => ErrorKind::Fetch,
            DescribeError::Read(_) => ErrorKind::Read,
            DescribeError::Transport(_) => ErrorKind::Transport,
            DescribeError::Description(_) => ErrorKind::Description,
        }
    }
}

impl ClipboardError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Clipboard
    }
}

pub type Result<T> = std::result::Result<T, DescribeError>;
