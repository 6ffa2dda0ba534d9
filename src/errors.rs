use std::error::Error;
use std::fmt;
use std::io;

/// Enumeration of all possible errors that can occur during extraction
#[derive(Debug)]
pub enum ClipError {
    Configuration(ConfigurationError),
    Decode(DecodeError),
    Extraction(ExtractionError),
    NotFound(NotFoundError),
    Mp4(Mp4Error),
    Other(io::Error),
}

/// No usable video track, or an unrecognized codec description
#[derive(Debug)]
pub struct ConfigurationError {
    pub message: String,
}

impl ConfigurationError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The decoder rejected or failed on a submitted sample
#[derive(Debug)]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external transcoder process failed or produced unusable output
#[derive(Debug)]
pub struct ExtractionError {
    pub message: String,
}

impl ExtractionError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A seek target fell outside the available range
#[derive(Debug)]
pub struct NotFoundError {
    pub message: String,
}

impl NotFoundError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// MP4 format specific errors
#[derive(Debug)]
pub enum Mp4Error {
    /// Generic MP4 error with a descriptive message
    Error { message: String },
}

impl Mp4Error {
    pub fn new(message: impl Into<String>) -> Self {
        Mp4Error::Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for ClipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipError::Configuration(err) => write!(f, "Configuration error: {}", err),
            ClipError::Decode(err) => write!(f, "Decode error: {}", err),
            ClipError::Extraction(err) => write!(f, "Extraction error: {}", err),
            ClipError::NotFound(err) => write!(f, "Not found: {}", err),
            ClipError::Mp4(err) => write!(f, "MP4 error: {}", err),
            ClipError::Other(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for Mp4Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mp4Error::Error { message } => write!(f, "{}", message),
        }
    }
}

impl Error for ClipError {}
impl Error for ConfigurationError {}
impl Error for DecodeError {}
impl Error for ExtractionError {}
impl Error for NotFoundError {}
impl Error for Mp4Error {}

// Conversion implementations
impl From<io::Error> for ClipError {
    fn from(err: io::Error) -> Self {
        ClipError::Other(err)
    }
}

impl From<ConfigurationError> for ClipError {
    fn from(err: ConfigurationError) -> Self {
        ClipError::Configuration(err)
    }
}

impl From<DecodeError> for ClipError {
    fn from(err: DecodeError) -> Self {
        ClipError::Decode(err)
    }
}

impl From<ExtractionError> for ClipError {
    fn from(err: ExtractionError) -> Self {
        ClipError::Extraction(err)
    }
}

impl From<NotFoundError> for ClipError {
    fn from(err: NotFoundError) -> Self {
        ClipError::NotFound(err)
    }
}

impl From<Mp4Error> for ClipError {
    fn from(err: Mp4Error) -> Self {
        ClipError::Mp4(err)
    }
}

// Conversion to io::Error for callers that only speak io
impl From<ClipError> for io::Error {
    fn from(err: ClipError) -> Self {
        io::Error::other(err)
    }
}

// Type alias for Result with ClipError
pub type ClipResult<T> = Result<T, ClipError>;
