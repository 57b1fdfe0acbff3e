use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError { path: PathBuf, source: std::io::Error },
    TemplateError(minijinja::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError { path, source } => {
                write!(f, "IO error at {}: {}", path.display(), source)
            }
            Error::TemplateError(e) => write!(f, "Template error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError { source, .. } => Some(source),
            Error::TemplateError(e) => Some(e),
        }
    }
}

impl Error {
    /// Wraps an I/O error together with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Error::TemplateError(err)
    }
}

/// Failure raised by a single reflection capability (one route's source scan,
/// one model's columns, a whole registry being unavailable, ...).
///
/// Extractors never propagate it: they log it and degrade to an empty or
/// default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionError {
    message: String,
}

impl ReflectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ReflectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReflectionError {}

impl From<std::io::Error> for ReflectionError {
    fn from(err: std::io::Error) -> Self {
        ReflectionError::new(err.to_string())
    }
}
