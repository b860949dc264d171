use std::fmt;
use std::io;

/// Every way a guide selection run can fail. All of them are fatal.
#[derive(Debug)]
pub enum GuideCoverError {
    /// A mapping or guide-list line could not be parsed. `line` is 1-based.
    MalformedInput { line: usize, message: String },
    /// The mapping lacks the `Total number of reads: <N>` header but one was required.
    MissingHeader,
    InvalidParameter(String),
    InsufficientGuides { requested: usize, available: usize },
    /// The sequence source ended before this record index was reached.
    SequenceNotFound { index: usize },
    SourceReadError(io::Error),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, GuideCoverError>;

impl GuideCoverError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        GuideCoverError::MalformedInput {
            line,
            message: message.into(),
        }
    }
}

impl From<io::Error> for GuideCoverError {
    fn from(e: io::Error) -> Self {
        GuideCoverError::Io(e)
    }
}

impl From<csv::Error> for GuideCoverError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map_or(0, |p| p.line() as usize);
        match e.into_kind() {
            csv::ErrorKind::Io(e) => GuideCoverError::Io(e),
            kind => GuideCoverError::malformed(line, format!("{:?}", kind)),
        }
    }
}

impl fmt::Display for GuideCoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuideCoverError::MalformedInput { line, message } => {
                write!(f, "malformed input on line {}: {}", line, message)
            }
            GuideCoverError::MissingHeader => write!(
                f,
                "mapping is missing the total number of reads on line 1, re-run the site finder with read totals enabled"
            ),
            GuideCoverError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            GuideCoverError::InsufficientGuides {
                requested,
                available,
            } => write!(
                f,
                "requested {} guides but only {} candidate sites are available",
                requested, available
            ),
            GuideCoverError::SequenceNotFound { index } => {
                write!(f, "sequence source ended before read {} was found", index)
            }
            GuideCoverError::SourceReadError(e) => write!(f, "error reading sequences: {}", e),
            GuideCoverError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GuideCoverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuideCoverError::SourceReadError(e) | GuideCoverError::Io(e) => Some(e),
            _ => None,
        }
    }
}
