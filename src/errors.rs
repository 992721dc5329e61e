use std::fmt;

/// Parse-time failures. Never produced by the storage layer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    NegativeId,
    StringTooLong,
    Syntax(String),
    Unknown(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrepareError::NegativeId => write!(f, "id must not be negative"),
            PrepareError::StringTooLong => write!(f, "string is too long"),
            PrepareError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            PrepareError::Unknown(stmt) => write!(f, "unrecognized keyword at start of '{}'", stmt),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// File length on open was not a multiple of PAGE_SIZE, or an accessor
    /// observed an invalid sentinel where a real page number was expected.
    CorruptFile(String),
    /// A page number at or beyond TABLE_MAX_PAGES was requested.
    PageOutOfRange(u32),
    TableFull,
    DuplicateKey(u32),
    NotFound(u32),
    Prepare(PrepareError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::CorruptFile(msg) => write!(f, "corrupt file: {}", msg),
            Error::PageOutOfRange(n) => write!(f, "page {} is out of range", n),
            Error::TableFull => write!(f, "table is full"),
            Error::DuplicateKey(id) => write!(f, "duplicate key {}", id),
            Error::NotFound(id) => write!(f, "id {} not found", id),
            Error::Prepare(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<PrepareError> for Error {
    fn from(err: PrepareError) -> Error {
        Error::Prepare(err)
    }
}

impl Error {
    /// Structural errors cannot be recovered from; the session must end.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::CorruptFile(_) | Error::PageOutOfRange(_))
    }
}

/// Logs at the level appropriate to the error's severity, then evaluates to
/// the error itself, so call sites can write `return Err(err!(...))`.
#[macro_export]
macro_rules! err {
    ($e:expr) => {{
        let e = $e;
        if e.is_fatal() {
            tracing::error!("{}", e);
        } else {
            tracing::debug!("{}", e);
        }
        e
    }};
}
