use crate::record::Timestamp;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A record already exists at this timestamp.
    DuplicateKey(Timestamp),
    /// The caller broke an operation's contract (inverted range, window out
    /// of range, perturbation overflow).
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DuplicateKey(ts) => write!(f, "Value already exists at timestamp {}", ts),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
