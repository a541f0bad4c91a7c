use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input or parameter dimensions do not fit the 4-layer chain.
    Shape(String),
    /// An evaluation was requested before parameters were loaded.
    NotReady,
    InvalidArgument(String),
    /// A softmax or loss produced a non-finite value.
    Numeric(String),
    /// A parameter bundle or dataset is malformed.
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape(msg) => write!(f, "shape error: {msg}"),
            Error::NotReady => write!(f, "classifier has no parameters loaded"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::Numeric(msg) => write!(f, "numeric error: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
