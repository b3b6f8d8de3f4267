use crate::error::Error;

/// Result type of every fallible operation in the library.
pub type Result<T> = std::result::Result<T, Error>;
