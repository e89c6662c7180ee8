//! Authentication error types.

use thiserror::Error;

/// Authentication errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No identity token was presented.
    #[error("missing identity token")]
    Missing,

    /// The presented token is not recognized.
    #[error("identity token not recognized")]
    Invalid,

    /// Failed to parse a key list file.
    #[error("failed to parse key list: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a key list.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
