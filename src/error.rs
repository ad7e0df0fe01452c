//! Error types for gitvault.

use std::fmt;
use std::path::PathBuf;

/// The main error type for gitvault operations.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred.
    Io(std::io::Error),

    /// The specified path is not a valid Git repository.
    NotARepository(PathBuf),

    /// An operation was attempted on a closed repository.
    RepositoryClosed,

    /// The requested object was not found in any backend.
    ObjectNotFound(String),

    /// The requested reference was not found.
    RefNotFound(String),

    /// A hexadecimal prefix matched more than one object ID.
    AmbiguousPrefix(String),

    /// The provided string is not a valid object ID or ID prefix.
    InvalidOid(String),

    /// The provided string is not a valid reference name.
    InvalidRefName(String),

    /// A reference file or the packed-refs file is malformed.
    InvalidReference(String),

    /// An object payload or header is malformed.
    InvalidObject {
        /// The reason for invalidity.
        reason: String,
    },

    /// A pack file or pack index is malformed.
    InvalidPack {
        /// The reason for invalidity.
        reason: String,
    },

    /// The data read for an object does not hash to the requested ID.
    HashMismatch {
        /// The requested object ID.
        id: String,
        /// The hash the data actually produced.
        actual: String,
    },

    /// Type mismatch when expecting a specific object type.
    TypeMismatch {
        /// The expected type.
        expected: &'static str,
        /// The actual type.
        actual: &'static str,
    },

    /// Invalid UTF-8 sequence encountered.
    InvalidUtf8,

    /// Zlib decompression failed.
    DecompressionFailed,

    /// The object cannot be serialized in its current state.
    Unserializable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::NotARepository(path) => {
                write!(f, "not a git repository: {}", path.display())
            }
            Error::RepositoryClosed => write!(f, "repository already closed"),
            Error::ObjectNotFound(id) => write!(f, "object not found: {}", id),
            Error::RefNotFound(name) => write!(f, "reference not found: {}", name),
            Error::AmbiguousPrefix(prefix) => {
                write!(f, "prefix matches multiple object ids: {}", prefix)
            }
            Error::InvalidOid(s) => write!(f, "invalid object id: {}", s),
            Error::InvalidRefName(name) => write!(f, "invalid reference name: {}", name),
            Error::InvalidReference(reason) => write!(f, "invalid reference: {}", reason),
            Error::InvalidObject { reason } => write!(f, "invalid object: {}", reason),
            Error::InvalidPack { reason } => write!(f, "invalid pack: {}", reason),
            Error::HashMismatch { id, actual } => {
                write!(
                    f,
                    "hash mismatch: requested {} but data hashes to {}",
                    id, actual
                )
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {}, got {}", expected, actual)
            }
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::DecompressionFailed => write!(f, "zlib decompression failed"),
            Error::Unserializable(reason) => {
                write!(f, "object cannot be serialized: {}", reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// A specialized Result type for gitvault operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    // E-001: Display formats carry the relevant detail
    #[test]
    fn test_display_messages() {
        let err = Error::ObjectNotFound("da39a3ee".to_string());
        assert!(err.to_string().contains("da39a3ee"));

        let err = Error::TypeMismatch {
            expected: "commit",
            actual: "blob",
        };
        assert!(err.to_string().contains("commit"));
        assert!(err.to_string().contains("blob"));

        let err = Error::HashMismatch {
            id: "aaaa".to_string(),
            actual: "bbbb".to_string(),
        };
        assert!(err.to_string().contains("aaaa"));
        assert!(err.to_string().contains("bbbb"));
    }

    // E-002: Io errors keep their source
    #[test]
    fn test_io_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io);
        assert!(err.source().is_some());
        assert!(matches!(err, Error::Io(_)));
    }
}
