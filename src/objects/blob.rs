//! Git blob object implementation.

use super::{ObjectType, RawObject};
use crate::error::{Error, Result};

/// A Git blob object: an opaque byte payload.
///
/// Blobs carry no metadata; file names and permissions live in the tree
/// entries that point at them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    content: Vec<u8>,
}

impl Blob {
    /// Creates a blob from raw content.
    pub fn new(content: Vec<u8>) -> Self {
        Blob { content }
    }

    /// Parses a Blob from a RawObject.
    ///
    /// Fails with `Error::TypeMismatch` if the raw object is not a blob.
    pub fn parse(raw: RawObject) -> Result<Self> {
        if raw.object_type != ObjectType::Blob {
            return Err(Error::TypeMismatch {
                expected: "blob",
                actual: raw.object_type.as_str(),
            });
        }
        Ok(Blob {
            content: raw.content,
        })
    }

    /// Serializes the blob payload. For blobs this is the content itself.
    pub fn to_payload(&self) -> Vec<u8> {
        self.content.clone()
    }

    /// Returns the raw content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the content as a UTF-8 string, if valid.
    pub fn content_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.content).map_err(|_| Error::InvalidUtf8)
    }

    /// Returns the size of the content in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the content looks binary.
    ///
    /// Uses Git's heuristic: a NUL byte within the first 8000 bytes.
    pub fn is_binary(&self) -> bool {
        let check = self.content.len().min(8000);
        self.content[..check].contains(&0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(object_type: ObjectType, content: &[u8]) -> RawObject {
        RawObject {
            object_type,
            content: content.to_vec(),
        }
    }

    // B-001: parse accepts blobs and keeps content intact
    #[test]
    fn test_parse() {
        let blob = Blob::parse(raw(ObjectType::Blob, b"Hello, World!")).unwrap();
        assert_eq!(blob.content(), b"Hello, World!");
        assert_eq!(blob.size(), 13);
    }

    // B-002: parse rejects other types
    #[test]
    fn test_parse_type_mismatch() {
        let result = Blob::parse(raw(ObjectType::Tree, b""));
        assert!(matches!(
            result,
            Err(Error::TypeMismatch {
                expected: "blob",
                actual: "tree"
            })
        ));
    }

    // B-003: payload is the content verbatim
    #[test]
    fn test_payload_round_trip() {
        let content = b"hi\n".to_vec();
        let blob = Blob::new(content.clone());
        assert_eq!(blob.to_payload(), content);
        let back = Blob::parse(raw(ObjectType::Blob, &content)).unwrap();
        assert_eq!(back, blob);
    }

    // B-004: content_str validates UTF-8
    #[test]
    fn test_content_str() {
        let blob = Blob::new(b"text".to_vec());
        assert_eq!(blob.content_str().unwrap(), "text");

        let blob = Blob::new(vec![0xff, 0xfe]);
        assert!(matches!(blob.content_str(), Err(Error::InvalidUtf8)));
    }

    // B-005: binary detection
    #[test]
    fn test_is_binary() {
        assert!(!Blob::new(b"plain text\n".to_vec()).is_binary());
        assert!(Blob::new(vec![b'a', 0, b'b']).is_binary());
    }
}
