//! Git object types (blob, tree, commit, tag) and the canonical codec.
//!
//! The canonical serialization of any object is `"<type> <len>\0<payload>"`;
//! the SHA-1 of those bytes is the object's identity. [`encode_object`] and
//! [`decode_object`] implement the header; the payload bodies live with
//! their types.

pub mod blob;
pub mod commit;
pub mod oid;
pub mod store;
pub mod tag;
pub mod tree;

pub use blob::Blob;
pub use commit::{Commit, Signature};
pub use oid::Oid;
pub use store::LooseObjectStore;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeEntry};

use crate::error::{Error, Result};
use crate::infra::sha1;

/// The type of a Git object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// A blob (file content).
    Blob,
    /// A tree (directory listing).
    Tree,
    /// A commit.
    Commit,
    /// An annotated tag.
    Tag,
}

impl ObjectType {
    /// Returns the type name as used in Git object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Parses a type name from a Git object header.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(ObjectType::Blob),
            "tree" => Some(ObjectType::Tree),
            "commit" => Some(ObjectType::Commit),
            "tag" => Some(ObjectType::Tag),
            _ => None,
        }
    }
}

/// A decoded object header plus its payload bytes.
#[derive(Debug, Clone)]
pub struct RawObject {
    /// The type of the object.
    pub object_type: ObjectType,
    /// The payload (canonical bytes minus the header).
    pub content: Vec<u8>,
}

/// Builds the canonical bytes for a payload: `"<type> <len>\0<payload>"`.
///
/// The length is the decimal payload length with no leading zeros, sign,
/// or whitespace.
pub fn encode_object(object_type: ObjectType, payload: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", object_type.as_str(), payload.len());
    let mut bytes = Vec::with_capacity(header.len() + payload.len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Splits canonical bytes into type and payload, validating the header.
///
/// The header must be NUL-terminated, contain exactly one space, name one
/// of the four object types, and carry a canonical decimal length: digits
/// only, no leading zeros (other than a lone `0`), no sign, no whitespace,
/// equal to the payload length.
pub fn decode_object(bytes: &[u8]) -> Result<RawObject> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::InvalidObject {
            reason: "missing NUL terminator in header".to_string(),
        })?;

    let header = std::str::from_utf8(&bytes[..nul]).map_err(|_| Error::InvalidObject {
        reason: "header is not valid UTF-8".to_string(),
    })?;

    let fields: Vec<&str> = header.split(' ').collect();
    if fields.len() != 2 {
        return Err(Error::InvalidObject {
            reason: format!("malformed header: {:?}", header),
        });
    }

    let object_type = ObjectType::parse(fields[0]).ok_or_else(|| Error::InvalidObject {
        reason: format!("unknown object type: {}", fields[0]),
    })?;

    let length = parse_canonical_length(fields[1])?;
    let content = &bytes[nul + 1..];
    if content.len() as u64 != length {
        return Err(Error::InvalidObject {
            reason: format!(
                "length mismatch: header says {} but payload is {} bytes",
                length,
                content.len()
            ),
        });
    }

    Ok(RawObject {
        object_type,
        content: content.to_vec(),
    })
}

/// Parses a decimal length field, rejecting non-canonical spellings such as
/// `007`, `-0`, `+5`, or embedded whitespace.
fn parse_canonical_length(s: &str) -> Result<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidObject {
            reason: format!("invalid length field: {:?}", s),
        });
    }
    let value: u64 = s.parse().map_err(|_| Error::InvalidObject {
        reason: format!("invalid length field: {:?}", s),
    })?;
    if value.to_string() != s {
        return Err(Error::InvalidObject {
            reason: format!("non-canonical length field: {:?}", s),
        });
    }
    Ok(value)
}

/// A unified sum type over the four Git object kinds.
#[derive(Debug, Clone)]
pub enum GitObject {
    /// A blob object containing file content.
    Blob(Blob),
    /// A tree object containing directory entries.
    Tree(Tree),
    /// A commit object.
    Commit(Commit),
    /// An annotated tag object.
    Tag(Tag),
}

impl GitObject {
    /// Decodes a raw object into the matching variant.
    pub fn decode(raw: RawObject) -> Result<Self> {
        match raw.object_type {
            ObjectType::Blob => Blob::parse(raw).map(GitObject::Blob),
            ObjectType::Tree => Tree::parse(raw).map(GitObject::Tree),
            ObjectType::Commit => Commit::parse(raw).map(GitObject::Commit),
            ObjectType::Tag => Tag::parse(raw).map(GitObject::Tag),
        }
    }

    /// Returns the type of this object.
    pub fn kind(&self) -> ObjectType {
        match self {
            GitObject::Blob(_) => ObjectType::Blob,
            GitObject::Tree(_) => ObjectType::Tree,
            GitObject::Commit(_) => ObjectType::Commit,
            GitObject::Tag(_) => ObjectType::Tag,
        }
    }

    /// Serializes the payload (canonical bytes minus the header).
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        match self {
            GitObject::Blob(blob) => Ok(blob.to_payload()),
            GitObject::Tree(tree) => tree.to_payload(),
            GitObject::Commit(commit) => commit.to_payload(),
            GitObject::Tag(tag) => tag.to_payload(),
        }
    }

    /// Serializes the full canonical bytes, header included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(encode_object(self.kind(), &self.to_payload()?))
    }

    /// Computes the object's ID: the SHA-1 of its canonical bytes.
    pub fn id(&self) -> Result<Oid> {
        Ok(Oid::from_bytes(sha1(&self.to_bytes()?)))
    }

    /// Returns a reference to the inner Blob if this is a Blob object.
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            GitObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    /// Returns a reference to the inner Tree if this is a Tree object.
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            GitObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Returns a reference to the inner Commit if this is a Commit object.
    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    /// Returns a reference to the inner Tag if this is a Tag object.
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            GitObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Consumes this object and returns the inner Blob, if any.
    pub fn into_blob(self) -> Option<Blob> {
        match self {
            GitObject::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    /// Consumes this object and returns the inner Tree, if any.
    pub fn into_tree(self) -> Option<Tree> {
        match self {
            GitObject::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Consumes this object and returns the inner Commit, if any.
    pub fn into_commit(self) -> Option<Commit> {
        match self {
            GitObject::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    /// Consumes this object and returns the inner Tag, if any.
    pub fn into_tag(self) -> Option<Tag> {
        match self {
            GitObject::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl From<Blob> for GitObject {
    fn from(blob: Blob) -> Self {
        GitObject::Blob(blob)
    }
}

impl From<Tree> for GitObject {
    fn from(tree: Tree) -> Self {
        GitObject::Tree(tree)
    }
}

impl From<Commit> for GitObject {
    fn from(commit: Commit) -> Self {
        GitObject::Commit(commit)
    }
}

impl From<Tag> for GitObject {
    fn from(tag: Tag) -> Self {
        GitObject::Tag(tag)
    }
}
