//! Git annotated tag object implementation.

use super::commit::{LineParser, Signature};
use super::oid::Oid;
use super::{encode_object, ObjectType, RawObject};
use crate::error::{Error, Result};
use crate::infra::sha1;

/// An annotated tag object.
///
/// Distinct from a lightweight tag, which is just a reference pointing at a
/// commit: an annotated tag is a real object carrying its target's ID and
/// type, a tag name, a tagger signature, and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    target: Oid,
    target_type: ObjectType,
    tag_name: String,
    tagger: Signature,
    message: String,
}

impl Tag {
    /// Creates a tag object.
    pub fn new(
        target: Oid,
        target_type: ObjectType,
        tag_name: impl Into<String>,
        tagger: Signature,
        message: impl Into<String>,
    ) -> Self {
        Tag {
            target,
            target_type,
            tag_name: tag_name.into(),
            tagger,
            message: message.into(),
        }
    }

    /// Parses a Tag from a RawObject.
    ///
    /// The payload is a strict sequence: `object`, `type`, `tag`, and
    /// `tagger` lines, a blank line, then the message as the raw remainder.
    pub fn parse(raw: RawObject) -> Result<Self> {
        if raw.object_type != ObjectType::Tag {
            return Err(Error::TypeMismatch {
                expected: "tag",
                actual: raw.object_type.as_str(),
            });
        }

        let mut parser = LineParser::new(&raw.content)?;

        let (key, value) = parser.next_pair()?;
        if key != "object" {
            return Err(Error::InvalidObject {
                reason: format!("expected object line, got {:?}", key),
            });
        }
        let target = Oid::from_hex(value)?;

        let (key, value) = parser.next_pair()?;
        if key != "type" {
            return Err(Error::InvalidObject {
                reason: format!("expected type line, got {:?}", key),
            });
        }
        let target_type = ObjectType::parse(value).ok_or_else(|| Error::InvalidObject {
            reason: format!("unknown target type: {}", value),
        })?;

        let (key, value) = parser.next_pair()?;
        if key != "tag" {
            return Err(Error::InvalidObject {
                reason: format!("expected tag line, got {:?}", key),
            });
        }
        let tag_name = value.to_string();

        let (key, value) = parser.next_pair()?;
        if key != "tagger" {
            return Err(Error::InvalidObject {
                reason: format!("expected tagger line, got {:?}", key),
            });
        }
        let tagger = Signature::parse(value)?;

        let blank = parser.next_line()?;
        if !blank.is_empty() {
            return Err(Error::InvalidObject {
                reason: "expected blank line before message".to_string(),
            });
        }
        let message = parser.remainder().to_string();

        Ok(Tag {
            target,
            target_type,
            tag_name,
            tagger,
            message,
        })
    }

    /// Serializes the tag payload.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        if self.tag_name.contains('\n') {
            return Err(Error::Unserializable(
                "tag name contains a newline".to_string(),
            ));
        }
        let mut text = String::new();
        text.push_str("object ");
        text.push_str(&self.target.to_hex());
        text.push('\n');
        text.push_str("type ");
        text.push_str(self.target_type.as_str());
        text.push('\n');
        text.push_str("tag ");
        text.push_str(&self.tag_name);
        text.push('\n');
        text.push_str("tagger ");
        text.push_str(&self.tagger.to_line()?);
        text.push('\n');
        text.push('\n');
        text.push_str(&self.message);
        Ok(text.into_bytes())
    }

    /// Computes the tag's ID: the SHA-1 of its canonical bytes.
    pub fn id(&self) -> Result<Oid> {
        let bytes = encode_object(ObjectType::Tag, &self.to_payload()?);
        Ok(Oid::from_bytes(sha1(&bytes)))
    }

    /// Returns the ID of the tagged object.
    pub fn target(&self) -> &Oid {
        &self.target
    }

    /// Returns the type of the tagged object.
    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    /// Returns the tag name.
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Returns the tagger signature.
    pub fn tagger(&self) -> &Signature {
        &self.tagger
    }

    /// Returns the tag message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
