//! Git commit object implementation.

use super::oid::Oid;
use super::{encode_object, ObjectType, RawObject};
use crate::error::{Error, Result};
use crate::infra::sha1;

/// A signature naming an author, committer, or tagger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: String,
    email: String,
    /// Unix timestamp in seconds, always UTC.
    timestamp: i64,
    /// Timezone offset in minutes ahead of UTC (+0900 = 540, -0500 = -300).
    tz_offset: i32,
}

impl Signature {
    /// Creates a new Signature.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp: i64,
        tz_offset: i32,
    ) -> Self {
        Signature {
            name: name.into(),
            email: email.into(),
            timestamp,
            tz_offset,
        }
    }

    /// Returns the person's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the Unix timestamp in seconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the timezone offset in minutes.
    pub fn tz_offset(&self) -> i32 {
        self.tz_offset
    }

    /// Parses a person line of the form `Name <email> timestamp [+-]HHMM`.
    ///
    /// The line must match `(.*?) <([^>]*)> (\d+) ([+-])(\d\d)(\d\d)` in its
    /// entirety: the name is everything before the first ` <` that lets the
    /// rest of the line parse, the email may be empty but cannot contain
    /// `>`, the timestamp is unsigned decimal, and the timezone is a sign
    /// plus exactly four digits.
    pub(crate) fn parse(line: &str) -> Result<Self> {
        let mut search = 0;
        while let Some(found) = line[search..].find(" <") {
            let name_end = search + found;
            if let Some(sig) = Self::parse_after_name(line, name_end) {
                return Ok(sig);
            }
            search = name_end + 1;
        }
        Err(Error::InvalidObject {
            reason: format!("malformed person line: {:?}", line),
        })
    }

    // Attempts to parse `<email> timestamp tz` starting right after the
    // name candidate. Returns None so the caller can retry at a later ` <`.
    fn parse_after_name(line: &str, name_end: usize) -> Option<Signature> {
        let rest = &line[name_end + 2..];
        let email_end = rest.find('>')?;
        let email = &rest[..email_end];

        let rest = rest[email_end + 1..].strip_prefix(' ')?;
        let ts_end = rest.bytes().position(|b| !b.is_ascii_digit())?;
        if ts_end == 0 {
            return None;
        }
        let timestamp: i64 = rest[..ts_end].parse().ok()?;

        let tz = rest[ts_end..].strip_prefix(' ')?;
        if tz.len() != 5 {
            return None;
        }
        let sign = match tz.as_bytes()[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        if !tz.as_bytes()[1..].iter().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hours: i32 = tz[1..3].parse().ok()?;
        let minutes: i32 = tz[3..5].parse().ok()?;

        Some(Signature {
            name: line[..name_end].to_string(),
            email: email.to_string(),
            timestamp,
            tz_offset: sign * (hours * 60 + minutes),
        })
    }

    /// Renders the signature as a person line.
    pub(crate) fn to_line(&self) -> Result<String> {
        if self.name.contains('\n') || self.email.contains('\n') {
            return Err(Error::Unserializable(
                "signature name or email contains a newline".to_string(),
            ));
        }
        if self.email.contains('>') {
            return Err(Error::Unserializable(
                "signature email contains '>'".to_string(),
            ));
        }
        if self.timestamp < 0 {
            return Err(Error::Unserializable(
                "signature timestamp is negative".to_string(),
            ));
        }
        Ok(format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp,
            format_timezone(self.tz_offset)
        ))
    }
}

/// Formats a minute offset as `[+-]HHMM`.
///
/// 0 becomes "+0000", 105 becomes "+0145", -240 becomes "-0400".
pub(crate) fn format_timezone(minutes: i32) -> String {
    let sign = if minutes >= 0 { '+' } else { '-' };
    let magnitude = minutes.unsigned_abs();
    format!("{}{:02}{:02}", sign, magnitude / 60, magnitude % 60)
}

// Walks a commit or tag payload line by line, preserving the raw remainder
// so messages round-trip byte-exactly.
pub(crate) struct LineParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineParser<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload).map_err(|_| Error::InvalidUtf8)?;
        Ok(LineParser { text, pos: 0 })
    }

    pub(crate) fn next_line(&mut self) -> Result<&'a str> {
        let end = self.text[self.pos..]
            .find('\n')
            .ok_or_else(|| Error::InvalidObject {
                reason: "unexpected end of payload".to_string(),
            })?;
        let line = &self.text[self.pos..self.pos + end];
        self.pos += end + 1;
        Ok(line)
    }

    pub(crate) fn next_pair(&mut self) -> Result<(&'a str, &'a str)> {
        let line = self.next_line()?;
        line.split_once(' ').ok_or_else(|| Error::InvalidObject {
            reason: format!("expected key-value line, got {:?}", line),
        })
    }

    pub(crate) fn remainder(self) -> &'a str {
        &self.text[self.pos..]
    }
}

/// A Git commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: Oid,
    parents: Vec<Oid>,
    author: Signature,
    committer: Signature,
    message: String,
}

impl Commit {
    /// Creates a commit with no parents.
    pub fn new(
        tree: Oid,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
    ) -> Self {
        Commit {
            tree,
            parents: Vec::new(),
            author,
            committer,
            message: message.into(),
        }
    }

    /// Appends a parent commit ID.
    pub fn add_parent(&mut self, parent: Oid) {
        self.parents.push(parent);
    }

    /// Parses a Commit from a RawObject.
    ///
    /// The payload is a strict sequence: one `tree` line, zero or more
    /// `parent` lines, an `author` line, a `committer` line, a blank line,
    /// then the message as the raw remainder.
    pub fn parse(raw: RawObject) -> Result<Self> {
        if raw.object_type != ObjectType::Commit {
            return Err(Error::TypeMismatch {
                expected: "commit",
                actual: raw.object_type.as_str(),
            });
        }

        let mut parser = LineParser::new(&raw.content)?;

        let (key, value) = parser.next_pair()?;
        if key != "tree" {
            return Err(Error::InvalidObject {
                reason: format!("expected tree line, got {:?}", key),
            });
        }
        let tree = Oid::from_hex(value)?;

        let mut parents = Vec::new();
        let (mut key, mut value) = parser.next_pair()?;
        while key == "parent" {
            parents.push(Oid::from_hex(value)?);
            (key, value) = parser.next_pair()?;
        }

        if key != "author" {
            return Err(Error::InvalidObject {
                reason: format!("expected author line, got {:?}", key),
            });
        }
        let author = Signature::parse(value)?;

        let (key, value) = parser.next_pair()?;
        if key != "committer" {
            return Err(Error::InvalidObject {
                reason: format!("expected committer line, got {:?}", key),
            });
        }
        let committer = Signature::parse(value)?;

        let blank = parser.next_line()?;
        if !blank.is_empty() {
            return Err(Error::InvalidObject {
                reason: "expected blank line before message".to_string(),
            });
        }
        let message = parser.remainder().to_string();

        Ok(Commit {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }

    /// Serializes the commit payload.
    ///
    /// Fails with `Error::Unserializable` if the parents list contains
    /// duplicates or a signature cannot be rendered.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        for (i, parent) in self.parents.iter().enumerate() {
            if self.parents[..i].contains(parent) {
                return Err(Error::Unserializable(format!(
                    "duplicate parent: {}",
                    parent
                )));
            }
        }

        let mut text = String::new();
        text.push_str("tree ");
        text.push_str(&self.tree.to_hex());
        text.push('\n');
        for parent in &self.parents {
            text.push_str("parent ");
            text.push_str(&parent.to_hex());
            text.push('\n');
        }
        text.push_str("author ");
        text.push_str(&self.author.to_line()?);
        text.push('\n');
        text.push_str("committer ");
        text.push_str(&self.committer.to_line()?);
        text.push('\n');
        text.push('\n');
        text.push_str(&self.message);
        Ok(text.into_bytes())
    }

    /// Computes the commit's ID: the SHA-1 of its canonical bytes.
    pub fn id(&self) -> Result<Oid> {
        let bytes = encode_object(ObjectType::Commit, &self.to_payload()?);
        Ok(Oid::from_bytes(sha1(&bytes)))
    }

    /// Returns the tree ID.
    pub fn tree(&self) -> &Oid {
        &self.tree
    }

    /// Returns the parent commit IDs, in order.
    pub fn parents(&self) -> &[Oid] {
        &self.parents
    }

    /// Returns the first parent, if any.
    pub fn parent(&self) -> Option<&Oid> {
        self.parents.first()
    }

    /// Returns the author signature.
    pub fn author(&self) -> &Signature {
        &self.author
    }

    /// Returns the committer signature.
    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    /// Returns the full commit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the first line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Returns true if this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns true if this commit has multiple parents.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE_SHA: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const PARENT_SHA: &str = "0123456789abcdef0123456789abcdef01234567";
    const PARENT2_SHA: &str = "abcdef0123456789abcdef0123456789abcdef01";

    fn raw_commit(content: &str) -> RawObject {
        RawObject {
            object_type: ObjectType::Commit,
            content: content.as_bytes().to_vec(),
        }
    }

    fn simple_payload() -> String {
        format!(
            "tree {}\nauthor John Doe <john@example.com> 1234567890 +0900\ncommitter Jane Doe <jane@example.com> 1234567899 -0500\n\nInitial commit\n",
            TREE_SHA
        )
    }

    // CM-001: parse a simple commit
    #[test]
    fn test_parse() {
        let commit = Commit::parse(raw_commit(&simple_payload())).unwrap();
        assert_eq!(commit.tree().to_hex(), TREE_SHA);
        assert!(commit.is_root());
        assert_eq!(commit.message(), "Initial commit\n");
        assert_eq!(commit.summary(), "Initial commit");
    }

    // CM-002: signatures parse with names, emails, timestamps, zones
    #[test]
    fn test_parse_signatures() {
        let commit = Commit::parse(raw_commit(&simple_payload())).unwrap();
        let author = commit.author();
        assert_eq!(author.name(), "John Doe");
        assert_eq!(author.email(), "john@example.com");
        assert_eq!(author.timestamp(), 1234567890);
        assert_eq!(author.tz_offset(), 540);

        let committer = commit.committer();
        assert_eq!(committer.name(), "Jane Doe");
        assert_eq!(committer.tz_offset(), -300);
    }

    // CM-003: parents in order, merge detection
    #[test]
    fn test_parse_parents() {
        let content = format!(
            "tree {}\nparent {}\nparent {}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\n\nMerge",
            TREE_SHA, PARENT_SHA, PARENT2_SHA
        );
        let commit = Commit::parse(raw_commit(&content)).unwrap();
        assert_eq!(commit.parents().len(), 2);
        assert_eq!(commit.parents()[0].to_hex(), PARENT_SHA);
        assert_eq!(commit.parents()[1].to_hex(), PARENT2_SHA);
        assert_eq!(commit.parent().unwrap().to_hex(), PARENT_SHA);
        assert!(commit.is_merge());
    }

    // CM-004: strict line order is enforced
    #[test]
    fn test_parse_order_enforced() {
        // Missing tree
        let content = "author A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\n\nhi";
        assert!(Commit::parse(raw_commit(content)).is_err());

        // Missing committer
        let content = format!("tree {}\nauthor A <a@x> 1 +0000\n\nhi", TREE_SHA);
        assert!(Commit::parse(raw_commit(&content)).is_err());

        // Missing blank line
        let content = format!(
            "tree {}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\nhi",
            TREE_SHA
        );
        assert!(Commit::parse(raw_commit(&content)).is_err());

        // Parent after author
        let content = format!(
            "tree {}\nauthor A <a@x> 1 +0000\nparent {}\ncommitter A <a@x> 1 +0000\n\nhi",
            TREE_SHA, PARENT_SHA
        );
        assert!(Commit::parse(raw_commit(&content)).is_err());
    }

    // CM-005: malformed person lines are rejected
    #[test]
    fn test_parse_bad_signatures() {
        for person in [
            "A a@x 1 +0000",          // no angle brackets
            "A <a@x> +0000",          // missing timestamp
            "A <a@x> 1x2 +0000",      // non-numeric timestamp
            "A <a@x> 1 0000",         // missing sign
            "A <a@x> 1 +000",         // short zone
            "A <a@x> 1 +00a0",        // non-digit zone
            "A <a@x> 1 +0000 extra",  // trailing junk
        ] {
            let content = format!(
                "tree {}\nauthor {}\ncommitter A <a@x> 1 +0000\n\nhi",
                TREE_SHA, person
            );
            assert!(
                Commit::parse(raw_commit(&content)).is_err(),
                "person line {:?} should be rejected",
                person
            );
        }
    }

    // CM-006: byte-exact round trip, including trailing newlines
    #[test]
    fn test_round_trip() {
        for payload in [
            simple_payload(),
            format!(
                "tree {}\nparent {}\nauthor A <a@x> 100 +0145\ncommitter B <> 200 -0400\n\n",
                TREE_SHA, PARENT_SHA
            ),
            format!(
                "tree {}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\n\nbody\n\nwith trailing\n\n\n",
                TREE_SHA
            ),
        ] {
            let commit = Commit::parse(raw_commit(&payload)).unwrap();
            assert_eq!(commit.to_payload().unwrap(), payload.as_bytes());
        }
    }

    // CM-007: timezone parsing and formatting
    #[test]
    fn test_timezones() {
        assert_eq!(format_timezone(0), "+0000");
        assert_eq!(format_timezone(105), "+0145");
        assert_eq!(format_timezone(-240), "-0400");
        assert_eq!(format_timezone(540), "+0900");
        assert_eq!(format_timezone(-660), "-1100");

        let sig = Signature::parse("A <a@x> 1 +0530").unwrap();
        assert_eq!(sig.tz_offset(), 330);
        let sig = Signature::parse("A <a@x> 1 -0145").unwrap();
        assert_eq!(sig.tz_offset(), -105);
    }

    // CM-008: names containing angle brackets still parse (lazy name match)
    #[test]
    fn test_tricky_names() {
        // Lazy name match: the first " <" wins, the email soaks up the
        // second "<" because only ">" is excluded from it.
        let sig = Signature::parse("Weird <name <w@x> 1 +0000").unwrap();
        assert_eq!(sig.name(), "Weird");
        assert_eq!(sig.email(), "name <w@x");

        let sig = Signature::parse("José García <jose@example.com> 1234567890 +0000").unwrap();
        assert_eq!(sig.name(), "José García");

        let sig = Signature::parse(" <e@x> 5 +0000");
        assert_eq!(sig.unwrap().name(), "");
    }

    // CM-009: serialization rejects bad state
    #[test]
    fn test_serialize_rejects() {
        let tree = Oid::from_hex(TREE_SHA).unwrap();
        let parent = Oid::from_hex(PARENT_SHA).unwrap();

        let mut commit = Commit::new(
            tree,
            Signature::new("A", "a@x", 1, 0),
            Signature::new("A", "a@x", 1, 0),
            "msg",
        );
        commit.add_parent(parent);
        commit.add_parent(parent);
        assert!(matches!(
            commit.to_payload(),
            Err(Error::Unserializable(_))
        ));

        let commit = Commit::new(
            tree,
            Signature::new("Bad\nName", "a@x", 1, 0),
            Signature::new("A", "a@x", 1, 0),
            "msg",
        );
        assert!(matches!(
            commit.to_payload(),
            Err(Error::Unserializable(_))
        ));

        let commit = Commit::new(
            tree,
            Signature::new("A", "a>x", 1, 0),
            Signature::new("A", "a@x", 1, 0),
            "msg",
        );
        assert!(matches!(
            commit.to_payload(),
            Err(Error::Unserializable(_))
        ));
    }

    // CM-010: id is stable across parse/serialize
    #[test]
    fn test_id() {
        let commit = Commit::parse(raw_commit(&simple_payload())).unwrap();
        let id = commit.id().unwrap();
        let reparsed = Commit::parse(raw_commit(&simple_payload())).unwrap();
        assert_eq!(reparsed.id().unwrap(), id);
    }
}
