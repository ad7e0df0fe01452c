//! Parser for the `packed-refs` text file.
//!
//! Loose reference files are the primary store; `packed-refs` collects many
//! references into one file and acts as the fallback when no loose file
//! exists for a name.

use crate::error::{Error, Result};
use crate::objects::Oid;
use crate::refs::Reference;

/// A record from the packed-refs file, before any filtering.
#[derive(Debug, Clone)]
pub struct PackedRef {
    /// The reference name with the `refs/` prefix stripped, e.g.
    /// `heads/master` or `tags/v1`.
    pub name: String,
    /// The target object ID.
    pub target: Oid,
}

impl PackedRef {
    /// Returns true if this record names a tag reference.
    pub fn is_tag(&self) -> bool {
        self.name.starts_with("tags/")
    }

    /// Converts the record into a [`Reference`], validating the name.
    pub fn into_reference(self) -> Result<Reference> {
        Reference::new(self.name, self.target)
    }
}

/// Parses the contents of a packed-refs file.
///
/// The grammar: an optional header line `# pack-refs with: peeled` or
/// `# pack-refs with: peeled fully-peeled` (a trailing space is tolerated,
/// since git writes one), followed by records of `<40-hex> <refname>` where
/// the refname starts with `refs/`. Lines starting with `^` carry the
/// peeled target of the preceding tag and are skipped.
pub fn parse_packed_refs(text: &str) -> Result<Vec<PackedRef>> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if index == 0 && line.starts_with('#') {
            check_header(line)?;
            continue;
        }
        if line.starts_with('^') {
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let (hex, refname) = line.split_once(' ').ok_or_else(|| {
            Error::InvalidReference(format!("malformed packed-refs record: {:?}", line))
        })?;
        let target = Oid::from_hex(hex)
            .map_err(|_| Error::InvalidReference(format!("bad hash in packed-refs: {:?}", hex)))?;
        let name = refname.strip_prefix("refs/").ok_or_else(|| {
            Error::InvalidReference(format!(
                "packed-refs name must start with refs/: {:?}",
                refname
            ))
        })?;

        records.push(PackedRef {
            name: name.to_string(),
            target,
        });
    }

    Ok(records)
}

fn check_header(line: &str) -> Result<()> {
    let body = line.trim_end_matches(' ');
    if body == "# pack-refs with: peeled" || body == "# pack-refs with: peeled fully-peeled" {
        Ok(())
    } else {
        Err(Error::InvalidReference(format!(
            "unrecognized packed-refs header: {:?}",
            line
        )))
    }
}
