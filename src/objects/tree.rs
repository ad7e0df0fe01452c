//! Git tree object implementation.

use super::oid::{Oid, OID_BYTES};
use super::{ObjectType, RawObject};
use crate::error::{Error, Result};

/// File mode for tree entries.
///
/// Git admits exactly these four modes in this library; any other octal
/// value is a format error on parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Subdirectory (tree): 40000
    Directory,
    /// Regular file: 100644
    Regular,
    /// Executable file: 100755
    Executable,
    /// Symbolic link: 120000
    Symlink,
}

impl FileMode {
    /// Parses a file mode from its canonical octal spelling.
    ///
    /// Only the four canonical spellings (no leading zeros) are accepted,
    /// so a parsed tree re-serializes to the same bytes.
    pub fn from_octal(s: &str) -> Option<Self> {
        match s {
            "40000" => Some(FileMode::Directory),
            "100644" => Some(FileMode::Regular),
            "100755" => Some(FileMode::Executable),
            "120000" => Some(FileMode::Symlink),
            _ => None,
        }
    }

    /// Returns the canonical octal spelling of the mode.
    pub fn as_octal(&self) -> &'static str {
        match self {
            FileMode::Directory => "40000",
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
        }
    }

    /// Returns true if this mode points at a blob.
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            FileMode::Regular | FileMode::Executable | FileMode::Symlink
        )
    }

    /// Returns true if this mode points at a tree.
    pub fn is_directory(&self) -> bool {
        matches!(self, FileMode::Directory)
    }
}

/// An entry in a Git tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: FileMode,
    name: String,
    oid: Oid,
}

impl TreeEntry {
    /// Creates a tree entry.
    ///
    /// The name must not contain a NUL byte.
    pub fn new(mode: FileMode, name: impl Into<String>, oid: Oid) -> Result<Self> {
        let name = name.into();
        if name.contains('\0') {
            return Err(Error::InvalidObject {
                reason: "tree entry name contains NUL".to_string(),
            });
        }
        Ok(TreeEntry { mode, name, oid })
    }

    /// Returns the file mode of the entry.
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Returns the name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the object ID the entry points to.
    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Returns true if this entry points at a blob.
    pub fn is_file(&self) -> bool {
        self.mode.is_file()
    }

    /// Returns true if this entry points at a tree.
    pub fn is_directory(&self) -> bool {
        self.mode.is_directory()
    }

    // Git orders tree entries as if directory names carried a trailing
    // slash; this key realizes that ordering byte-lexicographically.
    fn sort_name(&self) -> Vec<u8> {
        let mut key = self.name.as_bytes().to_vec();
        if self.mode.is_directory() {
            key.push(b'/');
        }
        key
    }
}

/// A Git tree object: an ordered list of named entries.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Tree {
            entries: Vec::new(),
        }
    }

    /// Creates a tree from a list of entries.
    ///
    /// The entries are kept in the given order; call [`sort`](Tree::sort)
    /// before serializing unless the order is already canonical.
    pub fn from_entries(entries: Vec<TreeEntry>) -> Self {
        Tree { entries }
    }

    /// Parses a Tree from a RawObject.
    ///
    /// Each entry is `<octal-mode> <name>\0<20-byte-id>`. Unknown modes,
    /// truncated ids, and non-UTF-8 names are format errors.
    pub fn parse(raw: RawObject) -> Result<Self> {
        if raw.object_type != ObjectType::Tree {
            return Err(Error::TypeMismatch {
                expected: "tree",
                actual: raw.object_type.as_str(),
            });
        }

        let data = &raw.content;
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let space = data[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::InvalidObject {
                    reason: "tree entry missing space after mode".to_string(),
                })?;
            let mode_str =
                std::str::from_utf8(&data[pos..pos + space]).map_err(|_| Error::InvalidObject {
                    reason: "tree entry mode is not valid UTF-8".to_string(),
                })?;
            let mode = FileMode::from_octal(mode_str).ok_or_else(|| Error::InvalidObject {
                reason: format!("unknown tree entry mode: {}", mode_str),
            })?;
            pos += space + 1;

            let nul = data[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::InvalidObject {
                    reason: "tree entry missing NUL after name".to_string(),
                })?;
            let name = std::str::from_utf8(&data[pos..pos + nul])
                .map_err(|_| Error::InvalidObject {
                    reason: "tree entry name is not valid UTF-8".to_string(),
                })?
                .to_string();
            pos += nul + 1;

            if pos + OID_BYTES > data.len() {
                return Err(Error::InvalidObject {
                    reason: "tree entry id truncated".to_string(),
                });
            }
            let oid = Oid::from_slice(&data[pos..])?;
            pos += OID_BYTES;

            entries.push(TreeEntry { mode, name, oid });
        }

        Ok(Tree { entries })
    }

    /// Serializes the tree payload.
    ///
    /// The entry list must already be in canonical order with no duplicate
    /// sort names; otherwise this fails with `Error::Unserializable`.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        self.check_sorted()?;
        let mut payload = Vec::new();
        for entry in &self.entries {
            payload.extend_from_slice(entry.mode.as_octal().as_bytes());
            payload.push(b' ');
            payload.extend_from_slice(entry.name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(entry.oid.as_bytes());
        }
        Ok(payload)
    }

    /// Sorts the entries into canonical order.
    ///
    /// Entries order byte-lexicographically by name, except that a
    /// directory entry sorts as if its name had a trailing `/`.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.sort_name().cmp(&b.sort_name()));
    }

    fn check_sorted(&self) -> Result<()> {
        for pair in self.entries.windows(2) {
            let a = pair[0].sort_name();
            let b = pair[1].sort_name();
            if a >= b {
                return Err(Error::Unserializable(format!(
                    "tree entries not strictly sorted: {:?} before {:?}",
                    pair[0].name, pair[1].name
                )));
            }
        }
        Ok(())
    }

    /// Appends an entry. The caller is responsible for re-sorting before
    /// serialization.
    pub fn push(&mut self, entry: TreeEntry) {
        self.entries.push(entry);
    }

    /// Returns a slice of all entries.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }
}
