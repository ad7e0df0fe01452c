//! Loose object store: one zlib-compressed file per object.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::oid::{Oid, OID_HEX_LEN};
use crate::error::{Error, Result};
use crate::infra::{compress, decompress, read_file, sha1, write_file_atomic};

/// A store for loose Git objects.
///
/// An object with hex ID `aabbcc…` lives at `<objects>/aa/bbcc…`: a
/// two-character fan-out directory and a 38-character file name. Files hold
/// the zlib-compressed canonical bytes (`"<type> <len>\0<payload>"`).
#[derive(Debug)]
pub struct LooseObjectStore {
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    /// Creates a store rooted at the given objects directory.
    pub fn new<P: AsRef<Path>>(objects_dir: P) -> Self {
        LooseObjectStore {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the path a loose object with this ID would occupy.
    pub fn object_path(&self, oid: &Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Checks whether a loose object file exists for this ID.
    pub fn exists(&self, oid: &Oid) -> bool {
        self.object_path(oid).is_file()
    }

    /// Reads and inflates an object, returning its canonical bytes.
    ///
    /// The inflated bytes must hash back to `oid`; a mismatch is reported
    /// as `Error::HashMismatch`. A missing file is `Error::ObjectNotFound`.
    pub fn read_canonical(&self, oid: &Oid) -> Result<Vec<u8>> {
        let compressed = read_file(self.object_path(oid)).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::ObjectNotFound(oid.to_hex())
            }
            other => other,
        })?;
        let bytes = decompress(&compressed)?;

        let actual = Oid::from_bytes(sha1(&bytes));
        if actual != *oid {
            return Err(Error::HashMismatch {
                id: oid.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(bytes)
    }

    /// Writes canonical object bytes, returning the resulting ID.
    ///
    /// If a file for the hash already exists this is a no-op (objects are
    /// content-addressed, so an existing file already holds these bytes).
    /// Otherwise the fan-out directory is created as needed and the
    /// deflated bytes land via an atomic temp-file rename, so a failed
    /// write leaves no partial object behind.
    pub fn write_canonical(&self, bytes: &[u8]) -> Result<Oid> {
        let oid = Oid::from_bytes(sha1(bytes));
        let path = self.object_path(&oid);
        if path.is_file() {
            return Ok(oid);
        }
        write_file_atomic(&path, &compress(bytes))?;
        Ok(oid)
    }

    /// Collects the IDs of loose objects whose hex begins with `prefix`.
    ///
    /// The prefix must already be validated (lowercase hex, at most 40
    /// characters). Prefixes shorter than the two fan-out characters scan
    /// every matching fan-out directory.
    pub fn ids_by_prefix(&self, prefix: &str, out: &mut BTreeSet<Oid>) -> Result<()> {
        if prefix.len() >= 2 {
            self.scan_fanout_dir(&prefix[..2], &prefix[2..], out)
        } else {
            let entries = match fs::read_dir(&self.objects_dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(Error::Io(e)),
            };
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.len() == 2
                    && name.starts_with(prefix)
                    && name.bytes().all(|b| b.is_ascii_hexdigit())
                {
                    self.scan_fanout_dir(&name, "", out)?;
                }
            }
            Ok(())
        }
    }

    // Scans one fan-out directory for file names extending rest_prefix to a
    // full 38-hex tail.
    fn scan_fanout_dir(
        &self,
        dir_name: &str,
        rest_prefix: &str,
        out: &mut BTreeSet<Oid>,
    ) -> Result<()> {
        let dir = self.objects_dir.join(dir_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.len() != OID_HEX_LEN - 2 || !name.starts_with(rest_prefix) {
                continue;
            }
            let full = format!("{}{}", dir_name, name);
            if let Ok(oid) = Oid::from_hex(&full) {
                out.insert(oid);
            }
        }
        Ok(())
    }
}
