//! Repositories: the unified object and reference store interface.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::infra::{sha1, write_file_atomic};
use crate::objects::oid::OID_HEX_LEN;
use crate::objects::{
    decode_object, encode_object, Blob, Commit, GitObject, LooseObjectStore, Oid, Tag, Tree,
};
use crate::pack::PackReader;
use crate::refs::{check_name, parse_packed_refs, PackedRef, Reference};

/// The common interface over repository backends.
///
/// A repository stores hash-identified objects and named references. The
/// two implementations here are [`FileRepository`] (on-disk layout) and
/// [`MemoryRepository`] (two in-memory maps); consumers such as the commit
/// graph are written against this trait.
pub trait Repository {
    /// Tests whether the repository holds an object with this ID.
    fn contains(&self, id: &Oid) -> Result<bool>;

    /// Reads an object's canonical bytes (`"<type> <len>\0<payload>"`).
    fn read_raw(&self, id: &Oid) -> Result<Vec<u8>>;

    /// Reads and parses the object with this ID.
    fn read(&self, id: &Oid) -> Result<GitObject>;

    /// Writes an object, returning its ID. A no-op if already present.
    fn write(&mut self, object: &GitObject) -> Result<Oid>;

    /// Returns every object ID beginning with the given hex prefix.
    ///
    /// The prefix may be 0 to 40 characters; an empty prefix lists every
    /// object.
    fn ids_by_prefix(&self, prefix: &str) -> Result<BTreeSet<Oid>>;

    /// Lists the known branch and remote-tracking references.
    fn list_references(&self) -> Result<Vec<Reference>>;

    /// Reads the reference with the given name.
    fn read_reference(&self, name: &str) -> Result<Reference>;

    /// Creates or reassigns a reference. The reference must have a target.
    fn write_reference(&mut self, reference: &Reference) -> Result<()>;

    /// Deletes a reference. Deleting an absent reference is a no-op.
    fn delete_reference(&mut self, name: &str) -> Result<()>;

    /// Closes the repository. Idempotent; all later operations fail with
    /// `Error::RepositoryClosed`.
    fn close(&mut self);

    /// Resolves a hex prefix to the single object ID it abbreviates.
    ///
    /// Fails with `Error::ObjectNotFound` when nothing matches and
    /// `Error::AmbiguousPrefix` when more than one object does.
    fn unique_id_by_prefix(&self, prefix: &str) -> Result<Oid> {
        let matches = self.ids_by_prefix(prefix)?;
        let mut iter = matches.into_iter();
        match (iter.next(), iter.next()) {
            (Some(id), None) => Ok(id),
            (Some(_), Some(_)) => Err(Error::AmbiguousPrefix(prefix.to_string())),
            (None, _) => Err(Error::ObjectNotFound(prefix.to_string())),
        }
    }

    /// Reads an object expected to be a blob.
    fn read_blob(&self, id: &Oid) -> Result<Blob> {
        match self.read(id)? {
            GitObject::Blob(blob) => Ok(blob),
            other => Err(Error::TypeMismatch {
                expected: "blob",
                actual: other.kind().as_str(),
            }),
        }
    }

    /// Reads an object expected to be a tree.
    fn read_tree(&self, id: &Oid) -> Result<Tree> {
        match self.read(id)? {
            GitObject::Tree(tree) => Ok(tree),
            other => Err(Error::TypeMismatch {
                expected: "tree",
                actual: other.kind().as_str(),
            }),
        }
    }

    /// Reads an object expected to be a commit.
    fn read_commit(&self, id: &Oid) -> Result<Commit> {
        match self.read(id)? {
            GitObject::Commit(commit) => Ok(commit),
            other => Err(Error::TypeMismatch {
                expected: "commit",
                actual: other.kind().as_str(),
            }),
        }
    }

    /// Reads an object expected to be a tag.
    fn read_tag(&self, id: &Oid) -> Result<Tag> {
        match self.read(id)? {
            GitObject::Tag(tag) => Ok(tag),
            other => Err(Error::TypeMismatch {
                expected: "tag",
                actual: other.kind().as_str(),
            }),
        }
    }
}

// Validates a hex prefix (0 to 40 chars) and lowercases it.
fn check_prefix(prefix: &str) -> Result<String> {
    if prefix.len() > OID_HEX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidOid(prefix.to_string()));
    }
    Ok(prefix.to_ascii_lowercase())
}

/// A repository backed by a Git directory on disk.
///
/// Reads are dispatched to the loose object store first, then to each
/// `.idx`/`.pack` pair under `objects/pack/` in directory-enumeration
/// order; writes always land in the loose store. References resolve loose
/// files first and fall back to the `packed-refs` file.
#[derive(Debug)]
pub struct FileRepository {
    directory: PathBuf,
    closed: bool,
}

impl FileRepository {
    /// Opens an existing Git directory.
    ///
    /// The directory must exist and contain a `config` file and an
    /// `objects/` subdirectory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let directory = dir.as_ref().to_path_buf();
        if !directory.is_dir()
            || !directory.join("config").is_file()
            || !directory.join("objects").is_dir()
        {
            return Err(Error::NotARepository(directory));
        }
        Ok(FileRepository {
            directory,
            closed: false,
        })
    }

    /// Returns the repository directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::RepositoryClosed)
        } else {
            Ok(())
        }
    }

    fn store(&self) -> LooseObjectStore {
        LooseObjectStore::new(self.directory.join("objects"))
    }

    // Pairs up pack-*.idx files with their .pack siblings. Enumeration
    // order follows the filesystem; nothing orders packs relative to each
    // other.
    fn pack_readers(&self) -> Result<Vec<PackReader>> {
        let pack_dir = self.directory.join("objects").join("pack");
        let mut readers = Vec::new();
        let entries = match fs::read_dir(&pack_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(readers),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("pack-") || !name.ends_with(".idx") || !entry.path().is_file() {
                continue;
            }
            let pack_name = format!("{}pack", &name[..name.len() - 3]);
            let pack_path = pack_dir.join(pack_name);
            if pack_path.is_file() {
                readers.push(PackReader::new(entry.path(), pack_path)?);
            }
        }
        Ok(readers)
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        let mut path = self.directory.join("refs");
        for segment in name.split('/') {
            path.push(segment);
        }
        path
    }

    // A loose reference file is exactly 41 bytes: 40 hex digits and a
    // newline.
    fn parse_loose_ref(name: &str, bytes: &[u8]) -> Result<Reference> {
        if bytes.len() != OID_HEX_LEN + 1 || bytes[OID_HEX_LEN] != b'\n' {
            return Err(Error::InvalidReference(format!(
                "malformed reference file for {}",
                name
            )));
        }
        let hex = std::str::from_utf8(&bytes[..OID_HEX_LEN])
            .map_err(|_| Error::InvalidReference(format!("malformed reference file for {}", name)))?;
        let target = Oid::from_hex(hex)
            .map_err(|_| Error::InvalidReference(format!("malformed reference file for {}", name)))?;
        Reference::new(name, target)
    }

    fn packed_refs(&self) -> Result<Vec<PackedRef>> {
        match fs::read_to_string(self.directory.join("packed-refs")) {
            Ok(text) => parse_packed_refs(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    // Collects loose references under refs/<prefix>/, skipping files named
    // HEAD and anything that is not a regular file.
    fn collect_loose_refs(&self, prefix: &str, out: &mut Vec<Reference>) -> Result<()> {
        let dir = self.ref_path(prefix);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name == "HEAD" {
                continue;
            }
            let name = format!("{}/{}", prefix, file_name);
            let bytes = fs::read(entry.path())?;
            out.push(Self::parse_loose_ref(&name, &bytes)?);
        }
        Ok(())
    }
}

impl Repository for FileRepository {
    fn contains(&self, id: &Oid) -> Result<bool> {
        self.check_open()?;
        if self.store().exists(id) {
            return Ok(true);
        }
        for reader in self.pack_readers()? {
            if reader.contains(id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_raw(&self, id: &Oid) -> Result<Vec<u8>> {
        self.check_open()?;
        let store = self.store();
        if store.exists(id) {
            return store.read_canonical(id);
        }
        for reader in self.pack_readers()? {
            if let Some(raw) = reader.read(id)? {
                return Ok(encode_object(raw.object_type, &raw.content));
            }
        }
        Err(Error::ObjectNotFound(id.to_hex()))
    }

    fn read(&self, id: &Oid) -> Result<GitObject> {
        self.check_open()?;
        let store = self.store();
        if store.exists(id) {
            let bytes = store.read_canonical(id)?;
            return GitObject::decode(decode_object(&bytes)?);
        }
        for reader in self.pack_readers()? {
            if let Some(raw) = reader.read(id)? {
                return GitObject::decode(raw);
            }
        }
        Err(Error::ObjectNotFound(id.to_hex()))
    }

    fn write(&mut self, object: &GitObject) -> Result<Oid> {
        self.check_open()?;
        let bytes = object.to_bytes()?;
        self.store().write_canonical(&bytes)
    }

    fn ids_by_prefix(&self, prefix: &str) -> Result<BTreeSet<Oid>> {
        self.check_open()?;
        let prefix = check_prefix(prefix)?;
        let mut out = BTreeSet::new();
        self.store().ids_by_prefix(&prefix, &mut out)?;
        for reader in self.pack_readers()? {
            reader.ids_by_prefix(&prefix, &mut out)?;
        }
        Ok(out)
    }

    fn list_references(&self) -> Result<Vec<Reference>> {
        self.check_open()?;

        let mut result = Vec::new();
        self.collect_loose_refs("heads", &mut result)?;

        let remotes_dir = self.directory.join("refs").join("remotes");
        if remotes_dir.is_dir() {
            for entry in fs::read_dir(&remotes_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    let remote = entry.file_name().to_string_lossy().to_string();
                    self.collect_loose_refs(&format!("remotes/{}", remote), &mut result)?;
                }
            }
        }

        let seen: BTreeSet<String> = result.iter().map(|r| r.name().to_string()).collect();
        for record in self.packed_refs()? {
            // Tag references are not surfaced by the listing
            if record.is_tag() || seen.contains(&record.name) {
                continue;
            }
            result.push(record.into_reference()?);
        }
        Ok(result)
    }

    fn read_reference(&self, name: &str) -> Result<Reference> {
        check_name(name)?;
        self.check_open()?;

        match fs::read(self.ref_path(name)) {
            Ok(bytes) => return Self::parse_loose_ref(name, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }
        for record in self.packed_refs()? {
            if record.name == name {
                return record.into_reference();
            }
        }
        Err(Error::RefNotFound(name.to_string()))
    }

    fn write_reference(&mut self, reference: &Reference) -> Result<()> {
        self.check_open()?;
        let target = reference.target().ok_or_else(|| {
            Error::Unserializable(format!("reference {} has no target", reference.name()))
        })?;
        let contents = format!("{}\n", target.to_hex());
        write_file_atomic(self.ref_path(reference.name()), contents.as_bytes())
    }

    fn delete_reference(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        self.check_open()?;
        match fs::remove_file(self.ref_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A repository held entirely in memory.
///
/// Objects live in an ordered map keyed by ID, references in a map keyed by
/// name. Useful for tests and for staging object sets before writing them
/// to disk.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    objects: BTreeMap<Oid, Vec<u8>>,
    references: BTreeMap<String, Oid>,
    closed: bool,
}

impl MemoryRepository {
    /// Creates an empty in-memory repository.
    pub fn new() -> Self {
        MemoryRepository::default()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::RepositoryClosed)
        } else {
            Ok(())
        }
    }
}

impl Repository for MemoryRepository {
    fn contains(&self, id: &Oid) -> Result<bool> {
        self.check_open()?;
        Ok(self.objects.contains_key(id))
    }

    fn read_raw(&self, id: &Oid) -> Result<Vec<u8>> {
        self.check_open()?;
        self.objects
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ObjectNotFound(id.to_hex()))
    }

    fn read(&self, id: &Oid) -> Result<GitObject> {
        self.check_open()?;
        let bytes = self
            .objects
            .get(id)
            .ok_or_else(|| Error::ObjectNotFound(id.to_hex()))?;
        GitObject::decode(decode_object(bytes)?)
    }

    fn write(&mut self, object: &GitObject) -> Result<Oid> {
        self.check_open()?;
        let bytes = object.to_bytes()?;
        let id = Oid::from_bytes(sha1(&bytes));
        self.objects.entry(id).or_insert(bytes);
        Ok(id)
    }

    fn ids_by_prefix(&self, prefix: &str) -> Result<BTreeSet<Oid>> {
        self.check_open()?;
        let prefix = check_prefix(prefix)?;

        // Pad the prefix with zeros to form the lowest matching ID, then
        // walk the ordered map from there until the prefix stops matching
        let mut low = prefix.clone();
        while low.len() < OID_HEX_LEN {
            low.push('0');
        }
        let low = Oid::from_hex(&low)?;

        let mut out = BTreeSet::new();
        for id in self.objects.range(low..).map(|(id, _)| id) {
            if !id.to_hex().starts_with(&prefix) {
                break;
            }
            out.insert(*id);
        }
        Ok(out)
    }

    fn list_references(&self) -> Result<Vec<Reference>> {
        self.check_open()?;
        self.references
            .iter()
            .map(|(name, target)| Reference::new(name.clone(), *target))
            .collect()
    }

    fn read_reference(&self, name: &str) -> Result<Reference> {
        check_name(name)?;
        self.check_open()?;
        match self.references.get(name) {
            Some(target) => Reference::new(name, *target),
            None => Err(Error::RefNotFound(name.to_string())),
        }
    }

    fn write_reference(&mut self, reference: &Reference) -> Result<()> {
        self.check_open()?;
        let target = reference.target().ok_or_else(|| {
            Error::Unserializable(format!("reference {} has no target", reference.name()))
        })?;
        self.references
            .insert(reference.name().to_string(), *target);
        Ok(())
    }

    fn delete_reference(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        self.check_open()?;
        self.references.remove(name);
        Ok(())
    }

    fn close(&mut self) {
        self.objects.clear();
        self.references.clear();
        self.closed = true;
    }
}
