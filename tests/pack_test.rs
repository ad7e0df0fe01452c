//! Integration tests for pack file reading.
//!
//! Fixtures are assembled by hand: each test writes a `.pack`/`.idx` pair
//! into a temporary repository and reads it back through `PackReader` and
//! `FileRepository`.

use std::fs;
use std::path::{Path, PathBuf};

use miniz_oxide::deflate::compress_to_vec_zlib;
use tempfile::TempDir;

use gitvault::{Blob, Error, FileRepository, GitObject, Oid, PackReader, Repository};

// Pack entry type tags
const TAG_BLOB: u8 = 3;
const TAG_OFS_DELTA: u8 = 6;

/// Creates a minimal Git directory: `config` file plus `objects/pack/`.
fn make_repo() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    fs::write(root.join("config"), "[core]\n\trepositoryformatversion = 0\n").unwrap();
    fs::create_dir_all(root.join("objects").join("pack")).unwrap();
    fs::create_dir_all(root.join("refs").join("heads")).unwrap();
    (dir, root)
}

/// Encodes a pack entry header: 3-bit type, then the inflated size in
/// little-endian base-128 starting with four bits in the first byte.
fn type_size_header(tag: u8, mut size: u64) -> Vec<u8> {
    let mut first = (tag << 4) | (size & 0x0F) as u8;
    size >>= 4;
    if size > 0 {
        first |= 0x80;
    }
    let mut bytes = vec![first];
    while size > 0 {
        let mut byte = (size & 0x7F) as u8;
        size >>= 7;
        if size > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
    bytes
}

/// Encodes an ofs-delta back-distance (big-endian groups, +1 bias).
fn ofs_distance(mut value: u64) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        value -= 1;
        bytes.insert(0, 0x80 | (value & 0x7F) as u8);
        value >>= 7;
    }
    bytes
}

/// Encodes a delta header size (plain little-endian base-128).
fn size_varint(mut value: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
        if value == 0 {
            return bytes;
        }
    }
}

fn plain_entry(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut entry = type_size_header(tag, payload.len() as u64);
    entry.extend(compress_to_vec_zlib(payload, 6));
    entry
}

fn delta_entry(distance: u64, delta: &[u8]) -> Vec<u8> {
    let mut entry = type_size_header(TAG_OFS_DELTA, delta.len() as u64);
    entry.extend(ofs_distance(distance));
    entry.extend(compress_to_vec_zlib(delta, 6));
    entry
}

/// Assembles a pack file from raw entries, returning the file bytes and
/// the offset of each entry.
fn build_pack(entries: &[Vec<u8>]) -> (Vec<u8>, Vec<u64>) {
    let mut pack = b"PACK".to_vec();
    pack.extend(2u32.to_be_bytes());
    pack.extend((entries.len() as u32).to_be_bytes());

    let mut offsets = Vec::new();
    for entry in entries {
        offsets.push(pack.len() as u64);
        pack.extend_from_slice(entry);
    }
    // Trailer hash; the reader does not verify it
    pack.extend([0u8; 20]);
    (pack, offsets)
}

/// Assembles a version-2 index for the given id/offset pairs.
///
/// With `force_large`, every offset routes through the trailing 8-byte
/// table as if the pack were over 2 GiB.
fn build_idx(pairs: &[(Oid, u64)], force_large: bool) -> Vec<u8> {
    let mut sorted: Vec<(Oid, u64)> = pairs.to_vec();
    sorted.sort_by_key(|(id, _)| *id);

    let mut data = vec![0xFF, b't', b'O', b'c', 0, 0, 0, 2];
    for byte in 0..256usize {
        let count = sorted
            .iter()
            .filter(|(id, _)| (id.as_bytes()[0] as usize) <= byte)
            .count() as u32;
        data.extend(count.to_be_bytes());
    }
    for (id, _) in &sorted {
        data.extend_from_slice(id.as_bytes());
    }
    for _ in &sorted {
        data.extend([0u8; 4]); // CRC32, unused by the reader
    }
    let mut extended = Vec::new();
    for (_, offset) in &sorted {
        if *offset <= 0x7FFF_FFFF && !force_large {
            data.extend((*offset as u32).to_be_bytes());
        } else {
            let index = (extended.len() / 8) as u32;
            data.extend((0x8000_0000 | index).to_be_bytes());
            extended.extend(offset.to_be_bytes());
        }
    }
    data.extend(extended);
    data.extend([0u8; 40]); // pack-sha + idx-sha trailer, unverified
    data
}

fn write_pack(root: &Path, pack: &[u8], idx: &[u8]) -> (PathBuf, PathBuf) {
    let pack_dir = root.join("objects").join("pack");
    let idx_path = pack_dir.join("pack-testfixture.idx");
    let pack_path = pack_dir.join("pack-testfixture.pack");
    fs::write(&idx_path, idx).unwrap();
    fs::write(&pack_path, pack).unwrap();
    (idx_path, pack_path)
}

fn blob_id(content: &[u8]) -> Oid {
    GitObject::from(Blob::new(content.to_vec())).id().unwrap()
}

// PK-001: plain entries of every kind read back through the repository
#[test]
fn test_plain_entries() {
    let (_dir, root) = make_repo();

    let blob_a = b"alpha contents\n".to_vec();
    let blob_b = b"beta contents\n".to_vec();
    let id_a = blob_id(&blob_a);
    let id_b = blob_id(&blob_b);

    let (pack, offsets) = build_pack(&[plain_entry(TAG_BLOB, &blob_a), plain_entry(TAG_BLOB, &blob_b)]);
    let idx = build_idx(&[(id_a, offsets[0]), (id_b, offsets[1])], false);
    let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

    // Directly through the reader
    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    assert!(reader.contains(&id_a).unwrap());
    assert!(reader.contains(&id_b).unwrap());
    let raw = reader.read(&id_a).unwrap().unwrap();
    assert_eq!(raw.content, blob_a);

    // Through the repository dispatcher
    let repo = FileRepository::open(&root).unwrap();
    assert!(repo.contains(&id_a).unwrap());
    assert_eq!(repo.read_blob(&id_b).unwrap().content(), &blob_b[..]);
    assert_eq!(
        repo.read_raw(&id_a).unwrap(),
        [format!("blob {}\0", blob_a.len()).as_bytes(), &blob_a[..]].concat()
    );

    // An id the pack does not hold
    let missing = blob_id(b"not packed");
    assert!(!repo.contains(&missing).unwrap());
    assert!(matches!(repo.read(&missing), Err(Error::ObjectNotFound(_))));
}

// PK-002: a two-level ofs-delta chain reconstructs byte-exactly
#[test]
fn test_delta_chain() {
    let (_dir, root) = make_repo();

    let base = b"The quick brown fox jumps over the lazy dog\n".to_vec();

    // First delta: insert "NEW:" then copy base[0..10]
    let level1: Vec<u8> = [b"NEW:".as_slice(), &base[..10]].concat();
    let mut delta1 = size_varint(base.len() as u64);
    delta1.extend(size_varint(level1.len() as u64));
    delta1.push(4);
    delta1.extend_from_slice(b"NEW:");
    delta1.extend_from_slice(&[0x80 | 0x10, 10]); // copy offset 0, length 10

    // Second delta, on top of the first: copy level1[4..14]
    let level2: Vec<u8> = level1[4..14].to_vec();
    let mut delta2 = size_varint(level1.len() as u64);
    delta2.extend(size_varint(level2.len() as u64));
    delta2.extend_from_slice(&[0x80 | 0x01 | 0x10, 4, 10]); // offset 4, length 10

    let id_base = blob_id(&base);
    let id_l1 = blob_id(&level1);
    let id_l2 = blob_id(&level2);

    let entry0 = plain_entry(TAG_BLOB, &base);
    let (pack, offsets) = {
        // Distances depend on offsets, so lay the entries out first
        let base_off = 12u64;
        let l1_off = base_off + entry0.len() as u64;
        let entry1 = delta_entry(l1_off - base_off, &delta1);
        let l2_off = l1_off + entry1.len() as u64;
        let entry2 = delta_entry(l2_off - l1_off, &delta2);
        build_pack(&[entry0, entry1, entry2])
    };
    let idx = build_idx(
        &[(id_base, offsets[0]), (id_l1, offsets[1]), (id_l2, offsets[2])],
        false,
    );
    write_pack(&root, &pack, &idx);

    let repo = FileRepository::open(&root).unwrap();
    assert_eq!(repo.read_blob(&id_base).unwrap().content(), &base[..]);
    assert_eq!(repo.read_blob(&id_l1).unwrap().content(), &level1[..]);
    assert_eq!(repo.read_blob(&id_l2).unwrap().content(), &level2[..]);
}

// PK-003: a copy with length field 0 copies 0x10000 bytes
#[test]
fn test_delta_copy_64k() {
    let (_dir, root) = make_repo();

    let base: Vec<u8> = (0..70_000u32).map(|i| (i % 253) as u8).collect();
    let expected: Vec<u8> = base[..0x10000].to_vec();

    let mut delta = size_varint(base.len() as u64);
    delta.extend(size_varint(0x10000));
    delta.push(0x80); // no offset bytes, no length bytes: offset 0, length 0x10000

    let id_base = blob_id(&base);
    let id_slice = blob_id(&expected);

    let entry0 = plain_entry(TAG_BLOB, &base);
    let base_off = 12u64;
    let delta_off = base_off + entry0.len() as u64;
    let entry1 = delta_entry(delta_off - base_off, &delta);
    let (pack, offsets) = build_pack(&[entry0, entry1]);
    let idx = build_idx(&[(id_base, offsets[0]), (id_slice, offsets[1])], false);
    write_pack(&root, &pack, &idx);

    let repo = FileRepository::open(&root).unwrap();
    let slice = repo.read_blob(&id_slice).unwrap();
    assert_eq!(slice.size(), 0x10000);
    assert_eq!(slice.content(), &expected[..]);
}

// PK-004: offsets with the high bit set follow the 8-byte table
#[test]
fn test_extended_offsets() {
    let (_dir, root) = make_repo();

    let content = b"reachable through the large-offset table\n".to_vec();
    let id = blob_id(&content);

    let (pack, offsets) = build_pack(&[plain_entry(TAG_BLOB, &content)]);
    let idx = build_idx(&[(id, offsets[0])], true);
    let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    let raw = reader.read(&id).unwrap().unwrap();
    assert_eq!(raw.content, content);
}

// PK-005: reserved type tags are format errors
#[test]
fn test_reserved_type_tags() {
    for tag in [0u8, 5, 7] {
        let (_dir, root) = make_repo();
        let payload = b"whatever".to_vec();
        let id = blob_id(&payload);

        let (pack, offsets) = build_pack(&[plain_entry(tag, &payload)]);
        let idx = build_idx(&[(id, offsets[0])], false);
        let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

        let reader = PackReader::new(&idx_path, &pack_path).unwrap();
        assert!(
            matches!(reader.read(&id), Err(Error::InvalidPack { .. })),
            "tag {} should be rejected",
            tag
        );
    }
}

// PK-006: the inflated stream must match the declared size
#[test]
fn test_inflated_size_mismatch() {
    let (_dir, root) = make_repo();
    let payload = b"sized wrong".to_vec();
    let id = blob_id(&payload);

    // Header declares one byte more than the stream inflates to
    let mut entry = type_size_header(TAG_BLOB, payload.len() as u64 + 1);
    entry.extend(compress_to_vec_zlib(&payload, 6));
    let (pack, offsets) = build_pack(&[entry]);
    let idx = build_idx(&[(id, offsets[0])], false);
    let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    assert!(matches!(reader.read(&id), Err(Error::InvalidPack { .. })));
}

// PK-007: reconstructed bytes must hash to the requested id
#[test]
fn test_pack_hash_mismatch() {
    let (_dir, root) = make_repo();
    let payload = b"the real payload".to_vec();
    let wrong_id = blob_id(b"some other payload");

    let (pack, offsets) = build_pack(&[plain_entry(TAG_BLOB, &payload)]);
    let idx = build_idx(&[(wrong_id, offsets[0])], false);
    let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    assert!(matches!(
        reader.read(&wrong_id),
        Err(Error::HashMismatch { .. })
    ));
}

// PK-008: only index version 2 with the right magic is accepted
#[test]
fn test_bad_index() {
    let (_dir, root) = make_repo();
    let payload = b"indexed".to_vec();
    let id = blob_id(&payload);

    let (pack, offsets) = build_pack(&[plain_entry(TAG_BLOB, &payload)]);
    let good_idx = build_idx(&[(id, offsets[0])], false);

    // Wrong magic
    let mut bad_magic = good_idx.clone();
    bad_magic[0] = 0x00;
    let (idx_path, pack_path) = write_pack(&root, &pack, &bad_magic);
    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    assert!(matches!(
        reader.contains(&id),
        Err(Error::InvalidPack { .. })
    ));

    // Wrong version
    let mut bad_version = good_idx.clone();
    bad_version[7] = 1;
    fs::write(&idx_path, &bad_version).unwrap();
    assert!(matches!(
        reader.contains(&id),
        Err(Error::InvalidPack { .. })
    ));

    // Truncated
    fs::write(&idx_path, &good_idx[..100]).unwrap();
    assert!(matches!(
        reader.contains(&id),
        Err(Error::InvalidPack { .. })
    ));
}

// PK-009: prefix scans stream out of the sorted id table
#[test]
fn test_pack_prefix_lookup() {
    let (_dir, root) = make_repo();

    let blobs: Vec<Vec<u8>> = (0..8).map(|i| format!("blob number {}\n", i).into_bytes()).collect();
    let ids: Vec<Oid> = blobs.iter().map(|b| blob_id(b)).collect();

    let entries: Vec<Vec<u8>> = blobs.iter().map(|b| plain_entry(TAG_BLOB, b)).collect();
    let (pack, offsets) = build_pack(&entries);
    let pairs: Vec<(Oid, u64)> = ids.iter().copied().zip(offsets.iter().copied()).collect();
    let idx = build_idx(&pairs, false);
    write_pack(&root, &pack, &idx);

    let repo = FileRepository::open(&root).unwrap();

    // Empty prefix lists everything in the pack
    let all = repo.ids_by_prefix("").unwrap();
    assert_eq!(all.len(), ids.len());
    for id in &ids {
        assert!(all.contains(id));
    }

    // A specific full-length prefix narrows to one
    let target = &ids[3];
    let hex = target.to_hex();
    let found = repo.ids_by_prefix(&hex[..10]).unwrap();
    assert!(found.contains(target));
    assert_eq!(repo.unique_id_by_prefix(&hex).unwrap(), *target);
}

// PK-010: loose objects and packed objects union under one interface
#[test]
fn test_backend_union() {
    let (_dir, root) = make_repo();

    let packed = b"only in the pack\n".to_vec();
    let packed_id = blob_id(&packed);
    let (pack, offsets) = build_pack(&[plain_entry(TAG_BLOB, &packed)]);
    let idx = build_idx(&[(packed_id, offsets[0])], false);
    write_pack(&root, &pack, &idx);

    let mut repo = FileRepository::open(&root).unwrap();
    let loose_id = repo
        .write(&GitObject::from(Blob::new(b"only loose\n".to_vec())))
        .unwrap();

    assert!(repo.contains(&loose_id).unwrap());
    assert!(repo.contains(&packed_id).unwrap());

    let all = repo.ids_by_prefix("").unwrap();
    assert!(all.contains(&loose_id));
    assert!(all.contains(&packed_id));

    assert_eq!(repo.read_blob(&packed_id).unwrap().content(), &packed[..]);
    assert_eq!(repo.read_blob(&loose_id).unwrap().content(), b"only loose\n");
}

// PK-011: a delta whose distance points past the start of the pack fails
#[test]
fn test_delta_distance_out_of_range() {
    let (_dir, root) = make_repo();

    let mut delta = size_varint(1);
    delta.extend(size_varint(1));
    delta.push(1);
    delta.push(b'x');

    let id = blob_id(b"x");
    let entry = delta_entry(10_000, &delta); // further back than the file start
    let (pack, offsets) = build_pack(&[entry]);
    let idx = build_idx(&[(id, offsets[0])], false);
    let (idx_path, pack_path) = write_pack(&root, &pack, &idx);

    let reader = PackReader::new(&idx_path, &pack_path).unwrap();
    assert!(matches!(reader.read(&id), Err(Error::InvalidPack { .. })));
}
