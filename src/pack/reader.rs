//! Pack file reading: index v2 lookup, entry inflation, delta resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::varint::{decode_delta_size, decode_offset_delta, decode_type_and_size, Cursor};
use crate::error::{Error, Result};
use crate::infra::{decompress_embedded, read_file, Sha1};
use crate::objects::oid::{Oid, OID_BYTES, OID_HEX_LEN};
use crate::objects::{ObjectType, RawObject};

const IDX_MAGIC: [u8; 4] = [0xFF, b't', b'O', b'c'];
const IDX_HEADER_LEN: usize = 8;
const FANOUT_LEN: usize = 256 * 4;
const IDX_TRAILER_LEN: usize = 40;

// Pack entry type tags. 0, 5, and 7 (ref-delta) are unsupported.
const TAG_COMMIT: u8 = 1;
const TAG_TREE: u8 = 2;
const TAG_BLOB: u8 = 3;
const TAG_TAG: u8 = 4;
const TAG_OFS_DELTA: u8 = 6;

/// A reader over one `.idx`/`.pack` file pair.
///
/// The reader is stateless: it holds only the two paths and opens and fully
/// reads the files on each call, so no file handles outlive an operation.
/// Only pack-index version 2 is supported.
#[derive(Debug)]
pub struct PackReader {
    index_path: PathBuf,
    pack_path: PathBuf,
}

impl PackReader {
    /// Creates a reader for an index/pack pair.
    ///
    /// Both files must exist.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(index: P, pack: Q) -> Result<Self> {
        let index_path = index.as_ref().to_path_buf();
        let pack_path = pack.as_ref().to_path_buf();
        if !index_path.is_file() || !pack_path.is_file() {
            return Err(Error::InvalidPack {
                reason: format!(
                    "pack pair incomplete: {} / {}",
                    index_path.display(),
                    pack_path.display()
                ),
            });
        }
        Ok(PackReader {
            index_path,
            pack_path,
        })
    }

    /// Tests whether the pack's index lists the given ID.
    pub fn contains(&self, oid: &Oid) -> Result<bool> {
        let idx_data = read_file(&self.index_path)?;
        let index = PackIndex::parse(&idx_data)?;
        Ok(index.find(oid)?.is_some())
    }

    /// Reads and fully reconstructs the object with the given ID.
    ///
    /// Returns `Ok(None)` when the index does not list the ID. On a hit the
    /// entry is inflated, any ofs-delta chain is resolved, and the result
    /// is verified to hash back to `oid` before being returned.
    pub fn read(&self, oid: &Oid) -> Result<Option<RawObject>> {
        let idx_data = read_file(&self.index_path)?;
        let index = PackIndex::parse(&idx_data)?;
        let position = match index.find(oid)? {
            Some(position) => position,
            None => return Ok(None),
        };
        let offset = index.pack_offset(position)?;

        let pack_data = read_file(&self.pack_path)?;
        let (object_type, content) = read_entry(&pack_data, offset)?;

        // Hash the synthesized header and the payload as two updates
        let header = format!("{} {}\0", object_type.as_str(), content.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(&content);
        let actual = Oid::from_bytes(hasher.digest());
        if actual != *oid {
            return Err(Error::HashMismatch {
                id: oid.to_hex(),
                actual: actual.to_hex(),
            });
        }

        Ok(Some(RawObject {
            object_type,
            content,
        }))
    }

    /// Collects every ID in the index that begins with `prefix`.
    ///
    /// The prefix must already be validated (lowercase hex, at most 40
    /// characters). The sorted ID table is binary-searched for the low
    /// sentinel (`prefix` padded with `0`) and streamed until the high
    /// sentinel (`prefix` padded with `f`) is passed.
    pub fn ids_by_prefix(&self, prefix: &str, out: &mut BTreeSet<Oid>) -> Result<()> {
        let mut low = String::with_capacity(OID_HEX_LEN);
        let mut high = String::with_capacity(OID_HEX_LEN);
        low.push_str(prefix);
        high.push_str(prefix);
        while low.len() < OID_HEX_LEN {
            low.push('0');
            high.push('f');
        }
        let low = Oid::from_hex(&low)?;
        let high = Oid::from_hex(&high)?;

        let idx_data = read_file(&self.index_path)?;
        let index = PackIndex::parse(&idx_data)?;

        // Binary search for the first id >= low
        let mut lo = 0usize;
        let mut hi = index.count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if index.id_at(mid) < *low.as_bytes() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        for position in lo..index.count {
            let id = Oid::from_bytes(index.id_at(position));
            if id > high {
                break;
            }
            out.insert(id);
        }
        Ok(())
    }
}

// A validated view over the bytes of a version-2 pack index.
//
// Layout after the 8-byte header: 256 x 4 fanout, N x 20 sorted ids,
// N x 4 CRC32 (unused here), N x 4 offsets (MSB-set entries index into a
// trailing 8-byte table for packs over 2 GiB), 2 x 20 trailer hashes
// (unverified).
struct PackIndex<'a> {
    data: &'a [u8],
    count: usize,
}

impl<'a> PackIndex<'a> {
    fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < IDX_HEADER_LEN + FANOUT_LEN + IDX_TRAILER_LEN {
            return Err(Error::InvalidPack {
                reason: "pack index too short".to_string(),
            });
        }
        if data[..4] != IDX_MAGIC {
            return Err(Error::InvalidPack {
                reason: "pack index magic number expected".to_string(),
            });
        }
        let version = read_u32(data, 4);
        if version != 2 {
            return Err(Error::InvalidPack {
                reason: format!("pack index version 2 expected, got {}", version),
            });
        }

        let count = read_u32(data, IDX_HEADER_LEN + 255 * 4) as usize;
        let index = PackIndex { data, count };
        if data.len() < index.extended_start() + IDX_TRAILER_LEN {
            return Err(Error::InvalidPack {
                reason: "pack index truncated".to_string(),
            });
        }
        Ok(index)
    }

    fn ids_start(&self) -> usize {
        IDX_HEADER_LEN + FANOUT_LEN
    }

    fn offsets_start(&self) -> usize {
        // The CRC32 table sits between the ids and the offsets
        self.ids_start() + self.count * (OID_BYTES + 4)
    }

    fn extended_start(&self) -> usize {
        self.offsets_start() + self.count * 4
    }

    // fanout[b] is the count of objects whose first byte is <= b
    fn fanout(&self, byte: usize) -> usize {
        read_u32(self.data, IDX_HEADER_LEN + byte * 4) as usize
    }

    fn id_at(&self, position: usize) -> [u8; OID_BYTES] {
        let start = self.ids_start() + position * OID_BYTES;
        self.data[start..start + OID_BYTES].try_into().unwrap()
    }

    // Locates an id by narrowing with the fanout table, then scanning the
    // sorted table linearly.
    fn find(&self, oid: &Oid) -> Result<Option<usize>> {
        let bytes = oid.as_bytes();
        let first = bytes[0] as usize;
        let start = if first > 0 { self.fanout(first - 1) } else { 0 };
        if start > self.count {
            return Err(Error::InvalidPack {
                reason: "pack index fanout exceeds object count".to_string(),
            });
        }

        for position in start..self.count {
            let id = self.id_at(position);
            match id.cmp(bytes) {
                std::cmp::Ordering::Equal => return Ok(Some(position)),
                std::cmp::Ordering::Greater => return Ok(None),
                std::cmp::Ordering::Less => continue,
            }
        }
        Ok(None)
    }

    fn pack_offset(&self, position: usize) -> Result<u64> {
        let raw = read_u32(self.data, self.offsets_start() + position * 4);
        if raw & 0x8000_0000 == 0 {
            return Ok(raw as u64);
        }
        let ext_index = (raw & 0x7FFF_FFFF) as usize;
        let start = self.extended_start() + ext_index * 8;
        if start + 8 > self.data.len() - IDX_TRAILER_LEN {
            return Err(Error::InvalidPack {
                reason: "extended pack offset out of range".to_string(),
            });
        }
        let bytes: [u8; 8] = self.data[start..start + 8].try_into().unwrap();
        Ok(u64::from_be_bytes(bytes))
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let bytes: [u8; 4] = data[at..at + 4].try_into().unwrap();
    u32::from_be_bytes(bytes)
}

// Reads the entry at `offset`, resolving any ofs-delta chain iteratively:
// walk backwards through base offsets collecting inflated delta streams,
// then apply them forward once a plain entry is reached. Base offsets
// strictly decrease, so the walk terminates.
fn read_entry(pack: &[u8], offset: u64) -> Result<(ObjectType, Vec<u8>)> {
    let mut offset = usize::try_from(offset).map_err(|_| Error::InvalidPack {
        reason: "entry offset out of range".to_string(),
    })?;
    let mut deltas: Vec<Vec<u8>> = Vec::new();

    let (object_type, mut data) = loop {
        if offset >= pack.len() {
            return Err(Error::InvalidPack {
                reason: "entry offset beyond end of pack".to_string(),
            });
        }
        let mut cur = Cursor::new(pack, offset);
        let (type_tag, size) = decode_type_and_size(&mut cur)?;
        match type_tag {
            TAG_COMMIT | TAG_TREE | TAG_BLOB | TAG_TAG => {
                let object_type = match type_tag {
                    TAG_COMMIT => ObjectType::Commit,
                    TAG_TREE => ObjectType::Tree,
                    TAG_BLOB => ObjectType::Blob,
                    _ => ObjectType::Tag,
                };
                let data = inflate_entry(pack, cur.pos(), size)?;
                break (object_type, data);
            }
            TAG_OFS_DELTA => {
                let distance = decode_offset_delta(&mut cur)?;
                if distance == 0 || distance > offset as u64 {
                    return Err(Error::InvalidPack {
                        reason: "delta base offset out of range".to_string(),
                    });
                }
                deltas.push(inflate_entry(pack, cur.pos(), size)?);
                offset -= distance as usize;
            }
            tag => {
                return Err(Error::InvalidPack {
                    reason: format!("unknown object type: {}", tag),
                });
            }
        }
    };

    while let Some(delta) = deltas.pop() {
        data = apply_delta(&data, &delta)?;
    }
    Ok((object_type, data))
}

// Inflates the zlib stream starting at `start`, which must produce exactly
// `size` bytes.
fn inflate_entry(pack: &[u8], start: usize, size: u64) -> Result<Vec<u8>> {
    let size = usize::try_from(size).map_err(|_| Error::InvalidPack {
        reason: "entry size out of range".to_string(),
    })?;
    let data = decompress_embedded(&pack[start..], size)?;
    if data.len() != size {
        return Err(Error::InvalidPack {
            reason: format!(
                "inflated size mismatch: header says {} but stream yielded {}",
                size,
                data.len()
            ),
        });
    }
    Ok(data)
}

// Applies one delta stream to its base.
fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut cur = Cursor::new(delta, 0);

    let base_size = decode_delta_size(&mut cur)?;
    if base_size != base.len() as u64 {
        return Err(Error::InvalidPack {
            reason: format!(
                "delta base length mismatch: expected {}, base is {}",
                base_size,
                base.len()
            ),
        });
    }
    let result_size = decode_delta_size(&mut cur)?;

    let mut out = Vec::new();
    while !cur.at_end() {
        let op = cur.u8()?;
        if op & 0x80 == 0 {
            // Insert: the next `op` bytes come from the delta stream
            if op == 0 {
                return Err(Error::InvalidPack {
                    reason: "delta opcode 0 is reserved".to_string(),
                });
            }
            out.extend_from_slice(cur.take(op as usize)?);
        } else {
            // Copy from the base: optional little-endian offset and length
            // bytes selected by the low seven bits of the opcode
            let mut copy_offset = 0usize;
            for i in 0..4 {
                if (op >> i) & 1 != 0 {
                    copy_offset |= (cur.u8()? as usize) << (i * 8);
                }
            }
            let mut copy_len = 0usize;
            for i in 0..3 {
                if (op >> (i + 4)) & 1 != 0 {
                    copy_len |= (cur.u8()? as usize) << (i * 8);
                }
            }
            if copy_len == 0 {
                copy_len = 0x10000;
            }
            let end = copy_offset
                .checked_add(copy_len)
                .filter(|&e| e <= base.len())
                .ok_or_else(|| Error::InvalidPack {
                    reason: "delta copy out of base range".to_string(),
                })?;
            out.extend_from_slice(&base[copy_offset..end]);
        }
    }

    if out.len() as u64 != result_size {
        return Err(Error::InvalidPack {
            reason: format!(
                "delta result length mismatch: expected {}, got {}",
                result_size,
                out.len()
            ),
        });
    }
    Ok(out)
}
