//! Streaming SHA-1 implementation (RFC 3174).
//!
//! Object identity in Git is the SHA-1 of the canonical serialization, so
//! hashing shows up on every read and write path. The streaming type below
//! supports taking a digest of the bytes fed so far without consuming the
//! accumulator, which the pack reader relies on to hash a synthesized header
//! followed by a payload.

/// SHA-1 digest size in bytes.
pub const DIGEST_SIZE: usize = 20;

const INIT_STATE: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

const ROUND_KEYS: [u32; 4] = [0x5A827999, 0x6ED9EBA1, 0x8F1BBCDC, 0xCA62C1D6];

/// A streaming SHA-1 hasher.
///
/// Bytes are fed incrementally with [`update`](Sha1::update). At any point
/// [`digest`](Sha1::digest) returns the hash of everything fed so far; the
/// hasher itself remains usable and can be fed more bytes afterwards.
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    block: [u8; 64],
    filled: usize,
    length: u64,
}

impl Sha1 {
    /// Creates a hasher in the initial state.
    pub fn new() -> Self {
        Sha1 {
            state: INIT_STATE,
            block: [0u8; 64],
            filled: 0,
            length: 0,
        }
    }

    /// Feeds bytes into the hasher.
    pub fn update(&mut self, mut data: &[u8]) {
        self.length = self.length.wrapping_add(data.len() as u64);

        // Top up a partially filled block first
        if self.filled > 0 {
            let want = 64 - self.filled;
            let n = want.min(data.len());
            self.block[self.filled..self.filled + n].copy_from_slice(&data[..n]);
            self.filled += n;
            data = &data[n..];
            if self.filled < 64 {
                return;
            }
            let block = self.block;
            self.compress(&block);
            self.filled = 0;
        }

        // Whole blocks straight from the input
        let mut chunks = data.chunks_exact(64);
        for chunk in &mut chunks {
            let block: [u8; 64] = chunk.try_into().unwrap();
            self.compress(&block);
        }

        // Stash the tail
        let rest = chunks.remainder();
        self.block[..rest.len()].copy_from_slice(rest);
        self.filled = rest.len();
    }

    /// Returns the digest of all bytes fed so far.
    ///
    /// The accumulator is not consumed; the hasher may continue to be
    /// updated after this call.
    pub fn digest(&self) -> [u8; DIGEST_SIZE] {
        self.clone().finish()
    }

    fn finish(mut self) -> [u8; DIGEST_SIZE] {
        let bit_length = self.length.wrapping_mul(8);

        self.block[self.filled] = 0x80;
        self.filled += 1;
        if self.filled > 56 {
            self.block[self.filled..].fill(0);
            let block = self.block;
            self.compress(&block);
            self.filled = 0;
        }
        self.block[self.filled..56].fill(0);
        self.block[56..].copy_from_slice(&bit_length.to_be_bytes());
        let block = self.block;
        self.compress(&block);

        let mut digest = [0u8; DIGEST_SIZE];
        for (chunk, word) in digest.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        digest
    }

    fn compress(&mut self, block: &[u8; 64]) {
        let mut schedule = [0u32; 80];
        for (i, word) in block.chunks_exact(4).enumerate() {
            schedule[i] = u32::from_be_bytes(word.try_into().unwrap());
        }
        for i in 16..80 {
            schedule[i] =
                (schedule[i - 3] ^ schedule[i - 8] ^ schedule[i - 14] ^ schedule[i - 16])
                    .rotate_left(1);
        }

        let [mut a, mut b, mut c, mut d, mut e] = self.state;
        for (i, &w) in schedule.iter().enumerate() {
            let f = match i / 20 {
                0 => (b & c) | (!b & d),
                1 | 3 => b ^ c ^ d,
                2 => (b & c) | (b & d) | (c & d),
                _ => unreachable!(),
            };
            let t = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(ROUND_KEYS[i / 20])
                .wrapping_add(w);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = t;
        }

        self.state[0] = self.state[0].wrapping_add(a);
        self.state[1] = self.state[1].wrapping_add(b);
        self.state[2] = self.state[2].wrapping_add(c);
        self.state[3] = self.state[3].wrapping_add(d);
        self.state[4] = self.state[4].wrapping_add(e);
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Sha1::new()
    }
}

/// Computes the SHA-1 digest of a byte slice in one shot.
pub fn sha1(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finish()
}
