//! Content checksums used to detect diverged replicas.

use std::fmt;

use xxhash_rust::xxh3::Xxh3;

/// 128-bit content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checksum(pub [u8; 16]);

impl Checksum {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self)
    }
}

/// Streaming checksum builder.
///
/// Every chunk is length-delimited before hashing, so `["ab", "c"]` and
/// `["a", "bc"]` produce different results.
pub struct ChecksumWriter {
    hasher: Xxh3,
}

impl ChecksumWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
        }
    }

    /// Feed one chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(&(chunk.len() as u64).to_be_bytes());
        self.hasher.update(chunk);
    }

    /// Finish and return the digest.
    pub fn finish(&self) -> Checksum {
        Checksum(self.hasher.digest128().to_be_bytes())
    }
}

impl Default for ChecksumWriter {
    fn default() -> Self {
        Self::new()
    }
}
