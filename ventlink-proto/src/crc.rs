//! CRC32 checksum for link frames.
//!
//! Polynomial `0x741B8CD7` has Hamming distance 6 up to 16360 bits and
//! Hamming distance 4 up to 114663 bits (Koopman, "32-Bit Cyclic Redundancy
//! Codes for Internet Applications", 2002).
//!
//! Every input byte is processed as a 32-bit word holding the byte in its low
//! 8 bits with the upper 24 bits zero, i.e. `0x42` is checksummed as
//! `0x00000042`. Initial value is 0, no reflection, no final xor, so an empty
//! input has a checksum of 0.

use crc::{Algorithm, Crc};

/// Koopman CRC32 polynomial.
pub const CRC32_POLYNOMIAL: u32 = 0x741B_8CD7;

/// Size of the checksum trailer in bytes.
pub const CRC_LEN: usize = 4;

/// CRC-32/KOOPMAN-like parameters, MSB first with zero seed.
///
/// `check` is the conventional byte-wise checksum of `"123456789"`; the
/// word-per-byte checksum this module exposes is a different function of the
/// same register.
const CRC32_KOOPMAN_ZERO: Algorithm<u32> = Algorithm {
    width: 32,
    poly: CRC32_POLYNOMIAL,
    init: 0x0000_0000,
    refin: false,
    refout: false,
    xorout: 0x0000_0000,
    check: 0x085A_3197,
    residue: 0x0000_0000,
};

/// CRC32 calculator with 256-entry lookup table.
static CRC32: Crc<u32> = Crc::<u32>::new(&CRC32_KOOPMAN_ZERO);

/// Widen a byte into the big-endian 32-bit word the register consumes.
#[inline]
const fn word(byte: u8) -> [u8; 4] {
    [0, 0, 0, byte]
}

/// Calculate the CRC32 of a byte slice.
///
/// Returns 0 for an empty slice.
#[inline]
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    let mut digest = Crc32Digest::new();
    digest.update_slice(data);
    digest.finalize()
}

/// Advance a running CRC32 by one byte.
///
/// Folding this over a sequence starting from 0 yields [`crc32`] of the
/// sequence.
#[inline]
#[must_use]
pub fn crc32_step(crc: u32, byte: u8) -> u32 {
    let mut digest = CRC32.digest_with_initial(crc);
    digest.update(&word(byte));
    digest.finalize()
}

/// Check the big-endian CRC32 trailer at the end of `buf`.
///
/// The last [`CRC_LEN`] bytes are compared against the checksum of everything
/// before them. Buffers shorter than 5 bytes (no payload) never verify.
#[must_use]
pub fn verify_trailer(buf: &[u8]) -> bool {
    if buf.len() <= CRC_LEN {
        return false;
    }
    let (payload, trailer) = buf.split_at(buf.len() - CRC_LEN);
    let mut received = [0u8; CRC_LEN];
    received.copy_from_slice(trailer);
    crc32(payload) == u32::from_be_bytes(received)
}

/// CRC32 digest for incremental calculation.
///
/// Use this when a frame is produced byte-by-byte into a streaming sink.
pub struct Crc32Digest {
    digest: crc::Digest<'static, u32>,
}

impl Crc32Digest {
    /// Create a new CRC32 digest.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CRC32.digest(),
        }
    }

    /// Update the digest with a single byte.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.digest.update(&word(byte));
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update_slice(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Finalize and return the checksum value.
    #[inline]
    #[must_use]
    pub fn finalize(self) -> u32 {
        self.digest.finalize()
    }
}

impl Default for Crc32Digest {
    fn default() -> Self {
        Self::new()
    }
}
