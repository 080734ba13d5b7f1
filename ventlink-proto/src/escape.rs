//! Byte stuffing that keeps the frame delimiter unambiguous.
//!
//! A frame on the wire is `MARK, escaped(payload ++ crc), MARK`. Inside the
//! escaped region [`FRAMING_MARK`] never appears: a payload or checksum byte
//! equal to [`FRAMING_MARK`] or [`FRAMING_ESCAPE`] is sent as the two bytes
//! `FRAMING_ESCAPE, byte ^ 0x20`. Every other byte is sent unchanged.
//!
//! ```text
//! 0xE2 -> 0x27 0xC2
//! 0x27 -> 0x27 0x07
//! ```

use crate::io::ByteSink;

/// Start/end of frame delimiter.
pub const FRAMING_MARK: u8 = 0xE2;

/// Escape prefix.
pub const FRAMING_ESCAPE: u8 = 0x27;

/// Value xor'ed into an escaped byte.
const ESCAPE_XOR: u8 = 0x20;

/// Errors while removing byte stuffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EscapeError {
    /// Escape byte as the final byte of the input.
    DanglingEscape,
    /// Escape followed by a byte that does not encode a reserved value.
    InvalidEscape,
    /// Unescaped delimiter inside the frame body.
    UnexpectedMark,
    /// Output sink ran out of space.
    Overflow,
}

impl core::fmt::Display for EscapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DanglingEscape => write!(f, "dangling escape"),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::UnexpectedMark => write!(f, "unexpected frame mark"),
            Self::Overflow => write!(f, "output buffer full"),
        }
    }
}

/// Whether `byte` must be escaped inside a frame.
#[inline]
#[must_use]
pub const fn needs_escape(byte: u8) -> bool {
    byte == FRAMING_MARK || byte == FRAMING_ESCAPE
}

/// Worst-case escaped size of `len` raw bytes.
#[inline]
#[must_use]
pub const fn escaped_len_max(len: usize) -> usize {
    len * 2
}

/// Write `byte` to `out`, escaping it if necessary.
///
/// Returns `false` if the sink filled up part way.
#[inline]
pub fn escape_byte<S: ByteSink + ?Sized>(byte: u8, out: &mut S) -> bool {
    if needs_escape(byte) {
        out.put(FRAMING_ESCAPE) && out.put(byte ^ ESCAPE_XOR)
    } else {
        out.put(byte)
    }
}

/// Sink adapter that escapes everything written through it.
pub struct Escaper<'a, S: ?Sized> {
    out: &'a mut S,
}

impl<'a, S: ByteSink + ?Sized> Escaper<'a, S> {
    /// Wrap a sink.
    pub fn new(out: &'a mut S) -> Self {
        Self { out }
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Escaper<'_, S> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        escape_byte(byte, self.out)
    }
}

/// Remove byte stuffing from `escaped`, writing raw bytes to `out`.
///
/// `escaped` must not contain delimiters. Returns the number of raw bytes
/// written.
pub fn unescape<S: ByteSink + ?Sized>(escaped: &[u8], out: &mut S) -> Result<usize, EscapeError> {
    let mut written = 0;
    let mut bytes = escaped.iter().copied();

    while let Some(byte) = bytes.next() {
        let raw = match byte {
            FRAMING_MARK => return Err(EscapeError::UnexpectedMark),
            FRAMING_ESCAPE => {
                let next = bytes.next().ok_or(EscapeError::DanglingEscape)?;
                let raw = next ^ ESCAPE_XOR;
                if !needs_escape(raw) {
                    return Err(EscapeError::InvalidEscape);
                }
                raw
            }
            other => other,
        };

        if !out.put(raw) {
            return Err(EscapeError::Overflow);
        }
        written += 1;
    }

    Ok(written)
}
