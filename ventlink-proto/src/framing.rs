//! Frame encoding and decoding.
//!
//! Frame format:
//! ```text
//! ┌──────┬─────────────────┬──────────────────────┬──────┐
//! │ MARK │ escaped payload │ escaped CRC32 (BE)   │ MARK │
//! │ 0xE2 │ 0..N bytes      │ 4..8 bytes           │ 0xE2 │
//! └──────┴─────────────────┴──────────────────────┴──────┘
//! ```
//!
//! The CRC32 covers the unescaped payload. See [`crate::escape`] for the
//! stuffing rules and [`crate::crc`] for the checksum.

use heapless::Vec;

use crate::codec::{Codec, CodecError};
use crate::crc::{verify_trailer, Crc32Digest, CRC_LEN};
use crate::escape::{escaped_len_max, unescape, Escaper, FRAMING_MARK};
use crate::io::{ByteSink, Counting};
use crate::messages::{CONTROLLER_STATUS_MAX_SIZE, GUI_STATUS_MAX_SIZE};

/// Worst-case on-wire length of a frame carrying `payload_len` raw bytes.
#[must_use]
pub const fn frame_length_max(payload_len: usize) -> usize {
    escaped_len_max(payload_len + CRC_LEN) + 2
}

/// Largest frame the receive path accepts (a [`GuiStatus`](crate::GuiStatus)).
pub const RX_FRAME_LENGTH_MAX: usize = frame_length_max(GUI_STATUS_MAX_SIZE);

/// Largest frame the transmit path produces (a [`ControllerStatus`](crate::ControllerStatus)).
pub const TX_FRAME_LENGTH_MAX: usize = frame_length_max(CONTROLLER_STATUS_MAX_SIZE);

/// Size of the unescaping working buffer.
const DECODE_BUFFER_SIZE: usize = if RX_FRAME_LENGTH_MAX > TX_FRAME_LENGTH_MAX {
    RX_FRAME_LENGTH_MAX
} else {
    TX_FRAME_LENGTH_MAX
};

/// Errors that can occur while encoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output stream cannot hold the whole frame.
    SinkFull,
    /// The message codec failed.
    Codec(CodecError),
}

impl From<CodecError> for EncodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::SinkFull => EncodeError::SinkFull,
            other => EncodeError::Codec(other),
        }
    }
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SinkFull => write!(f, "frame does not fit output stream"),
            Self::Codec(e) => write!(f, "codec error: {}", e),
        }
    }
}

/// Errors that can occur while decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The frame failed its integrity check: the CRC32 trailer does not match,
    /// there is no payload, the byte stuffing is broken, or the frame is
    /// larger than the working buffer.
    ChecksumMismatch,
    /// Checksum is valid but the payload is not a valid message.
    CodecFailure(CodecError),
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::CodecFailure(e) => write!(f, "codec failure: {}", e),
        }
    }
}

/// Outcome of a decode, without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeResult {
    Success,
    ChecksumMismatch,
    CodecFailure,
}

impl<M> From<&Result<M, DecodeError>> for DecodeResult {
    fn from(result: &Result<M, DecodeError>) -> Self {
        match result {
            Ok(_) => DecodeResult::Success,
            Err(DecodeError::ChecksumMismatch) => DecodeResult::ChecksumMismatch,
            Err(DecodeError::CodecFailure(_)) => DecodeResult::CodecFailure,
        }
    }
}

/// Escapes payload bytes while accumulating their CRC32.
struct PayloadWriter<'a, S: ?Sized> {
    out: Escaper<'a, S>,
    crc: Crc32Digest,
}

impl<S: ByteSink + ?Sized> ByteSink for PayloadWriter<'_, S> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        self.crc.update(byte);
        self.out.put(byte)
    }
}

/// Encode `message` as a complete frame into `sink`.
///
/// The payload is checksummed and escaped as the codec produces it, so the
/// sink can be a streaming destination (e.g. a DMA transmit buffer).
///
/// Returns the number of bytes written, which is always non-zero. On error
/// the sink may hold a partial frame and must not be transmitted.
pub fn encode_frame<M: Codec, S: ByteSink + ?Sized>(
    message: &M,
    sink: &mut S,
) -> Result<usize, EncodeError> {
    let mut out = Counting::new(sink);

    if !out.put(FRAMING_MARK) {
        return Err(EncodeError::SinkFull);
    }

    let mut payload = PayloadWriter {
        out: Escaper::new(&mut out),
        crc: Crc32Digest::new(),
    };
    message.encode(&mut payload)?;

    let PayloadWriter { out: mut escaper, crc } = payload;
    for byte in crc.finalize().to_be_bytes() {
        if !escaper.put(byte) {
            return Err(EncodeError::SinkFull);
        }
    }

    if !out.put(FRAMING_MARK) {
        return Err(EncodeError::SinkFull);
    }

    let written = out.written();
    trace!("encoded frame: {} bytes", written);
    Ok(written)
}

/// Encode `message` as a frame into a `heapless::Vec`.
pub fn encode_frame_to_vec<M: Codec, const N: usize>(message: &M) -> Result<Vec<u8, N>, EncodeError> {
    let mut vec = Vec::new();
    encode_frame(message, &mut vec)?;
    Ok(vec)
}

/// Strip any leading and trailing delimiters.
fn strip_marks(frame: &[u8]) -> &[u8] {
    let start = frame
        .iter()
        .position(|&b| b != FRAMING_MARK)
        .unwrap_or(frame.len());
    let end = frame
        .iter()
        .rposition(|&b| b != FRAMING_MARK)
        .map_or(start, |i| i + 1);
    &frame[start..end]
}

/// Decode a frame into a message.
///
/// `frame` is the escaped frame body as delivered by the frame detector;
/// surrounding delimiters are accepted and ignored. The checksum is verified
/// before the codec sees the payload. Nothing is allocated beyond a fixed
/// working buffer.
pub fn decode_frame<M: Codec>(frame: &[u8]) -> Result<M, DecodeError> {
    let body = strip_marks(frame);

    let mut raw: Vec<u8, DECODE_BUFFER_SIZE> = Vec::new();
    // A bit error on the wire can break an escape sequence just as easily as
    // it can change a payload byte; both are the same corrupted frame.
    unescape(body, &mut raw).map_err(|e| {
        debug!("frame unescape failed: {}", e);
        DecodeError::ChecksumMismatch
    })?;

    if !verify_trailer(&raw) {
        return Err(DecodeError::ChecksumMismatch);
    }

    let payload = &raw[..raw.len() - CRC_LEN];
    M::decode(payload).map_err(|e| {
        debug!("checksum ok, payload rejected: {}", e);
        DecodeError::CodecFailure(e)
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::crc::crc32;
    use crate::escape::FRAMING_ESCAPE;
    use crate::messages::{ControllerStatus, GuiStatus, SensorReadings, VentMode, VentParams};
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use std::vec::Vec as StdVec;

    fn gui_status() -> GuiStatus {
        GuiStatus {
            uptime_ms: 42_000,
            desired_params: VentParams {
                mode: VentMode::PressureControl,
                peep_cm_h2o: 5,
                pip_cm_h2o: 15,
                breaths_per_min: 12,
                inspiratory_expiratory_ratio: 0.5,
                fio2: 0.3,
            },
            acked_alarms: 0,
        }
    }

    /// Byte payload carrying reserved values on purpose.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Raw([u8; 4]);

    #[test]
    fn test_frame_roundtrip() {
        let frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&gui_status()).unwrap();
        assert_eq!(frame[0], FRAMING_MARK);
        assert_eq!(frame[frame.len() - 1], FRAMING_MARK);

        let decoded: GuiStatus = decode_frame(&frame).unwrap();
        assert_eq!(decoded, gui_status());
    }

    #[test]
    fn test_frame_layout() {
        let raw = Raw([0x01, 0x02, 0x03, 0x04]);
        let frame: Vec<u8, 32> = encode_frame_to_vec(&raw).unwrap();

        let crc = crc32(&[0x01, 0x02, 0x03, 0x04]).to_be_bytes();
        let mut expected = StdVec::from([FRAMING_MARK, 0x01, 0x02, 0x03, 0x04]);
        for b in crc {
            if b == FRAMING_MARK || b == FRAMING_ESCAPE {
                expected.push(FRAMING_ESCAPE);
                expected.push(b ^ 0x20);
            } else {
                expected.push(b);
            }
        }
        expected.push(FRAMING_MARK);
        assert_eq!(frame.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_reserved_bytes_are_escaped() {
        let raw = Raw([FRAMING_MARK, FRAMING_ESCAPE, FRAMING_MARK, 0x00]);
        let frame: Vec<u8, 32> = encode_frame_to_vec(&raw).unwrap();

        // Only the two delimiters may be marks.
        let marks = frame.iter().filter(|&&b| b == FRAMING_MARK).count();
        assert_eq!(marks, 2);
        assert_eq!(&frame[1..7], &[0x27, 0xC2, 0x27, 0x07, 0x27, 0xC2]);

        assert_eq!(decode_frame::<Raw>(&frame).unwrap(), raw);
    }

    #[test]
    fn test_decode_without_marks() {
        let frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&gui_status()).unwrap();
        let body = &frame[1..frame.len() - 1];
        assert_eq!(decode_frame::<GuiStatus>(body).unwrap(), gui_status());
    }

    #[test]
    fn test_encode_sink_too_small() {
        let mut sink: Vec<u8, 8> = Vec::new();
        assert_eq!(
            encode_frame(&gui_status(), &mut sink),
            Err(EncodeError::SinkFull)
        );

        let mut empty: Vec<u8, 0> = Vec::new();
        assert_eq!(
            encode_frame(&gui_status(), &mut empty),
            Err(EncodeError::SinkFull)
        );
    }

    #[test]
    fn test_encode_returns_length() {
        let mut sink: Vec<u8, TX_FRAME_LENGTH_MAX> = Vec::new();
        let status = ControllerStatus {
            sensor_readings: SensorReadings {
                breath_id: 7,
                ..SensorReadings::default()
            },
            ..ControllerStatus::default()
        };
        let len = encode_frame(&status, &mut sink).unwrap();
        assert!(len > 0);
        assert_eq!(len, sink.len());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&gui_status()).unwrap();
        // Flip a payload bit that does not create a reserved byte.
        frame[2] ^= 0x01;
        if frame[2] == FRAMING_MARK || frame[2] == FRAMING_ESCAPE {
            frame[2] ^= 0x03;
        }
        let result = decode_frame::<GuiStatus>(&frame);
        assert_eq!(result, Err(DecodeError::ChecksumMismatch));
        assert_eq!(DecodeResult::from(&result), DecodeResult::ChecksumMismatch);
    }

    #[test]
    fn test_codec_failure_with_valid_checksum() {
        // Valid checksum over bytes that are not a GuiStatus (bad enum tag).
        let payload = [0x01, 0x09];
        let mut body: StdVec<u8> = payload.to_vec();
        body.extend_from_slice(&crc32(&payload).to_be_bytes());
        let mut frame: Vec<u8, 32> = Vec::new();
        frame.push(FRAMING_MARK).unwrap();
        for b in body {
            assert!(crate::escape::escape_byte(b, &mut frame));
        }
        frame.push(FRAMING_MARK).unwrap();

        let result = decode_frame::<GuiStatus>(&frame);
        assert!(matches!(result, Err(DecodeError::CodecFailure(_))));
        assert_eq!(DecodeResult::from(&result), DecodeResult::CodecFailure);
    }

    #[test]
    fn test_empty_and_short_frames() {
        assert_eq!(
            decode_frame::<GuiStatus>(&[FRAMING_MARK, FRAMING_MARK]),
            Err(DecodeError::ChecksumMismatch)
        );
        assert_eq!(
            decode_frame::<GuiStatus>(&[]),
            Err(DecodeError::ChecksumMismatch)
        );
        assert_eq!(
            decode_frame::<GuiStatus>(&[1, 2, 3, 4]),
            Err(DecodeError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_broken_escape_is_checksum_mismatch() {
        let dangling = decode_frame::<GuiStatus>(&[FRAMING_MARK, 0x01, FRAMING_ESCAPE, FRAMING_MARK]);
        assert_eq!(dangling, Err(DecodeError::ChecksumMismatch));
        assert_eq!(DecodeResult::from(&dangling), DecodeResult::ChecksumMismatch);

        let invalid = decode_frame::<GuiStatus>(&[0x01, FRAMING_ESCAPE, 0xC3, 0x02, 0x03, 0x04]);
        assert_eq!(invalid, Err(DecodeError::ChecksumMismatch));

        let inner_mark = decode_frame::<GuiStatus>(&[0x01, 0x02, FRAMING_MARK, 0x03, 0x04, 0x05]);
        assert_eq!(inner_mark, Err(DecodeError::ChecksumMismatch));
    }

    #[test]
    fn test_escaped_mark_damaged_on_wire() {
        // acked_alarms = 0xE2 puts an escaped mark (0x27 0xC2) on the wire.
        let status = GuiStatus {
            uptime_ms: 0x26,
            acked_alarms: 0xE2,
            ..gui_status()
        };
        let mut frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&status).unwrap();
        let at = frame
            .windows(2)
            .position(|w| w == [FRAMING_ESCAPE, 0xC2])
            .unwrap();
        frame[at + 1] ^= 0x01;
        assert_eq!(
            decode_frame::<GuiStatus>(&frame),
            Err(DecodeError::ChecksumMismatch)
        );

        // 0x26 -> 0x27 turns a plain byte into a bare escape.
        let mut frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&status).unwrap();
        assert_eq!(frame[1], 0x26);
        frame[1] ^= 0x01;
        assert_eq!(
            decode_frame::<GuiStatus>(&frame),
            Err(DecodeError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_oversize_frame_rejected() {
        let frame = [0x55u8; DECODE_BUFFER_SIZE + 1];
        assert_eq!(
            decode_frame::<GuiStatus>(&frame),
            Err(DecodeError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_frame_length_bounds() {
        assert_eq!(frame_length_max(0), 10);
        assert!(RX_FRAME_LENGTH_MAX >= frame_length_max(GUI_STATUS_MAX_SIZE));
        assert!(DECODE_BUFFER_SIZE >= TX_FRAME_LENGTH_MAX);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_any_bytes(bytes in any::<[u8; 4]>()) {
            let raw = Raw(bytes);
            let frame: Vec<u8, 32> = encode_frame_to_vec(&raw).unwrap();
            prop_assert_eq!(decode_frame::<Raw>(&frame).unwrap(), raw);
        }

        #[test]
        fn prop_single_bit_flip_rejected(
            uptime in any::<u32>(),
            peep in 0u32..40,
            bit in any::<proptest::sample::Index>(),
        ) {
            let mut status = gui_status();
            status.uptime_ms = uptime;
            status.desired_params.peep_cm_h2o = peep;
            let frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&status).unwrap();

            // Flip one bit of the unescaped payload and re-frame it with the
            // original checksum.
            let mut raw: Vec<u8, RX_FRAME_LENGTH_MAX> = Vec::new();
            unescape(strip_marks(&frame), &mut raw).unwrap();
            let payload_bits = (raw.len() - CRC_LEN) * 8;
            let bit = bit.index(payload_bits);
            raw[bit / 8] ^= 1 << (bit % 8);

            let mut corrupted: Vec<u8, RX_FRAME_LENGTH_MAX> = Vec::new();
            corrupted.push(FRAMING_MARK).unwrap();
            for &b in raw.iter() {
                prop_assert!(crate::escape::escape_byte(b, &mut corrupted));
            }
            corrupted.push(FRAMING_MARK).unwrap();

            prop_assert_eq!(
                decode_frame::<GuiStatus>(&corrupted),
                Err(DecodeError::ChecksumMismatch)
            );
        }

        #[test]
        fn prop_single_wire_bit_flip_rejected(
            uptime in any::<u32>(),
            acked in any::<u32>(),
            bit in any::<proptest::sample::Index>(),
        ) {
            let mut status = gui_status();
            status.uptime_ms = uptime;
            status.acked_alarms = acked;
            let mut frame: Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&status).unwrap();

            // Any bit between the delimiters, escape bytes included.
            let body_bits = (frame.len() - 2) * 8;
            let bit = bit.index(body_bits);
            frame[1 + bit / 8] ^= 1 << (bit % 8);

            prop_assert_eq!(
                decode_frame::<GuiStatus>(&frame),
                Err(DecodeError::ChecksumMismatch)
            );
        }
    }
}
