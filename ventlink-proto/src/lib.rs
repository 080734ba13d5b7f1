//! Wire protocol for the ventilator controller link.
//!
//! This crate provides everything needed to put application messages on the
//! controller/GUI serial link and take them off again:
//!
//! - **Checksum**: [`crc32`], [`crc32_step`], [`verify_trailer`], [`Crc32Digest`]
//! - **Byte stuffing**: [`escape`] keeps the frame delimiter unambiguous
//! - **Framing**: [`encode_frame`] and [`decode_frame`]
//! - **Messages**: [`ControllerStatus`], [`GuiStatus`] and the [`Codec`] trait
//! - **I/O seam**: [`ByteSink`] and [`ByteSource`]
//!
//! # Frame Format
//!
//! ```text
//! 0xE2 <escaped postcard payload> <escaped CRC32, big-endian> 0xE2
//! ```
//!
//! # Example
//!
//! ```
//! use ventlink_proto::{decode_frame, encode_frame_to_vec, GuiStatus, RX_FRAME_LENGTH_MAX};
//!
//! let status = GuiStatus::default();
//! let frame: heapless::Vec<u8, RX_FRAME_LENGTH_MAX> = encode_frame_to_vec(&status).unwrap();
//! let decoded: GuiStatus = decode_frame(&frame).unwrap();
//! assert_eq!(decoded, status);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod codec;
pub mod crc;
pub mod escape;
pub mod framing;
pub mod io;
pub mod messages;

// Re-export types at crate root for convenience
pub use codec::{Codec, CodecError};
pub use crc::{crc32, crc32_step, verify_trailer, Crc32Digest, CRC32_POLYNOMIAL, CRC_LEN};
pub use escape::{EscapeError, FRAMING_ESCAPE, FRAMING_MARK};
pub use framing::{
    decode_frame, encode_frame, encode_frame_to_vec, frame_length_max, DecodeError, DecodeResult,
    EncodeError, RX_FRAME_LENGTH_MAX, TX_FRAME_LENGTH_MAX,
};
pub use io::{ByteSink, ByteSource};
pub use messages::{
    ControllerStatus, GuiStatus, SensorReadings, VentMode, VentParams, CONTROLLER_STATUS_MAX_SIZE,
    GUI_STATUS_MAX_SIZE,
};
