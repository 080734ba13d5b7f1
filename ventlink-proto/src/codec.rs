//! Application message codec.
//!
//! Framing treats message bodies as opaque: anything implementing [`Codec`]
//! can be sent. Every serde type gets an implementation through `postcard`,
//! serializing straight into a [`ByteSink`] so the encoder never needs an
//! intermediate payload buffer.

use postcard::ser_flavors::Flavor;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::io::ByteSink;

/// Errors from the message codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// The sink could not take the whole message.
    SinkFull,
    /// The message could not be serialized.
    Serialize,
    /// The bytes do not describe a valid message.
    Deserialize,
    /// A valid message was followed by extra bytes.
    TrailingBytes,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SinkFull => write!(f, "sink full"),
            Self::Serialize => write!(f, "serialization failed"),
            Self::Deserialize => write!(f, "deserialization failed"),
            Self::TrailingBytes => write!(f, "trailing bytes after message"),
        }
    }
}

impl From<postcard::Error> for CodecError {
    fn from(err: postcard::Error) -> Self {
        match err {
            postcard::Error::SerializeBufferFull => CodecError::SinkFull,
            postcard::Error::DeserializeUnexpectedEnd
            | postcard::Error::DeserializeBadVarint
            | postcard::Error::DeserializeBadBool
            | postcard::Error::DeserializeBadChar
            | postcard::Error::DeserializeBadUtf8
            | postcard::Error::DeserializeBadOption
            | postcard::Error::DeserializeBadEnum
            | postcard::Error::DeserializeBadEncoding => CodecError::Deserialize,
            _ => CodecError::Serialize,
        }
    }
}

/// Fixed-schema message that can be carried in a frame.
///
/// Implementations must be deterministic and must not allocate.
pub trait Codec: Sized {
    /// Serialize `self` into `out`, returning the number of bytes written.
    fn encode<S: ByteSink + ?Sized>(&self, out: &mut S) -> Result<usize, CodecError>;

    /// Deserialize a message occupying all of `bytes`.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

/// postcard flavor that streams every serialized byte into a [`ByteSink`].
struct SinkFlavor<'a, S: ?Sized> {
    out: &'a mut S,
    written: usize,
}

impl<S: ByteSink + ?Sized> Flavor for SinkFlavor<'_, S> {
    type Output = usize;

    #[inline]
    fn try_push(&mut self, data: u8) -> postcard::Result<()> {
        if self.out.put(data) {
            self.written += 1;
            Ok(())
        } else {
            Err(postcard::Error::SerializeBufferFull)
        }
    }

    fn finalize(self) -> postcard::Result<usize> {
        Ok(self.written)
    }
}

impl<T: Serialize + DeserializeOwned> Codec for T {
    fn encode<S: ByteSink + ?Sized>(&self, out: &mut S) -> Result<usize, CodecError> {
        let flavor = SinkFlavor { out, written: 0 };
        Ok(postcard::serialize_with_flavor(self, flavor)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (value, rest) = postcard::take_from_bytes::<T>(bytes)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes);
        }
        Ok(value)
    }
}
