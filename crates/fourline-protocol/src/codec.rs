//! Codec trait and the default JSON implementation.
//!
//! The engine and server never call `serde_json` directly — they go
//! through [`Codec`], so the wire format can change (e.g. to a binary
//! codec) without touching routing code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts protocol values to and from raw bytes.
///
/// Implementations must be `Send + Sync + 'static` because one codec
/// instance is shared across every connection handler task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the bytes are malformed, truncated,
    /// or don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON codec via `serde_json`. Human-readable, inspectable in browser
/// dev tools, and what the reference web client speaks.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, Envelope};

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let env = Envelope::new(3, ClientMessage::Probe { sent_at: 99 });
        let bytes = codec.encode(&env).unwrap();
        let decoded: Envelope<ClientMessage> = codec.decode(&bytes).unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn test_json_codec_decode_rejects_garbage() {
        let codec = JsonCodec;
        let result: Result<Envelope<ClientMessage>, _> =
            codec.decode(b"\xff\xfe not json");
        assert!(result.is_err());
    }
}
