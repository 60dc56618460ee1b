//! Codec trait and implementations for turning events into text frames.
//!
//! The transport carries opaque text frames; a codec decides how an event
//! is represented inside one. Currently JSON only — the format deployed
//! clients speak — but the trait leaves room for alternatives without
//! touching the session or broadcast layers.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes events to text frames and decodes frames back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T)
    -> Result<String, ProtocolError>;

    /// Deserializes a text frame back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed,
    /// truncated, or carries an unknown event tag.
    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tertulia_protocol::{ChatEvent, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let event = ChatEvent::System { text: "alice joined".into() };
///
/// let frame = codec.encode(&event).unwrap();
/// let decoded: ChatEvent = codec.decode(&frame).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
