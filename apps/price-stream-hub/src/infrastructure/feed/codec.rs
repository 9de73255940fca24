//! Feed Stream Codec
//!
//! JSON encode/decode for the upstream feed WebSocket protocol. Every frame
//! is a single JSON object with a `type` discriminator; see
//! [`super::messages`] for the frame shapes.

use super::messages::FeedMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid frame format.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the upstream feed stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into a [`FeedMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object or a known frame
    /// field fails to parse. Unknown `type` values decode to
    /// [`FeedMessage::Unknown`] and are not an error.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            // Char-based truncation; a byte slice could split a multi-byte
            // character and panic.
            let preview: String = trimmed.chars().take(50).collect();
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {preview}..."
            )));
        }

        Ok(serde_json::from_str(trimmed)?)
    }

    /// Encode a value to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::messages::ControlFrame;
    use super::*;

    #[test]
    fn decode_trade_frame() {
        let codec = JsonCodec::new();
        let json = r#"{"type":"trade","data":[{"s":"AAPL","p":187.25,"t":1700000000000}]}"#;

        let msg = codec.decode(json).unwrap();
        assert!(matches!(msg, FeedMessage::Trade { .. }));
    }

    #[test]
    fn decode_ping_with_surrounding_whitespace() {
        let codec = JsonCodec::new();
        let msg = codec.decode("  {\"type\":\"ping\"}\n").unwrap();
        assert_eq!(msg, FeedMessage::Ping);
    }

    #[test]
    fn decode_rejects_non_object() {
        let codec = JsonCodec::new();
        let err = codec.decode("not json at all").unwrap_err();
        assert!(matches!(err, CodecError::InvalidFormat(_)));
    }

    #[test]
    fn decode_rejects_long_multibyte_garbage() {
        let codec = JsonCodec::new();
        // 49 ASCII bytes followed by a two-byte character; the error preview
        // must not split it.
        let frame = format!("{}é and then some trailing noise", "a".repeat(49));

        let err = codec.decode(&frame).unwrap_err();
        assert!(matches!(err, CodecError::InvalidFormat(_)));
        assert!(err.to_string().contains('é'));
    }

    #[test]
    fn decode_rejects_malformed_trade_data() {
        let codec = JsonCodec::new();
        // A trade frame with a non-numeric price must fail, not decode to Unknown.
        let json = r#"{"type":"trade","data":[{"s":"AAPL","p":{},"t":0}]}"#;
        let err = codec.decode(json).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn encode_control_frame() {
        let codec = JsonCodec::new();
        let json = codec.encode(&ControlFrame::subscribe("SPY")).unwrap();
        assert!(json.contains(r#""type":"subscribe""#));
        assert!(json.contains("SPY"));
    }
}
