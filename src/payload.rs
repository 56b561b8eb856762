//! Message payload model
//!
//! Sprint S-5: Typed payload variants for bus transport.
//! Publishers hand the bus raw bytes, text, or a JSON document; consumers
//! get the same shape back without guessing at runtime types.

use serde::Serialize;

/// A message payload in one of the three supported shapes
///
/// Encoding priority on publish: bytes pass through unchanged, text is
/// sent as its UTF-8 bytes verbatim, JSON documents are serialized with
/// serde_json.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw byte sequence, transmitted as-is
    Bytes(Vec<u8>),
    /// UTF-8 text, transmitted verbatim
    Text(String),
    /// Structured document, serialized to JSON on the wire
    Json(serde_json::Value),
}

impl Payload {
    /// Build a JSON payload from any serializable value
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Encode the payload to wire bytes
    ///
    /// Only the JSON variant can fail; bytes and text are infallible
    /// pass-throughs.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Json(value) => serde_json::to_vec(value),
        }
    }

    /// Decode wire bytes into a payload
    ///
    /// Tries JSON first, falls back to UTF-8 text, then raw bytes.
    /// Decoding never fails a delivery; a malformed producer payload
    /// reaches the handler as text or bytes instead.
    pub fn decode(bytes: &[u8]) -> Self {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return Self::Json(value);
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::Text(text.to_string()),
            Err(_) => Self::Bytes(bytes.to_vec()),
        }
    }

    /// Borrow the payload as text, when it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the payload as a JSON document, when it is one
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bytes_pass_through_unchanged() {
        let raw = vec![0xde, 0xad, 0xbe, 0xef];
        let payload = Payload::from(raw.clone());
        assert_eq!(payload.encode().unwrap(), raw);
    }

    #[test]
    fn text_encodes_to_utf8_verbatim() {
        let payload = Payload::from("guild joined");
        assert_eq!(payload.encode().unwrap(), b"guild joined".to_vec());
    }

    #[test]
    fn json_round_trips_to_equivalent_value() {
        let value = json!({"guild_id": "123", "member_count": 42});
        let payload = Payload::from(value.clone());

        let bytes = payload.encode().unwrap();
        match Payload::decode(&bytes) {
            Payload::Json(decoded) => assert_eq!(decoded, value),
            other => panic!("expected JSON payload, got {other:?}"),
        }
    }

    #[test]
    fn decode_falls_back_to_text_for_non_json() {
        // Not valid JSON, but valid UTF-8
        match Payload::decode(b"plain text message") {
            Payload::Text(text) => assert_eq!(text, "plain text message"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn decode_falls_back_to_bytes_for_invalid_utf8() {
        let raw = [0xff, 0xfe, 0x00, 0x01];
        match Payload::decode(&raw) {
            Payload::Bytes(bytes) => assert_eq!(bytes, raw),
            other => panic!("expected byte payload, got {other:?}"),
        }
    }

    #[test]
    fn json_helper_serializes_structs() {
        #[derive(Serialize)]
        struct Order {
            id: u64,
            total: u64,
        }

        let payload = Payload::json(&Order { id: 7, total: 1200 }).unwrap();
        assert_eq!(payload.as_json().unwrap()["id"], 7);
    }
}
