use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode signaling frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed signaling frame: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialize a signaling message into a JSON text frame.
pub fn encode<M: Serialize>(msg: &M) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

/// Parse a JSON text frame into a signaling message.
pub fn decode<M: DeserializeOwned>(text: &str) -> Result<M, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
