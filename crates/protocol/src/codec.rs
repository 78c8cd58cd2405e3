//! Codecs for the structured values nested inside binary messages.
//!
//! The server picks one packer for the whole deployment; MessagePack is the default and JSON is the alternative.  Both
//! decode into [serde_json::Value] so that the rest of the client never has to care which one is in use.
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DataCodecError {
    #[error(transparent)]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error(transparent)]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[enum_dispatch::enum_dispatch(DataCodec)]
pub trait DataCodecTrait {
    fn decode(&self, bytes: &[u8]) -> Result<Value, DataCodecError>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, DataCodecError>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MsgPackCodec;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct JsonCodec;

impl DataCodecTrait for MsgPackCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, DataCodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, DataCodecError> {
        Ok(rmp_serde::to_vec(value)?)
    }
}

impl DataCodecTrait for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, DataCodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, DataCodecError> {
        Ok(serde_json::to_vec(value)?)
    }
}

#[enum_dispatch::enum_dispatch]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataCodec {
    MsgPack(MsgPackCodec),
    Json(JsonCodec),
}

impl Default for DataCodec {
    fn default() -> Self {
        DataCodec::MsgPack(MsgPackCodec)
    }
}
