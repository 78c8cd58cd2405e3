use mirror_wire::WireError;

use crate::DataCodecError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    #[error("could not decode {field}: {source}")]
    DataCodec {
        field: &'static str,
        #[source]
        source: DataCodecError,
    },

    #[error("{field} should be {expected}")]
    UnexpectedData {
        field: &'static str,
        expected: &'static str,
    },
}

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

impl ProtocolError {
    /// True if the frame ended before a field did.
    ///
    /// Frames are complete by the time they get here, so this means the sender and receiver disagree about the layout.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ProtocolError::Wire(WireError::TruncatedData { .. }))
    }
}
