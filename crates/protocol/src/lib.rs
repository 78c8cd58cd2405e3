//! Message-level protocol between the client and the gate.
//!
//! A frame from [mirror_framer](../mirror_framer/index.html) starts with a `u16` [MessageType] tag.  Gate-service
//! messages then carry a routing prefix meant for server-side fan-out, which we consume and throw away, and then the
//! fields of the message itself.  The [Dispatcher] turns a frame into a typed [ClientMessage] by looking the tag up in
//! a [DecoderTable]; what to do with the message is up to the caller.
//!
//! Structured values (entity client data, attribute paths and values, method arguments) are nested inside the binary
//! format as var-bytes encoded with a [DataCodec].
mod codec;
mod dispatcher;
mod error;
mod messages;
mod outgoing;

pub use codec::*;
pub use dispatcher::*;
pub use error::*;
pub use messages::*;
pub use outgoing::*;

pub use mirror_wire::{ClientId, EntityId, MessageType};
