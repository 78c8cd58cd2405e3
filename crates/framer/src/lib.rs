//! This crate frames messages and parses framed messages.  To use, encode with a [Framer] and decode with a [Parser].
//!
//! On the wire a frame is a little-endian `u32` payload length followed by exactly that many payload bytes:
//!
//! ```text
//! [u32 payload_len][payload_len bytes]
//! ```
//!
//! This crate doesn't understand what the payloads mean, just where one ends and the next begins.  Framing never
//! depends on payload contents, so a payload which fails to decode further up the stack can't desynchronize the
//! stream.
mod framer;
mod parser;

pub use framer::*;
pub use parser::*;

/// Size of the length prefix in front of every frame.
pub const LENGTH_PREFIX_SIZE: usize = 4;
