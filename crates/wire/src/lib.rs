//! Primitive readers and writers for the game server wire format.
//!
//! Everything multi-byte is little-endian: integers, floats, and the `u32` length prefixes of var-length fields.  A
//! [Reader] never reads past the end of its buffer and never moves its cursor when a read fails, so a failed read can
//! be reported without leaving the caller half-way through a field.
mod error;
mod ids;
mod msg_type;
mod reader;
mod writer;

pub use error::*;
pub use ids::*;
pub use msg_type::*;
pub use reader::*;
pub use writer::*;
