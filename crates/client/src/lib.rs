//! A client-side mirror of server entities.
//!
//! Bytes from the gate connection go into a [Session], which cuts them into frames, decodes each frame into a
//! message, and applies the message to an [EntityRegistry].  A [Presentation] hears about every change once it has
//! been applied.  Entity types with behavior of their own, such as logging in when the account entity appears, queue
//! messages back to the server through a [Transport].
mod attrs;
mod config;
mod entity;
mod presentation;
mod registry;
mod session;
mod transport;

pub use attrs::*;
pub use config::*;
pub use entity::*;
pub use presentation::*;
pub use registry::*;
pub use session::*;
pub use transport::*;

pub use mirror_protocol::{ClientId, EntityId, Vec3};
