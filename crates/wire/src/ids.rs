//! Fixed-width identifiers.
//!
//! The server generates both kinds of id as 16 printable characters, but on the wire they are just 16 raw bytes and we
//! never validate them.  Display goes through a lossy string conversion so that logs stay readable either way.
use std::str::FromStr;

use crate::WireError;

/// Length of an [EntityId] on the wire.
pub const ENTITY_ID_LENGTH: usize = 16;

/// Length of a [ClientId] on the wire.
pub const CLIENT_ID_LENGTH: usize = 16;

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $len:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
        pub struct $name([u8; $len]);

        impl $name {
            pub const fn new(bytes: [u8; $len]) -> $name {
                $name(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = WireError;

            fn try_from(bytes: &[u8]) -> Result<$name, WireError> {
                let raw: [u8; $len] = bytes.try_into().map_err(|_| WireError::InvalidIdLength {
                    expected: $len,
                    got: bytes.len(),
                })?;
                Ok($name(raw))
            }
        }

        impl FromStr for $name {
            type Err = WireError;

            fn from_str(s: &str) -> Result<$name, WireError> {
                $name::try_from(s.as_bytes())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", String::from_utf8_lossy(&self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({:?})", stringify!($name), String::from_utf8_lossy(&self.0))
            }
        }
    };
}

fixed_id!(
    /// Identifies one server-authoritative entity.
    EntityId,
    ENTITY_ID_LENGTH
);

fixed_id!(
    /// Routing token of a client connection.  Present in gate-service messages; the client consumes it but has no use
    /// for it beyond [crate::MessageType::SetClientClientId].
    ClientId,
    CLIENT_ID_LENGTH
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: EntityId = "WKqS0cF9Uq0AAAAB".parse().expect("Should parse");
        assert_eq!(id.to_string(), "WKqS0cF9Uq0AAAAB");
        assert_eq!(id.as_bytes(), b"WKqS0cF9Uq0AAAAB");
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            "short".parse::<ClientId>(),
            Err(WireError::InvalidIdLength {
                expected: 16,
                got: 5
            })
        );
    }

    #[test]
    fn test_non_utf8_displays() {
        let id = EntityId::new([0xff; 16]);
        assert_eq!(id.to_string().chars().count(), 16);
    }
}
