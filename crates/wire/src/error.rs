#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum WireError {
    #[error("truncated data: needed {needed} bytes but only {remaining} remain")]
    TruncatedData { needed: usize, remaining: usize },

    /// A length prefix claimed more data than we are willing to accept.
    #[error("malformed length: {length} exceeds the limit of {limit}")]
    MalformedLength { length: u64, limit: u64 },

    #[error("identifiers are exactly {expected} bytes, got {got}")]
    InvalidIdLength { expected: usize, got: usize },
}

pub type Result<T, E = WireError> = std::result::Result<T, E>;
