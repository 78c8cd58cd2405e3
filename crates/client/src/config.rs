use mirror_protocol::DataCodec;

/// Default for both frame and field length limits.
pub const DEFAULT_MAX_LEN: u32 = 16 << 20;

/// Login details handed to the account entity when the server creates it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Clone, Debug, derivative::Derivative, derive_builder::Builder)]
#[derivative(Default)]
#[builder(default)]
pub struct SessionConfig {
    /// Longest frame we will buffer.
    ///
    /// A longer length prefix means the stream is corrupt or hostile, and the connection is dropped.  `None` disables
    /// the check.
    #[derivative(Default(value = "Some(DEFAULT_MAX_LEN)"))]
    pub max_frame_len: Option<u32>,

    /// Longest var-bytes field inside a frame.  Violations only drop the frame.
    #[derivative(Default(value = "Some(DEFAULT_MAX_LEN)"))]
    pub max_var_len: Option<u32>,

    pub data_codec: DataCodec,

    /// Capacity the parser and framer keep once drained.
    #[derivative(Default(value = "4096"))]
    pub buffer_cap: usize,

    pub credentials: Option<Credentials>,
}
