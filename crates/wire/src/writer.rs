use bytes::BufMut;

use crate::{ClientId, EntityId, Result, WireError};

/// Builds payloads in the wire format understood by [crate::Reader].
#[derive(Clone, Debug, Default)]
pub struct Writer {
    buffer: Vec<u8>,
}

fn var_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| WireError::MalformedLength {
        length: len as u64,
        limit: u32::MAX as u64,
    })
}

impl Writer {
    pub fn new() -> Writer {
        Default::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buffer.put_u8(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buffer.put_u16_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buffer.put_u32_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buffer.put_u64_le(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buffer.put_f32_le(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buffer.put_u8(v as u8);
    }

    pub fn put_fixed_bytes(&mut self, v: &[u8]) {
        self.buffer.put_slice(v);
    }

    pub fn put_var_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.put_u32(var_len(v.len())?);
        self.buffer.put_slice(v);
        Ok(())
    }

    pub fn put_var_str(&mut self, v: &str) -> Result<()> {
        self.put_var_bytes(v.as_bytes())
    }

    pub fn put_entity_id(&mut self, id: &EntityId) {
        self.buffer.put_slice(id.as_bytes());
    }

    pub fn put_client_id(&mut self, id: &ClientId) {
        self.buffer.put_slice(id.as_bytes());
    }

    /// Write a `u16` count followed by each already-encoded argument as var-bytes.
    pub fn put_args<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<()> {
        let count = u16::try_from(args.len()).map_err(|_| WireError::MalformedLength {
            length: args.len() as u64,
            limit: u16::MAX as u64,
        })?;
        self.put_u16(count);
        for a in args {
            self.put_var_bytes(a.as_ref())?;
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
