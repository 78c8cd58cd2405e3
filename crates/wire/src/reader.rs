use bytes::Buf;

use crate::{ClientId, EntityId, Result, WireError, CLIENT_ID_LENGTH, ENTITY_ID_LENGTH};

/// A cursor over an immutable byte buffer.
///
/// Readers are `Copy`: a reader is just the buffer and a position, so it is cheap to probe ahead on a copy and commit
/// by assigning back.  Every read either succeeds and advances, or fails with the cursor where it was.
#[derive(Copy, Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    max_var_len: Option<u32>,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader {
            buf,
            pos: 0,
            max_var_len: None,
        }
    }

    /// Reject var-length fields whose length prefix is larger than `limit`, before looking at the data.
    pub fn with_max_var_len(mut self, limit: Option<u32>) -> Reader<'a> {
        self.max_var_len = limit;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(WireError::TruncatedData { needed, remaining });
        }

        let out = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.take(8)?.get_u64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.take(4)?.get_f32_le())
    }

    /// Any nonzero byte is true.  Older servers wrote values other than 1, so we can't be stricter than that.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_fixed_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Read a `u32` length, then that many bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let mut probe = *self;
        let len = probe.read_u32()?;
        if let Some(limit) = self.max_var_len {
            if len > limit {
                return Err(WireError::MalformedLength {
                    length: len as u64,
                    limit: limit as u64,
                });
            }
        }

        let out = probe.take(len as usize)?;
        *self = probe;
        Ok(out)
    }

    /// Read var-bytes as a string.  Invalid UTF-8 is replaced rather than rejected.
    pub fn read_var_string(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_var_bytes()?).into_owned())
    }

    pub fn read_entity_id(&mut self) -> Result<EntityId> {
        EntityId::try_from(self.take(ENTITY_ID_LENGTH)?)
    }

    pub fn read_client_id(&mut self) -> Result<ClientId> {
        ClientId::try_from(self.take(CLIENT_ID_LENGTH)?)
    }

    /// Read a `u16` count of arguments, each of which is var-bytes.  The arguments are left encoded.
    pub fn read_args(&mut self) -> Result<Vec<&'a [u8]>> {
        let mut probe = *self;
        let count = probe.read_u16()?;
        let mut args = Vec::with_capacity((count as usize).min(probe.remaining() / 4));
        for _ in 0..count {
            args.push(probe.read_var_bytes()?);
        }

        *self = probe;
        Ok(args)
    }
}
