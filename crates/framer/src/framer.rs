use bytes::BufMut;

/// A framer writes frames to an internal buffer, then hands them out on request.
///
/// To use, call [Framer::add_frame] repeatedly, then [Framer::get_data], then [Framer::clear].  The general pattern
/// here is to build up the list of frames to send in a batch, then to read the data out and send them over the network
/// before repeating.
pub struct Framer {
    cap_limit: usize,
    buffer: Vec<u8>,
}

#[derive(Debug, derive_more::Display, thiserror::Error)]
#[non_exhaustive]
pub enum FramerError {
    /// The payload can't be described by a `u32` length.
    #[display(fmt = "payload of {} bytes is too long to frame", _0)]
    FrameTooLong(usize),
}

impl Framer {
    /// Create a framer.
    ///
    /// `cap_limit` is the maximum capacity of the internal buffer after clearing.  Used to make sure that one large
    /// batch doesn't pin a large allocation for the rest of the connection.
    pub fn new(cap_limit: usize) -> Framer {
        Framer {
            cap_limit,
            buffer: Vec::with_capacity(cap_limit),
        }
    }

    /// Clear the internal buffer to write a new batch of frames.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer.shrink_to(self.cap_limit);
    }

    pub fn add_frame(&mut self, payload: &[u8]) -> Result<(), FramerError> {
        let len = u32::try_from(payload.len()).map_err(|_| FramerError::FrameTooLong(payload.len()))?;
        self.buffer.put_u32_le(len);
        self.buffer.put_slice(payload);
        Ok(())
    }

    /// Read the data of all frames in the framer.
    pub fn get_data(&self) -> &[u8] {
        &self.buffer[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_little_endian() {
        let mut framer = Framer::new(64);
        framer.add_frame(&[9; 11]).expect("Should frame");
        framer.add_frame(&[]).expect("Should frame");
        let data = framer.get_data();
        assert_eq!(&data[..4], &[11, 0, 0, 0]);
        assert_eq!(&data[15..], &[0, 0, 0, 0]);

        framer.clear();
        assert!(framer.get_data().is_empty());
    }
}
