use bytes::{Buf, Bytes, BytesMut};
use log::*;

use crate::LENGTH_PREFIX_SIZE;

/// What the parser is waiting for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReceiveState {
    /// Fewer than [LENGTH_PREFIX_SIZE] bytes of the next frame have arrived.
    AwaitingLength,

    /// The length prefix has been consumed and we need this many payload bytes.
    AwaitingPayload(u32),
}

/// A parser parses frames out of a stream of arbitrarily split chunks.
///
/// To use, call [Parser::feed] with each chunk as it arrives and drain the returned iterator.  Alternatively, call
/// [Parser::push] and then [Parser::next_frame] in a loop until it returns `Ok(None)`.
///
/// The parser must be drained after every chunk: frames which are complete but not yet pulled out stay in the buffer
/// and come out first on the next call, but until then they count against nothing and are seen by no one.
///
/// Frames are cut off the front of the internal buffer without copying.  Once the buffer drains completely, its
/// capacity is trimmed back to `cap_limit` so that one large frame doesn't pin a large allocation forever.
pub struct Parser {
    length_limit: Option<u32>,
    cap_limit: usize,
    buffer: BytesMut,
    state: ReceiveState,
}

#[derive(Debug, derive_more::Display, thiserror::Error)]
#[non_exhaustive]
pub enum ParserError {
    /// A frame declared a length over the configured limit.
    ///
    /// The stream can't be trusted past this point; the parser resets itself.
    #[display(fmt = "malformed length: frame of {} bytes exceeds the limit of {}", length, limit)]
    MalformedLength { length: u32, limit: u32 },
}

/// Iterator over the frames completed by one [Parser::feed] call.
pub struct Frames<'a> {
    parser: &'a mut Parser,
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Bytes, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.parser.next_frame() {
            Ok(Some(f)) => Some(Ok(f)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl Parser {
    /// Create a parser.
    ///
    /// `length_limit` is an optional limit on the length of frames.  `cap_limit` is a limit on the size of the internal
    /// buffer when it's empty (but individual frames can be longer).
    pub fn new(length_limit: Option<u32>, cap_limit: usize) -> Parser {
        Parser {
            length_limit,
            cap_limit,
            buffer: BytesMut::with_capacity(cap_limit),
            state: ReceiveState::AwaitingLength,
        }
    }

    /// Append some bytes without extracting anything.
    pub fn push(&mut self, bytes: &mut impl Buf) {
        use bytes::BufMut;
        self.buffer.put(bytes);
    }

    /// Feed the parser with some bytes, returning every frame which is now complete.
    pub fn feed(&mut self, bytes: &mut impl Buf) -> Frames<'_> {
        self.push(bytes);
        Frames {
            parser: self,
            failed: false,
        }
    }

    /// Extract the next complete frame, if there is one.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, ParserError> {
        let length = match self.state {
            ReceiveState::AwaitingPayload(l) => l,
            ReceiveState::AwaitingLength => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let length = self.buffer.get_u32_le();
                if let Some(limit) = self.length_limit {
                    if length > limit {
                        self.reset();
                        return Err(ParserError::MalformedLength { length, limit });
                    }
                }

                self.state = ReceiveState::AwaitingPayload(length);
                length
            }
        };

        if (self.buffer.len() as u64) < length as u64 {
            trace!(
                "Waiting for {} more payload bytes",
                length as usize - self.buffer.len()
            );
            return Ok(None);
        }

        let frame = self.buffer.split_to(length as usize).freeze();
        self.state = ReceiveState::AwaitingLength;

        if self.buffer.is_empty() && self.buffer.capacity() > self.cap_limit {
            self.buffer = BytesMut::with_capacity(self.cap_limit);
        }

        Ok(Some(frame))
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// Drop everything buffered and go back to waiting for a length.
    pub fn reset(&mut self) {
        self.buffer = BytesMut::with_capacity(self.cap_limit);
        self.state = ReceiveState::AwaitingLength;
    }

    /// Get the number of bytes in this parser which haven't been handed out as part of a frame.
    ///
    /// Doesn't include a length prefix which has already been consumed.
    pub fn contained_bytes(&self) -> usize {
        self.buffer.len()
    }
}
