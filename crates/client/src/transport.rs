use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::presentation::Presentation;
use crate::session::Session;

/// The outgoing half of a connection.  Receives whole batches of frames, already framed.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Collects everything sent, for tests and tools.
impl Transport for Vec<u8> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Hands batches to a writer task over a channel.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    sender: UnboundedSender<Vec<u8>>,
}

impl ChannelTransport {
    pub fn new(sender: UnboundedSender<Vec<u8>>) -> ChannelTransport {
        ChannelTransport { sender }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sender
            .send(bytes.to_vec())
            .map_err(|_| anyhow::anyhow!("Writer task has gone away"))
    }
}

/// Feed everything `reader` produces into `session`, in order, until the stream ends.
///
/// End of stream closes the session.  Any other way of stopping resets the session and returns the error.
pub async fn pump<R, T, P>(mut reader: R, session: &mut Session<T, P>) -> Result<()>
where
    R: AsyncRead + Unpin,
    T: Transport,
    P: Presentation,
{
    let mut buf = vec![0u8; session.config().buffer_cap.max(1)];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                session.on_error(&e);
                return Err(e.into());
            }
        };

        if n == 0 {
            session.on_close();
            return Ok(());
        }

        if let Err(e) = session.on_data(&buf[..n]) {
            session.on_error(&e);
            return Err(e);
        }
    }
}
