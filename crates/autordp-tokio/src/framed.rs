use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};

use autordp_pdu::{Action, PduHint};

/// A byte stream with an internal buffer, reading whole PDUs at a time.
pub struct Framed<S> {
    stream: S,
    buf: BytesMut,
}

impl<S> Framed<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }

    /// Wraps a stream along bytes already read from it, e.g. after handing a
    /// stream over between framing layers.
    pub fn new_with_leftover(stream: S, leftover: BytesMut) -> Self {
        Self { stream, buf: leftover }
    }

    pub fn into_inner(self) -> (S, BytesMut) {
        (self.stream, self.buf)
    }

    /// Returns the inner stream, asserting no buffered bytes are lost.
    pub fn into_inner_no_leftover(self) -> S {
        let (stream, leftover) = self.into_inner();
        debug_assert_eq!(leftover.len(), 0, "unexpected leftover");
        stream
    }

    pub fn get_inner_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// The buffered bytes received so far.
    pub fn peek(&self) -> &[u8] {
        &self.buf
    }
}

impl<S> Framed<S>
where
    S: Unpin + AsyncRead,
{
    /// Reads from the stream once and fills the internal buffer.
    pub async fn read(&mut self) -> io::Result<usize> {
        self.stream.read_buf(&mut self.buf).await
    }

    pub async fn read_exact(&mut self, length: usize) -> io::Result<Bytes> {
        loop {
            if self.buf.len() >= length {
                return Ok(self.buf.split_to(length).freeze());
            }

            self.buf.reserve(length - self.buf.len());

            let len = self.read().await?;

            if len == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough bytes"));
            }
        }
    }

    /// Reads the next whole PDU, classified as fast-path or slow-path.
    pub async fn read_pdu(&mut self) -> io::Result<(Action, Bytes)> {
        loop {
            match autordp_pdu::find_size(self.peek()) {
                Ok(Some(pdu_info)) => {
                    let frame = self.read_exact(pdu_info.length).await?;

                    return Ok((pdu_info.action, frame));
                }
                Ok(None) => {
                    let len = self.read().await?;

                    if len == 0 {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough bytes"));
                    }
                }
                Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            };
        }
    }

    /// Reads the next unit as sized by the given hint.
    pub async fn read_by_hint(&mut self, hint: &dyn PduHint) -> io::Result<Bytes> {
        loop {
            match hint
                .find_size(self.peek())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            {
                Some(length) => {
                    return self.read_exact(length).await;
                }
                None => {
                    let len = self.read().await?;

                    if len == 0 {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough bytes"));
                    }
                }
            };
        }
    }
}

impl<S> Framed<S>
where
    S: Unpin + AsyncWrite,
{
    /// Writes an entire buffer into the stream and flushes it.
    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_pdus_at_boundaries() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut framed = Framed::new(client);

        // A slow-path frame followed by a fast-path frame, written in one go.
        let mut bytes = vec![0x03, 0x00, 0x00, 0x06, 0xAA, 0xBB];
        bytes.extend_from_slice(&[0x00, 0x04, 0xCC, 0xDD]);
        tokio::io::AsyncWriteExt::write_all(&mut server, &bytes).await.unwrap();

        let (action, frame) = framed.read_pdu().await.unwrap();
        assert_eq!(action, Action::X224);
        assert_eq!(&frame[..], &[0x03, 0x00, 0x00, 0x06, 0xAA, 0xBB]);

        let (action, frame) = framed.read_pdu().await.unwrap();
        assert_eq!(action, Action::FastPath);
        assert_eq!(&frame[..], &[0x00, 0x04, 0xCC, 0xDD]);
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_error() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut framed = Framed::new(client);

        tokio::io::AsyncWriteExt::write_all(&mut server, &[0x03, 0x00, 0x00, 0x10, 0x01])
            .await
            .unwrap();
        drop(server);

        let error = framed.read_pdu().await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }
}
