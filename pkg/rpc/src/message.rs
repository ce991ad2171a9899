//! Length-prefixed message framing: `[compression-flag u8][len u32-be][payload]`.

use common::bytes::Bytes;
use common::errors::*;
use common::io::Readable;

/// Encodes a single message frame. `compressed` is always encoded as `0x00`
/// (identity): this implementation never produces compressed frames, but
/// `MessageReader` still accepts any compression-flag value other than zero
/// by surfacing it to the caller rather than silently decompressing.
pub fn encode_message(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.push(0u8);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// A single decoded frame: the raw compression flag as seen on the wire and
/// the payload bytes. A non-zero flag means the payload is compressed with
/// an algorithm this implementation does not interpret; callers that don't
/// support compression should reject such frames with `Status::unimplemented`.
pub struct Message {
    pub compressed: u8,
    pub payload: Bytes,
}

/// Streaming deframer over any `Readable` byte source (an `http::Body`, a
/// `TcpStream`, or anything else). Buffers arriving bytes, emits each
/// complete frame as soon as its declared length is satisfied, and retains
/// any partial suffix across calls.
pub struct MessageReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Readable> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Reads the next complete message, pulling more bytes from the
    /// underlying reader as needed. Returns `Ok(None)` once the underlying
    /// stream ends cleanly on a frame boundary (no partial bytes buffered).
    /// A stream that ends mid-frame is an `INTERNAL` error: the declared and
    /// actual lengths can never be reconciled.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(message) = self.try_take_message()? {
                return Ok(Some(message));
            }

            let mut chunk = [0u8; 4096];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }

                return Err(format_err!(
                    "Stream ended with {} leftover byte(s): incomplete message frame",
                    self.buf.len()
                ));
            }

            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Unwraps the reader, discarding any buffered partial frame. Used once
    /// a call's inbound messages are exhausted and only the underlying
    /// body's trailers are still needed.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn try_take_message(&mut self) -> Result<Option<Message>> {
        if self.buf.len() < 5 {
            return Ok(None);
        }

        let compressed = self.buf[0];
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;

        if self.buf.len() < 5 + len {
            return Ok(None);
        }

        let payload = Bytes::copy_from_slice(&self.buf[5..5 + len]);
        self.buf.drain(0..5 + len);

        Ok(Some(Message {
            compressed,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[async_std::test]
    async fn round_trips_a_single_message() {
        let frame = encode_message(b"hello");
        let mut reader = MessageReader::new(Cursor::new(frame));

        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.compressed, 0);
        assert_eq!(&msg.payload[..], b"hello");

        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[async_std::test]
    async fn splits_concatenated_messages() {
        let mut frame = encode_message(b"one");
        frame.extend_from_slice(&encode_message(b"two"));
        let mut reader = MessageReader::new(Cursor::new(frame));

        assert_eq!(
            &reader.read_message().await.unwrap().unwrap().payload[..],
            b"one"
        );
        assert_eq!(
            &reader.read_message().await.unwrap().unwrap().payload[..],
            b"two"
        );
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[async_std::test]
    async fn empty_stream_produces_no_messages() {
        let mut reader = MessageReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[async_std::test]
    async fn truncated_frame_is_an_error() {
        let mut frame = encode_message(b"hello");
        frame.truncate(frame.len() - 2);
        let mut reader = MessageReader::new(Cursor::new(frame));

        assert!(reader.read_message().await.is_err());
    }

    #[test]
    fn zero_length_payload_encodes_to_exactly_five_bytes() {
        assert_eq!(encode_message(b"").len(), 5);
    }
}
