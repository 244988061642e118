//! Line-delimited JSON framing over an async duplex byte stream.
//!
//! The read side pulls complete `\n`-terminated lines and parses each as a
//! [`Envelope`]; the write side serializes an envelope as compact single-line
//! UTF-8 JSON and flushes. Oversized lines are discarded and reading resumes
//! at the next newline rather than losing synchronization with the stream,
//! the same discard-and-resync behavior the teacher's bounded line reader
//! applies to oversized lines.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FramingError;
use crate::wire::Envelope;

const READ_CHUNK_BYTES: usize = 8192;

/// Reads framed JSON values from an async byte stream, one per line.
pub struct FrameReader<R> {
    reader: R,
    max_line_bytes: usize,
    chunk: [u8; READ_CHUNK_BYTES],
    carry: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self { reader, max_line_bytes, chunk: [0u8; READ_CHUNK_BYTES], carry: Vec::new() }
    }

    /// Reads the next line from the stream, enforcing `max_line_bytes`.
    ///
    /// Returns `Ok(None)` on clean EOF with no trailing partial line.
    pub async fn next_line(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        loop {
            if let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.carry.drain(..=pos).collect();
                line.pop(); // drop the '\n'
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.len() > self.max_line_bytes {
                    return Err(FramingError::LineTooLong { limit: self.max_line_bytes });
                }
                return Ok(Some(line));
            }

            if self.carry.len() > self.max_line_bytes {
                // No newline yet but already oversized: discard and resync at
                // the next '\n' rather than buffering further.
                self.discard_until_newline().await?;
                return Err(FramingError::LineTooLong { limit: self.max_line_bytes });
            }

            let n = self.reader.read(&mut self.chunk).await.map_err(FramingError::Io)?;
            if n == 0 {
                if self.carry.is_empty() {
                    return Ok(None);
                }
                // Partial trailing line on EOF is discarded silently.
                self.carry.clear();
                return Ok(None);
            }
            self.carry.extend_from_slice(&self.chunk[..n]);
        }
    }

    async fn discard_until_newline(&mut self) -> Result<(), FramingError> {
        loop {
            if let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
                self.carry.drain(..=pos);
                return Ok(());
            }
            self.carry.clear();
            let n = self.reader.read(&mut self.chunk).await.map_err(FramingError::Io)?;
            if n == 0 {
                return Ok(());
            }
            self.carry.extend_from_slice(&self.chunk[..n]);
        }
    }

    /// Reads and parses the next envelope, skipping past framing errors on
    /// malformed JSON by surfacing them to the caller (who decides whether to
    /// close the connection or resynchronize, per the error handling design).
    pub async fn next_envelope(&mut self) -> Result<Option<Envelope>, FramingError> {
        let Some(bytes) = self.next_line().await? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)?;
        let envelope = serde_json::from_str(&text).map_err(FramingError::NotJson)?;
        Ok(Some(envelope))
    }
}

/// Writes framed JSON values to an async byte stream, one per line, flushing
/// after every write so the peer observes each envelope promptly.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_envelope(&mut self, envelope: &Envelope) -> Result<(), FramingError> {
        let mut line = serde_json::to_vec(envelope).map_err(FramingError::NotJson)?;
        line.push(b'\n');
        self.writer.write_all(&line).await.map_err(FramingError::Io)?;
        self.writer.flush().await.map_err(FramingError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_lines_split_across_chunks() {
        let (mut tx, rx) = duplex(4);
        let mut reader = FrameReader::new(rx, 1024);
        let write_task = tokio::spawn(async move {
            tx.write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"x\"}\n").await.unwrap();
        });
        let envelope = reader.next_envelope().await.unwrap().unwrap();
        assert_eq!(envelope.method.as_deref(), Some("x"));
        write_task.await.unwrap();
    }

    #[tokio::test]
    async fn discards_oversized_line_and_resyncs() {
        let (mut tx, rx) = duplex(64);
        let mut reader = FrameReader::new(rx, 8);
        tokio::spawn(async move {
            tx.write_all(b"this line is definitely too long\n").await.unwrap();
            tx.write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"n\"}\n").await.unwrap();
        });
        let err = reader.next_line().await.unwrap_err();
        assert!(matches!(err, FramingError::LineTooLong { .. }));
        let envelope = reader.next_envelope().await.unwrap().unwrap();
        assert_eq!(envelope.method.as_deref(), Some("n"));
    }

    #[tokio::test]
    async fn strips_trailing_carriage_return() {
        let (mut tx, rx) = duplex(64);
        let mut reader = FrameReader::new(rx, 1024);
        tokio::spawn(async move {
            tx.write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"n\"}\r\n").await.unwrap();
        });
        let line = reader.next_line().await.unwrap().unwrap();
        assert!(!line.ends_with(b"\r"));
    }

    #[tokio::test]
    async fn writer_emits_newline_terminated_compact_json() {
        let (tx, mut rx) = duplex(256);
        let mut writer = FrameWriter::new(tx);
        let envelope = Envelope::notification("n", serde_json::json!({"a": 1}));
        writer.write_envelope(&envelope).await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = rx.read(&mut buf).await.unwrap();
        let text = String::from_utf8(buf[..n].to_vec()).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);
    }
}
