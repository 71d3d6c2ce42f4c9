//! Line-delimited JSON codec
//!
//! One JSON value per line in both directions. Blank lines are skipped.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::error::CodecError;

enum Line {
    Eof,
    Complete,
    TooLong(usize),
}

/// Decodes one JSON value per line
pub struct JsonReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_line_bytes: Option<usize>,
}

impl<R: AsyncBufRead + Unpin> JsonReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(1024),
            max_line_bytes: None,
        }
    }

    /// Reject (and skip) lines longer than `max` bytes
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = Some(max);
        self
    }

    /// Read the next value; `Ok(None)` at end of stream
    ///
    /// `Decode` and `LineTooLong` consume the offending line, so the next
    /// call continues with the line after it.
    pub async fn read(&mut self) -> Result<Option<Value>, CodecError> {
        loop {
            self.buf.clear();
            match self.read_line().await? {
                Line::Eof => return Ok(None),
                Line::TooLong(len) => {
                    return Err(CodecError::LineTooLong {
                        len,
                        max: self.max_line_bytes.unwrap_or(usize::MAX),
                    })
                }
                Line::Complete => {}
            }

            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_slice(line)?));
        }
    }

    /// Fill `buf` with the next line. Past the limit the rest of the line is
    /// consumed from the reader and discarded, so `buf` never exceeds it.
    async fn read_line(&mut self) -> Result<Line, CodecError> {
        let max = self.max_line_bytes.unwrap_or(usize::MAX);
        let mut len = 0usize;
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                return Ok(match len {
                    0 => Line::Eof,
                    len if len > max => Line::TooLong(len),
                    _ => Line::Complete,
                });
            }

            let (chunk, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..=i], true),
                None => (available, false),
            };
            let n = chunk.len();
            len = len.saturating_add(n);
            if len <= max {
                self.buf.extend_from_slice(chunk);
            } else {
                self.buf.clear();
            }
            self.inner.consume(n);

            if done {
                return Ok(if len > max {
                    Line::TooLong(len)
                } else {
                    Line::Complete
                });
            }
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Encodes one JSON value per line, flushing after each
pub struct JsonWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> JsonWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write(&mut self, value: &Value) -> Result<(), CodecError> {
        let mut bytes = serde_json::to_vec(value).map_err(CodecError::Encode)?;
        bytes.push(b'\n');
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n  [1,2]  \r\n\"tail\"";
        let mut reader = JsonReader::new(BufReader::new(input));

        assert_eq!(reader.read().await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(reader.read().await.unwrap(), Some(json!([1, 2])));
        assert_eq!(reader.read().await.unwrap(), Some(json!("tail")));
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decode_error_skips_one_line() {
        let input: &[u8] = b"not json\n{\"ok\":true}\n";
        let mut reader = JsonReader::new(BufReader::new(input));

        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(err.is_recoverable());
        assert_eq!(reader.read().await.unwrap(), Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let input: &[u8] = b"{\"padding\":\"xxxxxxxxxxxxxxxx\"}\n{}\n";
        let mut reader = JsonReader::new(BufReader::new(input)).with_max_line_bytes(16);

        assert!(matches!(
            reader.read().await.unwrap_err(),
            CodecError::LineTooLong { max: 16, .. }
        ));
        assert_eq!(reader.read().await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn test_oversized_line_is_not_buffered() {
        let mut input = vec![b'x'; 8 * 1024 * 1024];
        input.extend_from_slice(b"\n{\"after\":1}\n[2]");
        let mut reader = JsonReader::new(BufReader::new(&input[..])).with_max_line_bytes(16);

        assert!(matches!(
            reader.read().await.unwrap_err(),
            CodecError::LineTooLong { len, max: 16 } if len == 8 * 1024 * 1024 + 1
        ));
        assert!(reader.buf.capacity() <= 1024);
        assert_eq!(reader.read().await.unwrap(), Some(json!({"after": 1})));
        assert_eq!(reader.read().await.unwrap(), Some(json!([2])));
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_tail_without_newline() {
        let input: &[u8] = b"{}\nxxxxxxxxxxxxxxxxxxxxxxxx";
        let mut reader = JsonReader::new(BufReader::new(input)).with_max_line_bytes(8);

        assert_eq!(reader.read().await.unwrap(), Some(json!({})));
        assert!(matches!(
            reader.read().await.unwrap_err(),
            CodecError::LineTooLong { len: 24, max: 8 }
        ));
        assert_eq!(reader.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_appends_newline() {
        let mut writer = JsonWriter::new(Vec::new());
        writer.write(&json!({"a": 1})).await.unwrap();
        writer.write(&json!("b")).await.unwrap();
        assert_eq!(writer.into_inner(), b"{\"a\":1}\n\"b\"\n".to_vec());
    }
}
