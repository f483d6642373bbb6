//! Wire format between a judge and its runner, and the session output stream.
//!
//! Every value is a JSON document. Values written by this crate end with a newline, but readers
//! accept any concatenation of JSON values, with or without whitespace in between.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::verdict::{FinalVerdict, TestCase};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Pipe closed after running lang")]
    PipeClosed,

    #[error("Stream ended in the middle of a JSON value")]
    Truncated,

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on protocol stream: {0}")]
    Io(#[from] std::io::Error),
}

/// One execution request from a judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Terminal line of a session that failed for reasons other than the submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatalError {
    pub error: String,
}

/// Anything a judge process may print on its stdout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JudgeMessage {
    RunRequest(RunRequest),
    TestCase(TestCase),
    FinalVerdict(FinalVerdict),
    Fatal(FatalError),
}

/// Reads a stream of concatenated JSON values.
///
/// Bytes are scanned once as they arrive to find where the next value ends, and each value is
/// handed to serde exactly once, so a value spanning many reads costs time linear in its size.
#[derive(Debug)]
pub struct JsonStream<R> {
    reader: R,
    buf: Vec<u8>,
    scan: Scanner,
    eof: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Container,
    Str,
    Scalar,
}

/// Tracks the boundary of the value at the front of the buffer across reads.
#[derive(Debug, Default)]
struct Scanner {
    pos: usize,
    kind: Option<ValueKind>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Scans the unseen tail of `buf` and returns the end offset of the first value once known.
    fn end_of_value(&mut self, buf: &[u8]) -> Option<usize> {
        while self.pos < buf.len() {
            let i = self.pos;
            let b = buf[i];
            self.pos += 1;

            let Some(kind) = self.kind else {
                match b {
                    b if b.is_ascii_whitespace() => {}
                    b'{' | b'[' => {
                        self.kind = Some(ValueKind::Container);
                        self.depth = 1;
                    }
                    b'"' => {
                        self.kind = Some(ValueKind::Str);
                        self.in_string = true;
                    }
                    // a stray closer; serde reports it
                    b'}' | b']' => return Some(i + 1),
                    _ => self.kind = Some(ValueKind::Scalar),
                }
                continue;
            };

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                    if kind == ValueKind::Str {
                        return Some(i + 1);
                    }
                }
                continue;
            }

            match (kind, b) {
                (ValueKind::Scalar, b) if b.is_ascii_whitespace() || b"{}[]\",:".contains(&b) => {
                    // the delimiter belongs to whatever follows
                    self.pos = i;
                    return Some(i);
                }
                (ValueKind::Container, b'"') => self.in_string = true,
                (ValueKind::Container, b'{' | b'[') => self.depth += 1,
                (ValueKind::Container, b'}' | b']') => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

impl<R> JsonStream<R>
where
    R: AsyncRead + Unpin,
{
    const CHUNK_SIZE: usize = 8192;

    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            scan: Scanner::default(),
            eof: false,
        }
    }

    fn take<T: DeserializeOwned>(&mut self, end: usize) -> Result<T, serde_json::Error> {
        let value = serde_json::from_slice(&self.buf[..end]);
        self.buf.drain(..end);
        self.scan = Scanner::default();
        value
    }

    /// Next complete value, or `None` once the stream ends cleanly between values.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        loop {
            if let Some(end) = self.scan.end_of_value(&self.buf) {
                return Ok(Some(self.take(end)?));
            }

            if self.eof {
                if self.buf.iter().all(u8::is_ascii_whitespace) {
                    self.buf.clear();
                    return Ok(None);
                }
                // only a bare scalar can end at EOF; anything else is cut short
                return match self.take(self.buf.len()) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) if e.is_eof() => Err(ProtocolError::Truncated),
                    Err(e) => Err(e.into()),
                };
            }

            let mut chunk = [0u8; Self::CHUNK_SIZE];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

/// Writes one JSON value per line and flushes after each.
#[derive(Debug)]
pub struct JsonWriter<W> {
    writer: W,
}

impl<W> JsonWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_line<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ProtocolError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A writer shared by the driver loop and a remote runner so that requests and test cases keep
/// their relative order on the same stream.
pub type SharedWriter<W> = Arc<Mutex<JsonWriter<W>>>;

pub fn shared_writer<W: AsyncWrite + Unpin>(writer: W) -> SharedWriter<W> {
    Arc::new(Mutex::new(JsonWriter::new(writer)))
}
