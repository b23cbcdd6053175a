//! Stream codec: magic header plus length-prefixed JSON records.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::HitResult;

/// Identifies a korra result stream, format version 1.
pub const STREAM_MAGIC: &[u8; 6] = b"korra1";

/// Error type for decoding a result stream.
#[derive(Debug)]
pub enum CodecError {
    Io(io::Error),
    /// The file does not start with the korra stream header.
    BadMagic,
    /// A record's JSON payload failed to decode.
    Decode(serde_json::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "I/O error reading result stream: {}", e),
            CodecError::BadMagic => write!(f, "not a korra result stream (bad header)"),
            CodecError::Decode(e) => write!(f, "malformed result record: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            CodecError::Decode(e) => Some(e),
            CodecError::BadMagic => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError::Io(e)
    }
}

/// Sequential reader over a result stream.
pub struct ResultReader<R: Read> {
    inner: R,
}

impl ResultReader<BufReader<File>> {
    /// Open a `.bin` stream and validate its header.
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> ResultReader<R> {
    /// Wrap a reader positioned at the start of a stream; consumes and
    /// validates the header.
    pub fn new(mut inner: R) -> Result<Self, CodecError> {
        let mut magic = [0u8; STREAM_MAGIC.len()];
        inner.read_exact(&mut magic)?;
        if &magic != STREAM_MAGIC {
            return Err(CodecError::BadMagic);
        }
        Ok(Self { inner })
    }

    /// Read the next record; `None` at a clean end of stream. A partial
    /// trailing record is an error.
    pub fn next_record(&mut self) -> Result<Option<HitResult>, CodecError> {
        let mut len_buf = [0u8; 4];
        match self.inner.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload)?;
        let result = serde_json::from_slice(&payload).map_err(CodecError::Decode)?;
        Ok(Some(result))
    }
}

/// Decode an entire stream file into memory.
pub fn read_all(path: &Path) -> Result<Vec<HitResult>, CodecError> {
    let mut reader = ResultReader::open(path)?;
    let mut results = Vec::new();
    while let Some(result) = reader.next_record()? {
        results.push(result);
    }
    Ok(results)
}
