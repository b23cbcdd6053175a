//! Append-only result stream writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::codec::STREAM_MAGIC;
use super::HitResult;

/// The `.bin` sibling of a script path: same directory, same basename,
/// extension swapped.
pub fn bin_path_for(script_path: &Path) -> PathBuf {
    script_path.with_extension("bin")
}

/// Per-session, append-only writer of length-prefixed result records.
///
/// Close is idempotent; dropping an unclosed writer flushes best-effort.
pub struct ResultWriter {
    out: Option<BufWriter<File>>,
    path: PathBuf,
}

impl ResultWriter {
    /// Create (truncate) the stream file and write its header.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        out.write_all(STREAM_MAGIC)?;
        Ok(Self {
            out: Some(out),
            path: path.to_path_buf(),
        })
    }

    /// Create the stream alongside the given script file.
    pub fn for_script(script_path: &Path) -> io::Result<Self> {
        Self::create(&bin_path_for(script_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Errors here are fatal to the owning session.
    pub fn append(&mut self, result: &HitResult) -> io::Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "result stream already closed"))?;
        let payload = serde_json::to_vec(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        out.write_all(&(payload.len() as u32).to_le_bytes())?;
        out.write_all(&payload)?;
        Ok(())
    }

    /// Flush and close the stream. Safe to call more than once.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

impl Drop for ResultWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
