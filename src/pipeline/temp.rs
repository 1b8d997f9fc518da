//! Per-request temporary audio files
//!
//! A request owns at most one input and one output file. They are deleted by
//! [`TempResources::release`] or, failing that, when the value is dropped, so
//! nothing outlives the request even if the client goes away mid-response.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::Result;
use crate::voice::AudioFormat;

/// The input/output audio pair for one request
#[derive(Debug)]
pub struct TempResources {
    dir: PathBuf,
    input: Option<TempPath>,
    output: Option<TempPath>,
}

impl TempResources {
    /// Create an empty set that will place files in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            input: None,
            output: None,
        }
    }

    /// Write the uploaded audio to a fresh input file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub async fn store_input(&mut self, audio: &[u8], format: AudioFormat) -> Result<PathBuf> {
        let path = self.create("aura-in-", format)?;
        tokio::fs::write(&path, audio).await?;
        let stored = path.to_path_buf();
        release_path("input", self.input.replace(path));
        Ok(stored)
    }

    /// Write synthesized audio to a fresh output file, replacing any earlier one
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub async fn store_output(&mut self, audio: &[u8], format: AudioFormat) -> Result<PathBuf> {
        let path = self.create("aura-out-", format)?;
        tokio::fs::write(&path, audio).await?;
        let stored = path.to_path_buf();
        release_path("output", self.output.replace(path));
        Ok(stored)
    }

    /// Path of the output file, if one was stored
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Delete both files now
    pub fn release(mut self) {
        self.release_all();
    }

    fn create(&self, prefix: &str, format: AudioFormat) -> Result<TempPath> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(&self.dir)?;
        Ok(file.into_temp_path())
    }

    fn release_all(&mut self) {
        release_path("input", self.input.take());
        release_path("output", self.output.take());
    }
}

impl Drop for TempResources {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn release_path(kind: &str, path: Option<TempPath>) {
    let Some(path) = path else {
        return;
    };
    let shown = path.display().to_string();
    match path.close() {
        Ok(()) => tracing::debug!(kind, path = %shown, "cleaned up temp file"),
        Err(e) => tracing::warn!(kind, path = %shown, error = %e, "cleanup failed"),
    }
}
