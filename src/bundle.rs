//! Result bundling and delivery.
//!
//! Two seams: an [`ArchiveEngine`] packs artifacts into one file and a
//! [`DownloadSink`] hands finished files to the user. The defaults are a
//! Deflate zip and a directory on disk; tests use [`MemorySink`].

use crate::artifact::{OutputArtifact, ZIP_MEDIA_TYPE};
use crate::error::WorkbenchError;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

// ── Archive engine ───────────────────────────────────────────────────────

/// Creates archive builders.
pub trait ArchiveEngine: Send + Sync {
    fn create(&self) -> Box<dyn ArchiveBuilder>;
}

/// One archive being assembled.
pub trait ArchiveBuilder: Send {
    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), WorkbenchError>;

    /// Finish the archive and return its bytes.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>, WorkbenchError>;
}

/// Zip archives with Deflate compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveEngine;

impl ArchiveEngine for ZipArchiveEngine {
    fn create(&self) -> Box<dyn ArchiveBuilder> {
        Box::new(ZipBuilder {
            writer: zip::ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        })
    }
}

struct ZipBuilder {
    writer: zip::ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl ArchiveBuilder for ZipBuilder {
    fn add_entry(&mut self, name: &str, bytes: &[u8]) -> Result<(), WorkbenchError> {
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        self.writer
            .start_file(name, options)
            .map_err(|e| WorkbenchError::ArchiveFailed(format!("entry '{name}': {e}")))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| WorkbenchError::ArchiveFailed(format!("entry '{name}': {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<u8>, WorkbenchError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| WorkbenchError::ArchiveFailed(format!("finalize: {e}")))?;
        debug!("Finalised zip with {} entries", self.entries);
        Ok(cursor.into_inner())
    }
}

/// Pack `artifacts` into one archive named `archive_name`.
///
/// One entry per artifact, in order, named after the artifact. An empty
/// list is rejected before the engine is touched.
pub fn bundle_artifacts(
    engine: &dyn ArchiveEngine,
    artifacts: &[OutputArtifact],
    archive_name: &str,
) -> Result<OutputArtifact, WorkbenchError> {
    if artifacts.is_empty() {
        return Err(WorkbenchError::NothingToBundle);
    }

    let mut builder = engine.create();
    for artifact in artifacts {
        builder.add_entry(&artifact.name, &artifact.bytes)?;
    }
    let bytes = builder.finalize()?;

    info!(
        "Bundled {} files into {} ({} bytes)",
        artifacts.len(),
        archive_name,
        bytes.len()
    );
    Ok(OutputArtifact::new(archive_name, ZIP_MEDIA_TYPE, bytes))
}

// ── Delivery ─────────────────────────────────────────────────────────────

/// Hands a finished file to the user.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, name: &str, media_type: &str, bytes: &[u8]) -> Result<(), WorkbenchError>;
}

/// Writes delivered files into a directory.
///
/// Each file is written to a temporary file in the same directory and then
/// renamed, so a reader never sees a partial file. Only the final path
/// component of the delivered name is used.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a delivery named `name` ends up.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "download".into());
        self.dir.join(file_name)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, name: &str, _media_type: &str, bytes: &[u8]) -> Result<(), WorkbenchError> {
        let target = self.path_for(name);
        let io_err = |source| WorkbenchError::DeliveryFailed {
            path: target.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.persist(&target).map_err(|e| io_err(e.error))?;

        info!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

/// Keeps deliveries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<OutputArtifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<OutputArtifact> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, name: &str, media_type: &str, bytes: &[u8]) -> Result<(), WorkbenchError> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(OutputArtifact::new(name, media_type, bytes.to_vec()));
        Ok(())
    }
}
