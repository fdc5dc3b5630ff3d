//! Filesystem storage for synthesized audio.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ArtifactError, Result};

/// Extension of finished artifacts.
pub const ARTIFACT_EXTENSION: &str = "mp3";
/// Extension of artifacts still being written. Never served.
pub const PARTIAL_EXTENSION: &str = "mp3.part";

/// Directory holding generated audio until it is served and deleted.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens the store, creating `dir` if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!("Artifact directory ready at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists `audio` under a fresh unique name.
    ///
    /// Bytes go to `<id>.mp3.part` first and are renamed once synced, so a
    /// reader never observes a half-written `.mp3`. The partial file is
    /// removed if the write fails or the future is dropped midway.
    pub async fn create(&self, audio: &[u8]) -> Result<AudioArtifact> {
        if audio.is_empty() {
            return Err(ArtifactError::EmptyAudio);
        }

        let id = Uuid::new_v4();
        let final_path = self.dir.join(format!("{id}.{ARTIFACT_EXTENSION}"));
        let partial_path = self.dir.join(format!("{id}.{PARTIAL_EXTENSION}"));

        let mut guard = PartialFileGuard::new(partial_path.clone());
        let mut file = fs::File::create(&partial_path).await?;
        file.write_all(audio).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&partial_path, &final_path).await?;
        guard.disarm();

        debug!("Stored {} bytes as {:?}", audio.len(), final_path);
        Ok(AudioArtifact {
            id,
            path: final_path,
            size: audio.len(),
            voice_id: None,
        })
    }

    /// Removes regular files whose modification time is older than `ttl`.
    ///
    /// Files that disappear during the sweep or cannot be inspected or removed
    /// are skipped; the sweep itself never fails once the directory is open.
    pub async fn sweep(&self, ttl: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read artifact directory {:?}: {}", self.dir, e);
                report.failed += 1;
                return report;
            }
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to list artifact directory entry: {}", e);
                    report.failed += 1;
                    break;
                }
            };
            report.scanned += 1;
            let path = entry.path();

            let metadata = match fs::symlink_metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Cannot inspect {:?}: {}", path, e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                report.skipped += 1;
                continue;
            }

            // A modification time in the future counts as fresh.
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age <= ttl {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Expired artifact {:?} removed (age {:?})", path, age);
                    report.removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.skipped += 1,
                Err(e) => {
                    warn!("Failed to remove expired artifact {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 || report.failed > 0 {
            info!("Artifact sweep finished: {}", report);
        }
        report
    }
}

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    /// Entries that vanished mid-sweep or are not regular files
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned {}, removed {}, skipped {}, failed {}",
            self.scanned, self.removed, self.skipped, self.failed
        )
    }
}

/// A finished audio file awaiting delivery.
#[derive(Debug)]
pub struct AudioArtifact {
    id: Uuid,
    path: PathBuf,
    size: usize,
    voice_id: Option<String>,
}

impl AudioArtifact {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Voice that produced the audio, when known.
    pub fn voice_id(&self) -> Option<&str> {
        self.voice_id.as_deref()
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    /// Reads the audio for the response body.
    ///
    /// Fails if the file is gone or empty; an empty file is removed.
    pub async fn serve(self) -> Result<(Bytes, ServedArtifact)> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing(self.path));
            }
            Err(e) => return Err(e.into()),
        };

        let served = ServedArtifact { path: self.path };
        if data.is_empty() {
            served.delete_now().await;
            return Err(ArtifactError::Empty(served.path));
        }
        Ok((Bytes::from(data), served))
    }
}

/// An artifact whose bytes have been handed to a response.
#[derive(Debug)]
pub struct ServedArtifact {
    path: PathBuf,
}

impl ServedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file after `delay` on a background task.
    pub fn schedule_deletion(self, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.delete_now().await;
        })
    }

    /// Deletes the file. Failures are logged and ignored.
    pub async fn delete_now(&self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Deleted served artifact {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete artifact {:?}: {}", self.path, e),
        }
    }
}

/// Removes a partially written file unless disarmed.
struct PartialFileGuard {
    path: Option<PathBuf>,
}

impl PartialFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed partial artifact {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove partial artifact {:?}: {}", path, e),
            }
        }
    }
}
