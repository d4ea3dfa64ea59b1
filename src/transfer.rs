//! Resumable, checksum-gated package downloads
//!
//! Each descriptor is downloaded to `<name>.tmp` next to its final path and
//! renamed into place once the body has been fully written. A leftover
//! `.tmp` from an earlier run is continued with an HTTP `Range` request.
//! A final file that already matches its checksum is never downloaded again.
//!
//! Descriptors are processed strictly one after another, in the order given.
//! A failure only affects its own descriptor; the batch carries on and the
//! partial file stays on disk so the next run can resume it.
//!
//! # Examples
//!
//! ```no_run
//! use hypdl::{PackageDescriptor, TransferEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TransferEngine::new("downloads", None)?;
//! let files = engine.transfer_all(&[PackageDescriptor {
//!     url: "https://cdn.example.com/game_2.3.0.zip".to_string(),
//!     compressed_size: 1000,
//!     checksum: "deadbeef".to_string(),
//! }])?;
//!
//! for file in files {
//!     println!("{} {:?}", file.path.display(), file.status);
//! }
//! # Ok(())
//! # }
//! ```

use crate::catalog::PackageDescriptor;
use crate::config::DownloadConfig;
use crate::{integrity, Error, Result};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Suffix of in-progress downloads
pub const PARTIAL_SUFFIX: &str = ".tmp";

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback for transfer/verification operations
///
/// Called with:
/// - `name`: File being processed
/// - `current`: Bytes processed so far (including resumed bytes)
/// - `total`: Expected total bytes (0 if unknown)
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Asked once per interruption, with the name of the file that was cut short
pub type InterruptCallback = Arc<dyn Fn(&str) -> InterruptChoice + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterruptChoice {
    /// Keep the partial file and continue with the next descriptor
    #[default]
    SkipCurrent,
    /// Stop the whole batch
    AbortBatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Final file was already present with the right checksum
    AlreadyValid,
    Downloaded { bytes: u64 },
    Resumed { offset: u64, bytes: u64 },
    /// Left for a later run; any partial file is kept
    Failed(String),
    /// Interrupted by the user, partial file kept
    Skipped,
}

impl TransferStatus {
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            TransferStatus::AlreadyValid
                | TransferStatus::Downloaded { .. }
                | TransferStatus::Resumed { .. }
        )
    }
}

/// One entry of [`TransferEngine::transfer_all`]'s result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredFile {
    pub path: PathBuf,
    pub checksum: String,
    pub status: TransferStatus,
}

/// File name of a package: the last path segment of its URL
pub fn file_name_for(url: &str) -> Result<String> {
    let name = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|s| s.to_string()),
        Err(_) => url.rsplit('/').next().map(|s| s.to_string()),
    };

    match name {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name),
        _ => Err(Error::TransferAborted {
            file: url.to_string(),
            reason: "URL has no file name".to_string(),
        }),
    }
}

/// `<final_path>.tmp`
pub fn partial_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Per-descriptor bookkeeping; dropped when the descriptor reaches a terminal state
#[derive(Debug)]
struct TransferState {
    name: String,
    final_path: PathBuf,
    partial_path: PathBuf,
    bytes_on_disk: u64,
    target_size: u64,
}

impl TransferState {
    fn new(name: String, final_path: PathBuf, target_size: u64) -> Result<Self> {
        let partial_path = partial_path_for(&final_path);
        let bytes_on_disk = match fs::metadata(&partial_path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            name,
            final_path,
            partial_path,
            bytes_on_disk,
            target_size,
        })
    }

    fn aborted(&self, reason: impl Into<String>) -> Error {
        Error::TransferAborted {
            file: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn finalize(&self) -> Result<()> {
        fs::rename(&self.partial_path, &self.final_path).map_err(|e| {
            self.aborted(format!(
                "failed to move {} into place: {}",
                self.partial_path.display(),
                e
            ))
        })?;
        debug!(file = %self.final_path.display(), "finalized");
        Ok(())
    }
}

pub struct TransferEngine {
    client: reqwest::blocking::Client,
    output_dir: PathBuf,
    chunk_size: usize,
    progress: Option<ProgressCallback>,
    interrupted: Arc<AtomicBool>,
    on_interrupt: Option<InterruptCallback>,
}

impl TransferEngine {
    /// Create an engine writing into `output_dir`
    ///
    /// `idle_timeout` bounds every connect and every body read; `None`
    /// lets a stalled connection wait forever.
    pub fn new<P: Into<PathBuf>>(output_dir: P, idle_timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(idle_timeout)
            .user_agent(concat!("hypdl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            output_dir: output_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: None,
            interrupted: Arc::new(AtomicBool::new(false)),
            on_interrupt: None,
        })
    }

    pub fn from_config(config: &DownloadConfig) -> Result<Self> {
        Ok(Self::new(config.output_dir(), config.idle_timeout())?.with_chunk_size(config.chunk_size))
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Share an interrupt flag (typically set from a Ctrl+C handler)
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn with_interrupt_handler(mut self, handler: InterruptCallback) -> Self {
        self.on_interrupt = Some(handler);
        self
    }

    /// Final path for a descriptor
    pub fn final_path(&self, descriptor: &PackageDescriptor) -> Result<PathBuf> {
        Ok(self.output_dir.join(file_name_for(&descriptor.url)?))
    }

    /// Download every descriptor in order
    ///
    /// Returns one entry per descriptor, in input order. Individual failures
    /// are recorded in [`TransferredFile::status`]; only a user choosing
    /// [`InterruptChoice::AbortBatch`] ends the batch early, with
    /// [`Error::BatchCancelled`].
    pub fn transfer_all(&self, descriptors: &[PackageDescriptor]) -> Result<Vec<TransferredFile>> {
        fs::create_dir_all(self.dir_or_cwd())?;

        let mut results = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            let path = self
                .final_path(descriptor)
                .unwrap_or_else(|_| self.output_dir.clone());

            let status = match self.transfer(descriptor) {
                Ok(status) => status,
                Err(Error::Interrupted { file }) => {
                    let choice = self
                        .on_interrupt
                        .as_ref()
                        .map(|ask| ask(&file))
                        .unwrap_or_default();
                    self.interrupted.store(false, Ordering::SeqCst);

                    if choice == InterruptChoice::AbortBatch {
                        info!("batch cancelled during {}", file);
                        return Err(Error::BatchCancelled {
                            completed: index,
                            remaining: descriptors.len() - index,
                        });
                    }

                    info!("skipping {} after interrupt", file);
                    TransferStatus::Skipped
                }
                Err(e) => {
                    warn!("{}", e);
                    TransferStatus::Failed(e.to_string())
                }
            };

            results.push(TransferredFile {
                path,
                checksum: descriptor.checksum.clone(),
                status,
            });
        }

        Ok(results)
    }

    /// Download a single descriptor
    ///
    /// The interrupt flag is honoured before any work starts, while an
    /// existing final file is being hashed, and between body chunks.
    pub fn transfer(&self, descriptor: &PackageDescriptor) -> Result<TransferStatus> {
        let name = file_name_for(&descriptor.url)?;
        let final_path = self.output_dir.join(&name);

        if self.interrupted.load(Ordering::SeqCst) {
            return Err(Error::Interrupted { file: name });
        }

        if final_path.exists() {
            let actual = integrity::digest_interruptible(
                &final_path,
                self.progress.as_ref(),
                &self.interrupted,
            )?;
            if actual.eq_ignore_ascii_case(&descriptor.checksum) {
                debug!(file = %name, "already downloaded and valid");
                return Ok(TransferStatus::AlreadyValid);
            }
            warn!("{} exists but fails its checksum, downloading again", name);
            fs::remove_file(&final_path)?;
            let partial_path = partial_path_for(&final_path);
            if partial_path.exists() {
                fs::remove_file(&partial_path)?;
            }
        }

        let mut state = TransferState::new(name, final_path, descriptor.compressed_size)?;

        if state.target_size > 0 && state.bytes_on_disk == state.target_size {
            debug!(file = %state.name, "partial file already complete");
            state.finalize()?;
            return Ok(TransferStatus::Resumed {
                offset: state.bytes_on_disk,
                bytes: 0,
            });
        }

        if state.target_size > 0 && state.bytes_on_disk > state.target_size {
            warn!(
                "{} is larger than expected ({} > {} bytes), starting over",
                state.partial_path.display(),
                state.bytes_on_disk,
                state.target_size
            );
            state.bytes_on_disk = 0;
        }

        self.stream(&descriptor.url, &mut state)
    }

    fn stream(&self, url: &str, state: &mut TransferState) -> Result<TransferStatus> {
        let requested_offset = state.bytes_on_disk;

        let mut request = self.client.get(url);
        if requested_offset > 0 {
            debug!(file = %state.name, offset = requested_offset, "resuming");
            request = request.header(RANGE, format!("bytes={}-", requested_offset));
        }

        let mut response = request
            .send()
            .map_err(|e| state.aborted(format!("request failed: {}", e)))?;

        let offset = match response.status() {
            StatusCode::OK => {
                if requested_offset > 0 {
                    info!(
                        "server ignored range request for {}, restarting from zero",
                        state.name
                    );
                }
                0
            }
            StatusCode::PARTIAL_CONTENT => {
                let start = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(content_range_start);
                if start != Some(requested_offset) {
                    return Err(state.aborted(format!(
                        "server resumed at {:?}, expected byte {}",
                        start, requested_offset
                    )));
                }
                requested_offset
            }
            status => {
                return Err(state.aborted(format!("HTTP {}", status.as_u16())));
            }
        };
        state.bytes_on_disk = offset;

        let opened = if offset > 0 {
            OpenOptions::new().append(true).open(&state.partial_path)
        } else {
            File::create(&state.partial_path)
        };
        let mut file = opened.map_err(|e| {
            state.aborted(format!(
                "cannot open {}: {}",
                state.partial_path.display(),
                e
            ))
        })?;

        let mut buffer = vec![0u8; self.chunk_size];
        let mut received: u64 = 0;

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|e| state.aborted(format!("connection lost: {}", e)))?;
            if read == 0 {
                break;
            }

            file.write_all(&buffer[..read])
                .map_err(|e| state.aborted(format!("write failed: {}", e)))?;
            received += read as u64;
            state.bytes_on_disk += read as u64;

            if let Some(ref cb) = self.progress {
                cb(&state.name, state.bytes_on_disk, state.target_size);
            }

            if self.interrupted.load(Ordering::SeqCst) {
                file.flush()?;
                return Err(Error::Interrupted {
                    file: state.name.clone(),
                });
            }
        }

        file.flush()
            .map_err(|e| state.aborted(format!("write failed: {}", e)))?;
        drop(file);

        if state.target_size > 0 && state.bytes_on_disk < state.target_size {
            return Err(state.aborted(format!(
                "stream ended after {} of {} bytes",
                state.bytes_on_disk, state.target_size
            )));
        }

        state.finalize()?;

        Ok(if offset > 0 {
            TransferStatus::Resumed {
                offset,
                bytes: received,
            }
        } else {
            TransferStatus::Downloaded { bytes: received }
        })
    }

    fn dir_or_cwd(&self) -> &Path {
        if self.output_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.output_dir
        }
    }
}

/// Start offset of a `Content-Range: bytes <start>-<end>/<total>` header
fn content_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_for("https://cdn.example.com/client/game_2.3.0.zip").unwrap(),
            "game_2.3.0.zip"
        );
        assert_eq!(
            file_name_for("https://cdn.example.com/audio_en-us.zip?sign=abc").unwrap(),
            "audio_en-us.zip"
        );
        assert_eq!(file_name_for("plain/name.7z.001").unwrap(), "name.7z.001");
        assert!(file_name_for("https://cdn.example.com/dir/").is_err());
    }

    #[test]
    fn test_partial_path_is_distinct_and_colocated() {
        let final_path = Path::new("/data/game.zip");
        let partial = partial_path_for(final_path);

        assert_eq!(partial, PathBuf::from("/data/game.zip.tmp"));
        assert_ne!(partial, final_path);
        assert_eq!(partial.parent(), final_path.parent());
    }

    #[test]
    fn test_content_range_start() {
        assert_eq!(content_range_start("bytes 100-999/1000"), Some(100));
        assert_eq!(content_range_start("bytes 0-0/*"), Some(0));
        assert_eq!(content_range_start("bytes */1000"), None);
        assert_eq!(content_range_start("items 1-2/3"), None);
    }

    #[test]
    fn test_status_completion() {
        assert!(TransferStatus::AlreadyValid.is_complete());
        assert!(TransferStatus::Resumed {
            offset: 1,
            bytes: 2
        }
        .is_complete());
        assert!(!TransferStatus::Skipped.is_complete());
        assert!(!TransferStatus::Failed("HTTP 404".into()).is_complete());
    }

    #[test]
    fn test_interrupt_choice_defaults_to_skip() {
        assert_eq!(InterruptChoice::default(), InterruptChoice::SkipCurrent);
    }
}
