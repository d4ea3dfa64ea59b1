use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Manifest unavailable after {attempts} attempts: {last_error}\n\n\
             Hint: Check your network connection and the manifest URL.\n\
             The URL can be overridden with HYPDL_MANIFEST_URL or [manifest] url in config.toml.")]
    ManifestUnavailable { attempts: u32, last_error: String },

    #[error("Game not found in manifest: {0}")]
    GameNotFound(String),

    #[error("Version not found: {index} is not between 1 and {available}")]
    VersionNotFound { index: usize, available: usize },

    #[error("{}", file_missing_message(.path, .in_progress))]
    FileMissing { path: PathBuf, in_progress: bool },

    #[error("Transfer of {file} aborted: {reason}")]
    TransferAborted { file: String, reason: String },

    #[error("Transfer of {file} interrupted")]
    Interrupted { file: String },

    #[error("Download cancelled: {completed} processed, {remaining} left\n\n\
             Hint: Run the same command again to resume. Partial files (*.tmp) are kept.")]
    BatchCancelled { completed: usize, remaining: usize },

    #[error("Checksum mismatch for {}\nExpected: {expected}\nComputed: {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Game name index not found: {}\n\n\
             Hint: Game ids must be named once before they can be selected.\n\n\
             Try: hypdl game-list", .0.display())]
    NameIndexMissing(PathBuf),

    #[error("{0}")]
    Other(String),
}

fn file_missing_message(path: &std::path::Path, in_progress: &bool) -> String {
    if *in_progress {
        format!(
            "File not finished (partial download present): {}",
            path.display()
        )
    } else {
        format!("File not found: {}", path.display())
    }
}

impl Error {
    /// Errors that only affect one descriptor or one selection step.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::GameNotFound(_)
                | Error::VersionNotFound { .. }
                | Error::FileMissing { .. }
                | Error::TransferAborted { .. }
                | Error::Interrupted { .. }
                | Error::ChecksumMismatch { .. }
        )
    }
}
