//! Content checksums for downloaded package files
//!
//! The launcher publishes an MD5 per package. Files are hashed in fixed-size
//! chunks so memory use stays flat for multi-gigabyte archives.
//!
//! # Examples
//!
//! ```no_run
//! use hypdl::integrity::{check, Verification};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! match check("game_2.3.0.zip", "d41d8cd98f00b204e9800998ecf8427e", None)? {
//!     Verification::Valid => println!("CRC OK!"),
//!     other => println!("{:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

use crate::transfer::partial_path_for;
use crate::{Error, ProgressCallback, Result};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of checking one file against its expected digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Mismatch { expected: String, actual: String },
    /// Neither the file nor its partial download exists
    Missing,
    /// Only the partial download exists
    InProgress,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Compute the hex MD5 of a file
pub fn digest<P: AsRef<Path>>(path: P, progress: Option<&ProgressCallback>) -> Result<String> {
    hash_file(path.as_ref(), progress, None)
}

/// Like [`digest`], but stops with [`Error::Interrupted`] as soon as `interrupted` is set
pub fn digest_interruptible<P: AsRef<Path>>(
    path: P,
    progress: Option<&ProgressCallback>,
    interrupted: &AtomicBool,
) -> Result<String> {
    hash_file(path.as_ref(), progress, Some(interrupted))
}

fn hash_file(
    path: &Path,
    progress: Option<&ProgressCallback>,
    interrupted: Option<&AtomicBool>,
) -> Result<String> {
    let file_size = std::fs::metadata(path)?.len();
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0; READ_CHUNK_SIZE];
    let mut bytes_processed: u64 = 0;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        bytes_processed += bytes_read as u64;

        if let Some(cb) = progress {
            cb(&label, bytes_processed, file_size);
        }

        if interrupted.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Err(Error::Interrupted { file: label });
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a file's digest with the expected hex string (case-insensitive)
///
/// Fails with [`Error::FileMissing`] when `path` does not exist; the error
/// records whether a partial download is sitting next to it.
pub fn verify<P: AsRef<Path>>(
    path: P,
    expected_checksum: &str,
    progress: Option<&ProgressCallback>,
) -> Result<bool> {
    let path = path.as_ref();
    ensure_exists(path)?;

    let actual = digest(path, progress)?;
    Ok(actual.eq_ignore_ascii_case(expected_checksum))
}

/// Like [`verify`], but folds missing files and mismatches into a [`Verification`]
pub fn check<P: AsRef<Path>>(
    path: P,
    expected_checksum: &str,
    progress: Option<&ProgressCallback>,
) -> Result<Verification> {
    let path = path.as_ref();
    match ensure_exists(path) {
        Ok(()) => {}
        Err(Error::FileMissing { in_progress, .. }) => {
            return Ok(if in_progress {
                Verification::InProgress
            } else {
                Verification::Missing
            });
        }
        Err(e) => return Err(e),
    }

    let actual = digest(path, progress)?;
    if actual.eq_ignore_ascii_case(expected_checksum) {
        Ok(Verification::Valid)
    } else {
        Ok(Verification::Mismatch {
            expected: expected_checksum.to_string(),
            actual,
        })
    }
}

/// Check a file and turn a mismatch into [`Error::ChecksumMismatch`]
///
/// A missing file comes back as [`Error::FileMissing`].
pub fn require_valid<P: AsRef<Path>>(
    path: P,
    expected_checksum: &str,
    progress: Option<&ProgressCallback>,
) -> Result<()> {
    let path = path.as_ref();
    match check(path, expected_checksum, progress)? {
        Verification::Valid => Ok(()),
        Verification::Mismatch { expected, actual } => Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        }),
        Verification::Missing => Err(missing(path, false)),
        Verification::InProgress => Err(missing(path, true)),
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    Err(missing(path, partial_path_for(path).exists()))
}

fn missing(path: &Path, in_progress: bool) -> Error {
    Error::FileMissing {
        path: PathBuf::from(path),
        in_progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    // md5("Hello, World!")
    const HELLO_MD5: &str = "65a8e27d8879283831b664bd8b7f0ad4";

    #[test]
    fn test_digest_known_value() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("hello.zip");
        fs::write(&test_file, b"Hello, World!").unwrap();

        assert_eq!(digest(&test_file, None).unwrap(), HELLO_MD5);
    }

    #[test]
    fn test_verify_valid_and_case_insensitive() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("hello.zip");
        fs::write(&test_file, b"Hello, World!").unwrap();

        assert!(verify(&test_file, HELLO_MD5, None).unwrap());
        assert!(verify(&test_file, &HELLO_MD5.to_uppercase(), None).unwrap());
    }

    #[test]
    fn test_verify_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("hello.zip");
        fs::write(&test_file, b"Hello, World!").unwrap();

        assert!(!verify(&test_file, &"0".repeat(32), None).unwrap());
    }

    #[test]
    fn test_verify_missing_vs_in_progress() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("game.zip");

        let err = verify(&final_path, HELLO_MD5, None).unwrap_err();
        assert!(matches!(
            err,
            Error::FileMissing {
                in_progress: false,
                ..
            }
        ));

        fs::write(partial_path_for(&final_path), b"Hello").unwrap();
        let err = verify(&final_path, HELLO_MD5, None).unwrap_err();
        assert!(matches!(
            err,
            Error::FileMissing {
                in_progress: true,
                ..
            }
        ));
    }

    #[test]
    fn test_check_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("game.zip");

        assert_eq!(
            check(&final_path, HELLO_MD5, None).unwrap(),
            Verification::Missing
        );

        fs::write(partial_path_for(&final_path), b"Hel").unwrap();
        assert_eq!(
            check(&final_path, HELLO_MD5, None).unwrap(),
            Verification::InProgress
        );

        fs::write(&final_path, b"Goodbye").unwrap();
        match check(&final_path, HELLO_MD5, None).unwrap() {
            Verification::Mismatch { expected, actual } => {
                assert_eq!(expected, HELLO_MD5);
                assert_ne!(actual, HELLO_MD5);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }

        fs::write(&final_path, b"Hello, World!").unwrap();
        assert!(check(&final_path, HELLO_MD5, None).unwrap().is_valid());
    }

    #[test]
    fn test_require_valid_reports_both_digests() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("game.zip");
        fs::write(&final_path, b"Goodbye").unwrap();

        let err = require_valid(&final_path, HELLO_MD5, None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(HELLO_MD5));
        assert!(message.contains("Computed:"));
    }

    #[test]
    fn test_digest_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("big.zip");
        fs::write(&test_file, vec![0u8; 200 * 1024]).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let progress: ProgressCallback = Arc::new(move |_name: &str, current: u64, total: u64| {
            assert!(current <= total);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        digest(&test_file, Some(&progress)).unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_interruptible_digest_stops_early() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("big.zip");
        fs::write(&test_file, vec![7u8; 300 * 1024]).unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let progress: ProgressCallback = Arc::new(move |_name: &str, _current: u64, _total: u64| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let flag = AtomicBool::new(true);
        let err = digest_interruptible(&test_file, Some(&progress), &flag).unwrap_err();

        assert!(matches!(err, Error::Interrupted { ref file } if file == "big.zip"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        flag.store(false, Ordering::SeqCst);
        assert_eq!(
            digest_interruptible(&test_file, None, &flag).unwrap(),
            digest(&test_file, None).unwrap()
        );
    }
}
