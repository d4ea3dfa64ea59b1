use super::{create_progress_callback, finish_progress, resolve_selection, SelectionOptions};
use anyhow::Result;
use hypdl::integrity;
use hypdl::transfer::file_name_for;
use hypdl::{Config, Error};
use std::path::PathBuf;

pub fn run(options: SelectionOptions) -> Result<()> {
    let config = Config::load()?;
    let resolution = resolve_selection(&options, &config)?;
    let output_dir = options.output_dir(&config);

    let mut files = Vec::with_capacity(resolution.descriptors.len());
    for descriptor in &resolution.descriptors {
        let name = file_name_for(&descriptor.url)?;
        files.push((output_dir.join(name), descriptor.checksum.clone()));
    }

    let failed = verify_files(&files)?;
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed verification", failed, files.len());
    }

    println!("✓ All {} file(s) verified", files.len());
    Ok(())
}

/// Check each `(path, md5)` pair in order, returning how many did not pass
pub fn verify_files(files: &[(PathBuf, String)]) -> Result<usize> {
    let (progress, bar) = create_progress_callback("MD5 ");
    let mut failed = 0;

    for (path, expected) in files {
        println!("Running CRC: {}", path.display());
        let outcome = integrity::require_valid(path, expected, Some(&progress));
        finish_progress(&bar);

        let Err(err) = outcome else {
            println!("  ✓ CRC OK!");
            continue;
        };

        failed += 1;
        match err {
            Error::ChecksumMismatch {
                expected, actual, ..
            } => {
                println!("  ✗ CRC Failed!");
                println!("    Expected: {}", expected);
                println!("    Computed: {}", actual);
            }
            Error::FileMissing {
                in_progress: true, ..
            } => {
                println!("  ⚠ Not finished (partial download present, rerun download to resume)");
            }
            Error::FileMissing { .. } => println!("  ✗ File not found"),
            other => println!("  ✗ Could not check file: {}", other),
        }
    }

    Ok(failed)
}
