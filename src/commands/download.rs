use super::{
    create_progress_callback, finish_progress, prompt, resolve_selection, verify, SelectionOptions,
};
use anyhow::{Context, Result};
use hypdl::{format_bytes, Config, PackageItem, Resolution, TransferEngine, TransferStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn run(options: SelectionOptions, info: bool, no_verify: bool) -> Result<()> {
    let config = Config::load()?;
    let resolution = resolve_selection(&options, &config)?;

    if info {
        print_info(&resolution, &options.languages(&config));
        return Ok(());
    }

    if resolution.descriptors.is_empty() {
        println!("Nothing to download for this selection.");
        return Ok(());
    }

    let output_dir = options.output_dir(&config);
    println!(
        "Downloading {} file(s), {} total{}",
        resolution.descriptors.len(),
        format_bytes(resolution.totals.compressed()),
        if output_dir.as_os_str().is_empty() {
            String::new()
        } else {
            format!(" to {}", output_dir.display())
        }
    );
    println!();

    let interrupted = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(interrupted.clone())?;

    let (progress, bar) = create_progress_callback("");
    let engine = TransferEngine::from_config(&config.download)?
        .with_output_dir(output_dir)
        .with_progress(progress)
        .with_interrupt_flag(interrupted.clone())
        .with_interrupt_handler(Arc::new({
            let bar = bar.clone();
            move |file: &str| {
                finish_progress(&bar);
                prompt::interrupt_choice(file)
            }
        }));

    let result = engine.transfer_all(&resolution.descriptors);
    finish_progress(&bar);
    interrupted.store(false, Ordering::SeqCst);
    let files = result?;

    println!();
    let mut incomplete = 0;
    for file in &files {
        let name = file.path.display();
        match &file.status {
            TransferStatus::AlreadyValid => println!("  ✓ {} (already downloaded)", name),
            TransferStatus::Downloaded { bytes } => {
                println!("  ✓ {} ({})", name, format_bytes(*bytes))
            }
            TransferStatus::Resumed { offset, bytes } => println!(
                "  ✓ {} (resumed at {}, {} more)",
                name,
                format_bytes(*offset),
                format_bytes(*bytes)
            ),
            TransferStatus::Failed(reason) => {
                incomplete += 1;
                eprintln!("  ✗ {}: {}", name, reason);
            }
            TransferStatus::Skipped => {
                incomplete += 1;
                println!("  ⚠ {} skipped, partial file kept", name);
            }
        }
    }

    if incomplete > 0 {
        println!();
        println!(
            "{} file(s) not finished. Run the same command again to resume.",
            incomplete
        );
    }

    if no_verify {
        return Ok(());
    }

    println!();
    let pairs: Vec<_> = files
        .iter()
        .filter(|f| f.status.is_complete())
        .map(|f| (f.path.clone(), f.checksum.clone()))
        .collect();
    let failed = verify::verify_files(&pairs)?;

    if failed > 0 {
        anyhow::bail!(
            "{} file(s) failed verification. Run download again to replace them.",
            failed
        );
    }
    if incomplete > 0 {
        anyhow::bail!("{} file(s) were not downloaded", incomplete);
    }

    Ok(())
}

/// First Ctrl+C stops the current transfer; a second one while it is pending exits
fn install_interrupt_handler(flag: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            eprintln!();
            eprintln!("User canceled.");
            std::process::exit(130);
        }
    })
    .context("Failed to set Ctrl+C handler")
}

fn print_info(resolution: &Resolution, languages: &[String]) {
    for item in &resolution.items {
        let file = item.file();
        if let PackageItem::Audio { language, .. } = item {
            println!("language: {}", language);
        }
        println!("url: {}", file.url);
        println!("size: {}", file.compressed_size);
        println!("decompressed_size: {}", file.decompressed_size);
        println!("md5: {}", file.checksum);
        println!();
    }

    let totals = &resolution.totals;
    println!("Total size (game_pkgs):");
    println!("=> Compressed: {}", format_bytes(totals.game_compressed));
    println!("=> Decompressed: {}", format_bytes(totals.game_decompressed));

    println!();
    println!("Total size (audio_pkgs={}):", languages.join(", "));
    println!("=> Compressed: {}", format_bytes(totals.audio_compressed));
    println!("=> Decompressed: {}", format_bytes(totals.audio_decompressed));
}
