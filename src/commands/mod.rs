pub mod download;
pub mod game_list;
pub mod prompt;
pub mod verify;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use hypdl::catalog::{select_channel, select_patch};
use hypdl::{
    CatalogResolver, ChannelKind, Config, GameNameIndex, GroupKind, ManifestClient,
    ManifestDocument, ProgressCallback, Resolution, Selection, TrackPreference, VersionMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Package groups selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeFilter {
    #[value(name = "game_pkgs")]
    GamePkgs,
    #[value(name = "audio_pkgs")]
    AudioPkgs,
    All,
}

impl TypeFilter {
    fn groups(self) -> Vec<GroupKind> {
        match self {
            TypeFilter::GamePkgs => vec![GroupKind::GameData],
            TypeFilter::AudioPkgs => vec![GroupKind::Audio],
            TypeFilter::All => GroupKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    /// Ask when a pre-download is available
    Ask,
    Main,
    PreDownload,
}

/// Flags shared by `download` and `verify`
#[derive(Debug, Clone, Args)]
pub struct SelectionOptions {
    /// Select a patch to update from instead of the full game
    #[arg(short, long)]
    pub patches: bool,

    /// Package groups to include
    #[arg(short, long, value_enum, default_value_t = TypeFilter::All)]
    pub types: TypeFilter,

    /// Audio languages to include (e.g., -l en-us ja-jp)
    #[arg(short, long, num_args = 1..)]
    pub languages: Option<Vec<String>>,

    /// Download folder path
    #[arg(short = 'o', long)]
    pub path: Option<PathBuf>,

    /// Game id (skips the game menu)
    #[arg(short, long)]
    pub game: Option<String>,

    /// Release channel
    #[arg(long, value_enum, default_value_t = ChannelArg::Ask)]
    pub channel: ChannelArg,

    /// Patch entry to use with --patches (1-based, as listed)
    #[arg(long, requires = "patches")]
    pub patch: Option<usize>,
}

impl SelectionOptions {
    pub fn languages(&self, config: &Config) -> Vec<String> {
        self.languages
            .clone()
            .unwrap_or_else(|| config.download.languages.clone())
    }

    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| config.download.output_dir())
    }
}

/// Fetch the manifest, showing a spinner while waiting
pub fn fetch_manifest(config: &Config) -> Result<ManifestDocument> {
    let client = ManifestClient::from_config(&config.manifest)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message("Fetching game manifest...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let manifest = client.fetch();
    spinner.finish_and_clear();

    Ok(manifest?)
}

/// Walk the user through game, channel and version selection, then resolve
pub fn resolve_selection(options: &SelectionOptions, config: &Config) -> Result<Resolution> {
    let manifest = fetch_manifest(config)?;
    let resolver = CatalogResolver::new(&manifest);

    let game = match &options.game {
        Some(id) => resolver.find_game(id)?,
        None => {
            let names_path = config.name_index_path()?;
            let names = GameNameIndex::load(&names_path)?;
            loop {
                let id = prompt::select_game(&names)?;
                match resolver.find_game(&id) {
                    Ok(game) => break game,
                    Err(e) if e.is_recoverable() => {
                        println!("{}", e);
                        println!("The game list may be outdated; run 'hypdl game-list' to refresh it.");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    };

    let track = match (options.channel, &game.pre_download_channel) {
        (_, None) | (ChannelArg::Main, _) => TrackPreference::Main,
        (ChannelArg::PreDownload, Some(_)) => TrackPreference::PreDownload,
        (ChannelArg::Ask, Some(_)) => {
            if prompt::yes_no("Pre-download available. Pre-download? (Y/n) ", true)? {
                TrackPreference::PreDownload
            } else {
                TrackPreference::Main
            }
        }
    };

    let version = if options.patches {
        let (_, channel) = select_channel(game, track);
        if channel.patch_versions.is_empty() {
            anyhow::bail!("No patches are available for game '{}'", game.id);
        }

        let labels: Vec<String> = channel
            .patch_versions
            .iter()
            .enumerate()
            .map(|(i, v)| format!("({}) {}", i + 1, v.version_label))
            .collect();
        println!("Available Versions:\n=> {}", labels.join("\n=> "));

        let mut preset = options.patch;
        loop {
            let index = match preset.take() {
                Some(index) => index,
                None => prompt::number("Select current version: ")?,
            };
            match select_patch(channel, index) {
                Ok(_) => {
                    println!("Selected: {}\n", labels[index - 1]);
                    break VersionMode::Patches(index);
                }
                Err(e) if e.is_recoverable() => println!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
    } else {
        VersionMode::Major
    };

    let selection = Selection::new(game.id.clone())
        .track(track)
        .version(version)
        .groups(options.types.groups())
        .languages(options.languages(config));

    let resolution = resolver
        .resolve(&selection)
        .with_context(|| format!("Failed to resolve packages for '{}'", game.id))?;

    for notice in &resolution.notices {
        println!("\nNOTICE: {}", notice);
    }
    if resolution.channel == ChannelKind::PreDownload {
        println!("\nChannel: pre-download");
    }
    println!("\nVersion: {}\n", resolution.version_label);

    Ok(resolution)
}

/// Byte progress bar that switches to a new bar whenever the file name changes
pub fn create_progress_callback(prefix: &'static str) -> (ProgressCallback, Arc<Mutex<Option<ProgressBar>>>) {
    let current: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    let current_clone = current.clone();

    let callback: ProgressCallback = Arc::new(move |name: &str, position: u64, total: u64| {
        let Ok(mut guard) = current_clone.lock() else {
            return;
        };

        let message = format!("{}{}", prefix, name);
        let needs_new = match guard.as_ref() {
            Some(bar) => bar.message() != message,
            None => true,
        };

        if needs_new {
            if let Some(previous) = guard.take() {
                previous.finish();
            }
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_message(message);
            *guard = Some(bar);
        }

        if let Some(bar) = guard.as_ref() {
            if total > 0 {
                bar.set_length(total);
            }
            bar.set_position(position);
        }
    });

    (callback, current)
}

/// Finish whatever bar is still active
pub fn finish_progress(current: &Arc<Mutex<Option<ProgressBar>>>) {
    if let Ok(mut guard) = current.lock() {
        if let Some(bar) = guard.take() {
            bar.finish();
        }
    }
}
