//! Manifest navigation: game → channel → version → filtered package list
//!
//! [`CatalogResolver::resolve`] is a pure function of the manifest and the
//! [`Selection`]: it never prompts and never touches the network. Interactive
//! callers drive the individual steps ([`CatalogResolver::find_game`],
//! [`select_channel`], [`select_patch`]) themselves and re-ask on the
//! recoverable errors they return.
//!
//! # Examples
//!
//! ```no_run
//! use hypdl::{CatalogResolver, GroupKind, ManifestClient, Selection, TrackPreference, VersionMode};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = ManifestClient::new(hypdl::config::DEFAULT_MANIFEST_URL, Duration::from_secs(10), 3)?
//!     .fetch()?;
//! let resolver = CatalogResolver::new(&manifest);
//!
//! let selection = Selection::new("4ziysqXOQ8")
//!     .track(TrackPreference::Main)
//!     .version(VersionMode::Major)
//!     .groups([GroupKind::GameData, GroupKind::Audio])
//!     .languages(["en-us"]);
//!
//! let resolution = resolver.resolve(&selection)?;
//! println!("{} files, {}", resolution.descriptors.len(), hypdl::format_bytes(resolution.totals.compressed()));
//! # Ok(())
//! # }
//! ```

use crate::manifest::{GameEntry, GroupKind, ManifestDocument, PackageItem, ReleaseChannel, VersionNode};
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Resolved unit of work handed to the transfer engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub url: String,
    pub compressed_size: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPreference {
    Main,
    /// Use the pre-download channel when the game has one
    PreDownload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Main,
    PreDownload,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Main => f.write_str("main"),
            ChannelKind::PreDownload => f.write_str("pre-download"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMode {
    /// Full build of the channel
    Major,
    /// Patch from the given 1-based entry of the channel's patch list
    Patches(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Pre-download chosen without patch mode; the full upcoming build is used
    PreDownloadFullBuild,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::PreDownloadFullBuild => f.write_str(
                "To select patches for a specific update version, add the -p/--patches argument. \
                 Currently working with the full game.",
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub game_id: String,
    pub track: TrackPreference,
    pub version: VersionMode,
    pub groups: BTreeSet<GroupKind>,
    pub languages: BTreeSet<String>,
}

impl Selection {
    /// Main channel, full build, every group, English audio
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            track: TrackPreference::Main,
            version: VersionMode::Major,
            groups: GroupKind::ALL.into_iter().collect(),
            languages: BTreeSet::from(["en-us".to_string()]),
        }
    }

    pub fn track(mut self, track: TrackPreference) -> Self {
        self.track = track;
        self
    }

    pub fn version(mut self, version: VersionMode) -> Self {
        self.version = version;
        self
    }

    pub fn groups(mut self, groups: impl IntoIterator<Item = GroupKind>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    pub fn languages<S: Into<String>>(mut self, languages: impl IntoIterator<Item = S>) -> Self {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }
}

/// Size accumulator for one resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeTotals {
    pub game_compressed: u64,
    pub game_decompressed: u64,
    pub audio_compressed: u64,
    pub audio_decompressed: u64,
}

impl SizeTotals {
    fn add(&mut self, item: &PackageItem) {
        let file = item.file();
        match item {
            PackageItem::GameData(_) => {
                self.game_compressed += file.compressed_size;
                self.game_decompressed += file.decompressed_size;
            }
            PackageItem::Audio { .. } => {
                self.audio_compressed += file.compressed_size;
                self.audio_decompressed += file.decompressed_size;
            }
        }
    }

    pub fn compressed(&self) -> u64 {
        self.game_compressed + self.audio_compressed
    }

    pub fn decompressed(&self) -> u64 {
        self.game_decompressed + self.audio_decompressed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub game_id: String,
    pub channel: ChannelKind,
    pub version_label: String,
    /// Included items in download order
    pub items: Vec<PackageItem>,
    pub descriptors: Vec<PackageDescriptor>,
    pub totals: SizeTotals,
    pub notices: Vec<Notice>,
}

pub struct CatalogResolver<'a> {
    manifest: &'a ManifestDocument,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(manifest: &'a ManifestDocument) -> Self {
        Self { manifest }
    }

    pub fn find_game(&self, game_id: &str) -> Result<&'a GameEntry> {
        self.manifest
            .game(game_id)
            .ok_or_else(|| Error::GameNotFound(game_id.to_string()))
    }

    pub fn resolve(&self, selection: &Selection) -> Result<Resolution> {
        let game = self.find_game(&selection.game_id)?;

        let (channel_kind, channel) = select_channel(game, selection.track);

        let mut notices = Vec::new();
        if channel_kind == ChannelKind::PreDownload && selection.version == VersionMode::Major {
            notices.push(Notice::PreDownloadFullBuild);
        }

        let version = match selection.version {
            VersionMode::Major => &channel.major_version,
            VersionMode::Patches(index) => select_patch(channel, index)?,
        };

        let (items, totals) = filter_packages(version, &selection.groups, &selection.languages);
        let descriptors = items.iter().map(descriptor_for).collect();

        Ok(Resolution {
            game_id: game.id.clone(),
            channel: channel_kind,
            version_label: version.version_label.clone(),
            items,
            descriptors,
            totals,
            notices,
        })
    }
}

/// Pick the pre-download channel when requested and present, else main
pub fn select_channel(game: &GameEntry, track: TrackPreference) -> (ChannelKind, &ReleaseChannel) {
    match (track, &game.pre_download_channel) {
        (TrackPreference::PreDownload, Some(channel)) => (ChannelKind::PreDownload, channel),
        _ => (ChannelKind::Main, &game.main_channel),
    }
}

/// Look up a 1-based patch entry
pub fn select_patch(channel: &ReleaseChannel, index: usize) -> Result<&VersionNode> {
    let available = channel.patch_versions.len();
    if index == 0 || index > available {
        return Err(Error::VersionNotFound { index, available });
    }
    Ok(&channel.patch_versions[index - 1])
}

/// Collect the requested groups' items, keeping audio only for the given languages
///
/// Groups are visited in [`GroupKind::ALL`] order and items in manifest
/// order, so the result is stable for a given manifest and selection.
pub fn filter_packages(
    version: &VersionNode,
    groups: &BTreeSet<GroupKind>,
    languages: &BTreeSet<String>,
) -> (Vec<PackageItem>, SizeTotals) {
    let mut totals = SizeTotals::default();
    let mut items = Vec::new();

    for kind in GroupKind::ALL {
        if !groups.contains(&kind) {
            continue;
        }

        for item in version.group(kind) {
            let included = match item.language() {
                None => true,
                Some(language) => languages.contains(language),
            };
            if included {
                totals.add(item);
                items.push(item.clone());
            }
        }
    }

    (items, totals)
}

pub fn descriptor_for(item: &PackageItem) -> PackageDescriptor {
    let file = item.file();
    PackageDescriptor {
        url: file.url.clone(),
        compressed_size: file.compressed_size,
        checksum: file.checksum.clone(),
    }
}

/// Human-readable size with two decimals
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, UNITS[unit])
}
