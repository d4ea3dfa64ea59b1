//! Launcher manifest data model
//!
//! The remote endpoint returns one JSON document describing every game, its
//! release channels, versions and package files. Only the fields needed to
//! resolve downloads are read; everything else is ignored.
//!
//! The wire shape is decoded into private `Raw*` structs and then converted
//! into the typed model below. Package entries are classified once during
//! that conversion: an entry carrying a `language` key is an audio package,
//! anything else is game data.
//!
//! # Examples
//!
//! ```
//! use hypdl::ManifestDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = r#"{
//!     "retcode": 0,
//!     "message": "OK",
//!     "data": { "game_packages": [] }
//! }"#;
//! let manifest = ManifestDocument::from_json(json)?;
//! assert!(manifest.games.is_empty());
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};

/// Package group as named by the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    /// `game_pkgs`
    GameData,
    /// `audio_pkgs`
    Audio,
}

impl GroupKind {
    /// Traversal order used when resolving downloads
    pub const ALL: [GroupKind; 2] = [GroupKind::GameData, GroupKind::Audio];

    pub fn manifest_key(&self) -> &'static str {
        match self {
            GroupKind::GameData => "game_pkgs",
            GroupKind::Audio => "audio_pkgs",
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.manifest_key())
    }
}

/// Downloadable file as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub url: String,
    pub compressed_size: u64,
    pub decompressed_size: u64,
    /// Hex MD5 as published by the launcher
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageItem {
    GameData(PackageFile),
    Audio { language: String, file: PackageFile },
}

impl PackageItem {
    pub fn file(&self) -> &PackageFile {
        match self {
            PackageItem::GameData(file) => file,
            PackageItem::Audio { file, .. } => file,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            PackageItem::GameData(_) => None,
            PackageItem::Audio { language, .. } => Some(language),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNode {
    pub version_label: String,
    pub game_pkgs: Vec<PackageItem>,
    pub audio_pkgs: Vec<PackageItem>,
}

impl VersionNode {
    pub fn group(&self, kind: GroupKind) -> &[PackageItem] {
        match kind {
            GroupKind::GameData => &self.game_pkgs,
            GroupKind::Audio => &self.audio_pkgs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseChannel {
    pub major_version: VersionNode,
    pub patch_versions: Vec<VersionNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    pub id: String,
    pub business_tag: String,
    pub main_channel: ReleaseChannel,
    pub pre_download_channel: Option<ReleaseChannel>,
}

impl GameEntry {
    /// First game-data file of the main build, used to recognise a game by file name
    pub fn sample_file(&self) -> Option<&PackageFile> {
        self.main_channel
            .major_version
            .game_pkgs
            .first()
            .map(PackageItem::file)
    }
}

/// Parsed manifest snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    pub games: Vec<GameEntry>,
}

impl ManifestDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        let response: RawResponse = serde_json::from_str(json)
            .map_err(|e| Error::InvalidManifest(format!("Failed to parse manifest: {}", e)))?;
        Self::from_raw(response)
    }

    fn from_raw(response: RawResponse) -> Result<Self> {
        if response.retcode != 0 {
            return Err(Error::InvalidManifest(format!(
                "Launcher API returned retcode {}: {}",
                response.retcode, response.message
            )));
        }

        let data = response
            .data
            .ok_or_else(|| Error::InvalidManifest("Response has no data".to_string()))?;

        let games = data
            .game_packages
            .into_iter()
            .map(convert_game)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { games })
    }

    pub fn game(&self, id: &str) -> Option<&GameEntry> {
        self.games.iter().find(|game| game.id == id)
    }
}

fn convert_game(raw: RawGamePackage) -> Result<GameEntry> {
    let id = raw.game.id;

    let main_channel = raw
        .main
        .and_then(convert_channel)
        .ok_or_else(|| Error::InvalidManifest(format!("Game '{}' has no main build", id)))?;

    // A pre_download object with a null major is how the launcher says "none"
    let pre_download_channel = raw.pre_download.and_then(convert_channel);

    Ok(GameEntry {
        id,
        business_tag: raw.game.biz,
        main_channel,
        pre_download_channel,
    })
}

fn convert_channel(raw: RawChannel) -> Option<ReleaseChannel> {
    let major_version = convert_version(raw.major?);
    let patch_versions = raw.patches.into_iter().map(convert_version).collect();

    Some(ReleaseChannel {
        major_version,
        patch_versions,
    })
}

fn convert_version(raw: RawVersion) -> VersionNode {
    VersionNode {
        version_label: raw.version,
        game_pkgs: raw.game_pkgs.into_iter().map(convert_package).collect(),
        audio_pkgs: raw.audio_pkgs.into_iter().map(convert_package).collect(),
    }
}

fn convert_package(raw: RawPackage) -> PackageItem {
    let file = PackageFile {
        url: raw.url,
        compressed_size: raw.size,
        decompressed_size: raw.decompressed_size,
        checksum: raw.md5,
    };

    // Key presence decides the kind; `"language": null` is still audio
    match raw.language {
        Some(language) => PackageItem::Audio {
            language: language.unwrap_or_default(),
            file,
        },
        None => PackageItem::GameData(file),
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    message: String,
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    #[serde(default)]
    game_packages: Vec<RawGamePackage>,
}

#[derive(Debug, Deserialize)]
struct RawGamePackage {
    game: RawGame,
    main: Option<RawChannel>,
    #[serde(default)]
    pre_download: Option<RawChannel>,
}

#[derive(Debug, Deserialize)]
struct RawGame {
    id: String,
    #[serde(default)]
    biz: String,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    major: Option<RawVersion>,
    #[serde(default)]
    patches: Vec<RawVersion>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    version: String,
    #[serde(default)]
    game_pkgs: Vec<RawPackage>,
    #[serde(default)]
    audio_pkgs: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    url: String,
    #[serde(deserialize_with = "size_from_string_or_number")]
    size: u64,
    #[serde(default, deserialize_with = "size_from_string_or_number")]
    decompressed_size: u64,
    md5: String,
    #[serde(default, deserialize_with = "present")]
    language: Option<Option<String>>,
}

/// Wraps any value that is present in the document, `null` included
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Sizes are published as decimal strings, but plain numbers are accepted too
fn size_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) if s.trim().is_empty() => Ok(0),
        Size::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid size '{}'", s))),
    }
}
