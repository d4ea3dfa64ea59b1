//! hypdl - Game launcher package downloader
//!
//! hypdl reads a game launcher's package manifest, works out which archive
//! files make up a given game build (or patch), and downloads them with
//! resume support and MD5 verification:
//!
//! - Manifest fetching with a bounded retry budget
//! - Main and pre-download release channels, full builds or patches
//! - Game-data and per-language audio package filtering
//! - Resumable transfers through `Range` requests and `.tmp` partial files
//! - Streaming checksum verification, usable on its own without downloading
//!
//! # Examples
//!
//! ```no_run
//! use hypdl::{CatalogResolver, Config, ManifestClient, Selection, TransferEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let manifest = ManifestClient::from_config(&config.manifest)?.fetch()?;
//!
//! let resolution = CatalogResolver::new(&manifest).resolve(&Selection::new("4ziysqXOQ8"))?;
//!
//! let engine = TransferEngine::from_config(&config.download)?;
//! for file in engine.transfer_all(&resolution.descriptors)? {
//!     let ok = hypdl::integrity::verify(&file.path, &file.checksum, None).unwrap_or(false);
//!     println!("{} {}", file.path.display(), if ok { "OK" } else { "FAILED" });
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`manifest`] - Launcher manifest data model and parsing
//! - [`client`] - Manifest fetching with retries
//! - [`catalog`] - Game/channel/version selection and package filtering
//! - [`names`] - Local game name index (`gamelist.json`)
//! - [`integrity`] - MD5 digests and verification
//! - [`transfer`] - Resumable downloads
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod integrity;
pub mod manifest;
pub mod names;
pub mod transfer;

pub use catalog::{
    format_bytes, CatalogResolver, ChannelKind, Notice, PackageDescriptor, Resolution, Selection,
    SizeTotals, TrackPreference, VersionMode,
};
pub use client::ManifestClient;
pub use config::Config;
pub use error::{Error, Result};
pub use integrity::Verification;
pub use manifest::{
    GameEntry, GroupKind, ManifestDocument, PackageFile, PackageItem, ReleaseChannel, VersionNode,
};
pub use names::GameNameIndex;
pub use transfer::{
    InterruptCallback, InterruptChoice, ProgressCallback, TransferEngine, TransferStatus,
    TransferredFile,
};
