//! Test utilities shared by the hypdl integration tests.
//!
//! Provides manifest JSON builders, deterministic package payloads and an
//! isolated workspace (config dir + output dir) for CLI runs.

#![allow(dead_code)]

use md5::{Digest, Md5};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic, non-repeating payload of `len` bytes
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u32).wrapping_mul(31).wrapping_add(seed as u32) % 251) as u8)
        .collect()
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

/// One entry of `game_pkgs` / `audio_pkgs`
#[derive(Debug, Clone)]
pub struct MockPackage {
    pub url: String,
    pub size: u64,
    pub md5: String,
    pub language: Option<String>,
}

impl MockPackage {
    pub fn game(url: impl Into<String>, body: &[u8]) -> Self {
        Self {
            url: url.into(),
            size: body.len() as u64,
            md5: md5_hex(body),
            language: None,
        }
    }

    pub fn audio(url: impl Into<String>, body: &[u8], language: &str) -> Self {
        Self {
            language: Some(language.to_string()),
            ..Self::game(url, body)
        }
    }

    fn to_json(&self) -> Value {
        let mut value = json!({
            "url": self.url,
            "size": self.size.to_string(),
            "decompressed_size": (self.size * 2).to_string(),
            "md5": self.md5,
        });
        if let Some(language) = &self.language {
            value["language"] = json!(language);
        }
        value
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockVersion {
    pub version: String,
    pub game_pkgs: Vec<MockPackage>,
    pub audio_pkgs: Vec<MockPackage>,
}

impl MockVersion {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn with_game(mut self, package: MockPackage) -> Self {
        self.game_pkgs.push(package);
        self
    }

    pub fn with_audio(mut self, package: MockPackage) -> Self {
        self.audio_pkgs.push(package);
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "version": self.version,
            "game_pkgs": self.game_pkgs.iter().map(MockPackage::to_json).collect::<Vec<_>>(),
            "audio_pkgs": self.audio_pkgs.iter().map(MockPackage::to_json).collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MockGame {
    pub id: String,
    pub biz: String,
    pub major: MockVersion,
    pub patches: Vec<MockVersion>,
    pub pre_download: Option<MockVersion>,
}

impl MockGame {
    pub fn new(id: &str, major: MockVersion) -> Self {
        Self {
            id: id.to_string(),
            biz: format!("{}_global", id),
            major,
            patches: Vec::new(),
            pre_download: None,
        }
    }

    pub fn with_patch(mut self, patch: MockVersion) -> Self {
        self.patches.push(patch);
        self
    }

    pub fn with_pre_download(mut self, major: MockVersion) -> Self {
        self.pre_download = Some(major);
        self
    }

    fn to_json(&self) -> Value {
        let pre_download = match &self.pre_download {
            Some(major) => json!({ "major": major.to_json(), "patches": [] }),
            None => json!({ "major": null, "patches": [] }),
        };
        json!({
            "game": { "id": self.id, "biz": self.biz },
            "main": {
                "major": self.major.to_json(),
                "patches": self.patches.iter().map(MockVersion::to_json).collect::<Vec<_>>(),
            },
            "pre_download": pre_download,
        })
    }
}

/// Full launcher response body
pub fn manifest_json(games: &[MockGame]) -> String {
    json!({
        "retcode": 0,
        "message": "OK",
        "data": {
            "game_packages": games.iter().map(MockGame::to_json).collect::<Vec<_>>(),
        }
    })
    .to_string()
}

/// Isolated config directory and output directory
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = temp_dir.path().join("config");
        let output_dir = temp_dir.path().join("downloads");

        fs::create_dir_all(&config_dir).expect("Failed to create config directory");

        Self {
            temp_dir,
            config_dir,
            output_dir,
        }
    }

    /// Write gamelist.json into the config directory
    pub fn write_name_index(&self, entries: &[(&str, &str)]) {
        let map: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(id, label)| (id.to_string(), json!(label)))
            .collect();
        fs::write(
            self.config_dir.join("gamelist.json"),
            serde_json::to_string_pretty(&map).unwrap(),
        )
        .expect("Failed to write gamelist.json");
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_dir.join("config.toml"), content).expect("Failed to write config");
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
