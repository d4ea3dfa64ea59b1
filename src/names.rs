//! Game name index (`gamelist.json`)
//!
//! The launcher identifies games only by opaque ids. The index maps each id
//! to a label chosen by the user during `hypdl game-list`, and preserves the
//! order in which the ids were named.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const NAME_INDEX_FILE: &str = "gamelist.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameNameIndex {
    entries: Vec<(String, String)>,
}

impl GameNameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NameIndexMissing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let map: Map<String, Value> = serde_json::from_str(&content)?;

        let mut index = Self::new();
        for (id, label) in map {
            let label = match label {
                Value::String(s) => s,
                other => {
                    return Err(Error::Other(format!(
                        "Invalid label for game '{}' in {}: {}",
                        id,
                        path.display(),
                        other
                    )))
                }
            };
            index.insert(id, label);
        }

        Ok(index)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(id, label)| (id.clone(), Value::String(label.clone())))
            .collect();

        let content = serde_json::to_string_pretty(&map)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Insert or relabel a game id, keeping its original position
    pub fn insert(&mut self, id: impl Into<String>, label: impl Into<String>) {
        let id = id.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((id, label)),
        }
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, label)| label.as_str())
    }

    /// Entries in index order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
