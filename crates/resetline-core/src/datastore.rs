use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Local string-keyed completion flags, one JSON object in `done.json`.
///
/// Keys come from [`crate::key::occurrence_key`]; the store itself knows
/// nothing about events or occurrences.
#[derive(Debug)]
pub struct CompletionStore {
    pub data_dir: PathBuf,
    pub done_path: PathBuf,
    flags: BTreeMap<String, bool>,
}

impl CompletionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let done_path = data_dir.join("done.json");
        if !done_path.exists() {
            fs::write(&done_path, "{}")?;
        }

        let flags = load_flags(&done_path).context("failed to load done.json")?;

        info!(
            data_dir = %data_dir.display(),
            done = %done_path.display(),
            flags = flags.len(),
            "opened completion store"
        );

        Ok(Self {
            data_dir,
            done_path,
            flags,
        })
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.get(key).unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub fn set(&mut self, key: &str, done: bool) -> anyhow::Result<()> {
        self.flags.insert(key.to_string(), done);
        self.save()
    }

    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, key: &str) -> anyhow::Result<bool> {
        let existed = self.flags.remove(key).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// Flips a flag the way a click on a timeline segment does: a present
    /// key is removed, an absent one is set to `true`. Returns the new state.
    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self, key: &str) -> anyhow::Result<bool> {
        if self.flags.contains_key(key) {
            self.remove(key)?;
            Ok(false)
        } else {
            self.set(key, true)?;
            Ok(true)
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn save(&self) -> anyhow::Result<()> {
        save_json_atomic(&self.done_path, &self.flags).context("failed to save done.json")
    }
}

#[tracing::instrument(skip(path))]
fn load_flags(path: &Path) -> anyhow::Result<BTreeMap<String, bool>> {
    debug!(file = %path.display(), "loading completion flags");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let flags: BTreeMap<String, bool> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    debug!(count = flags.len(), "loaded completion flags");
    Ok(flags)
}

#[tracing::instrument(skip(path, flags))]
fn save_json_atomic(path: &Path, flags: &BTreeMap<String, bool>) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = flags.len(), "saving completion flags atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, flags)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
