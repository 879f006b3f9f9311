//! Durable prune ledger.
//!
//! Records when each destination project was first seen without a matching
//! source repository. An entry exists only while its key is missing from the
//! source. The file is read once at job start and written once at job end,
//! atomically (temp file in the same directory, then rename).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};
use crate::identity::RepoKey;

/// Default ledger file name.
pub const DEFAULT_LEDGER_FILE: &str = "prune_state.json";

/// One missing repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneEntry {
    pub owner: String,
    pub name: String,
    pub first_missing_at: DateTime<Utc>,
}

impl PruneEntry {
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.name)
    }

    /// Time elapsed since the key was first seen missing.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.first_missing_at
    }
}

/// In-memory ledger, keyed by `owner/name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ledger {
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, PruneEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a ledger file. Every map key must match the entry it holds.
    pub fn from_json(contents: &[u8]) -> std::result::Result<Self, String> {
        let ledger: Ledger = serde_json::from_slice(contents).map_err(|e| e.to_string())?;
        if let Some((stored, entry)) = ledger
            .entries
            .iter()
            .find(|(stored, entry)| **stored != entry.key().to_string())
        {
            return Err(format!(
                "entry stored under `{stored}` is for `{}`",
                entry.key()
            ));
        }
        Ok(ledger)
    }

    pub fn get(&self, key: &RepoKey) -> Option<&PruneEntry> {
        self.entries.get(&key.to_string())
    }

    /// Record `key` as missing from `now`, keeping an existing timestamp.
    pub fn mark_missing(&mut self, key: &RepoKey, now: DateTime<Utc>) -> &PruneEntry {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| PruneEntry {
                owner: key.owner.clone(),
                name: key.name.clone(),
                first_missing_at: now,
            })
    }

    /// Drop the entry for `key`, returning it if there was one.
    pub fn remove(&mut self, key: &RepoKey) -> Option<PruneEntry> {
        self.entries.remove(&key.to_string())
    }

    /// Keep only the entries for which `keep` returns true. Returns the
    /// removed entries.
    pub fn retain(&mut self, mut keep: impl FnMut(&PruneEntry) -> bool) -> Vec<PruneEntry> {
        let removed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !keep(e))
            .map(|(k, _)| k.clone())
            .collect();
        removed
            .into_iter()
            .filter_map(|k| self.entries.remove(&k))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PruneEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A loaded ledger, plus the corruption that forced an empty start, if any.
#[derive(Debug)]
pub struct LoadedLedger {
    pub ledger: Ledger,
    pub corrupt: Option<MirrorError>,
}

/// Ledger file location and persistence.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt ledger is moved aside.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    /// Load the ledger. A missing file is an empty ledger. A file that does
    /// not parse as a ledger (including the old flat `name -> timestamp`
    /// layout) is moved to [`backup_path`](Self::backup_path) and replaced by an
    /// empty ledger; the parse failure is returned alongside.
    pub fn load(&self) -> Result<LoadedLedger> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedLedger {
                    ledger: Ledger::new(),
                    corrupt: None,
                });
            }
            Err(source) => {
                return Err(MirrorError::Ledger {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match Ledger::from_json(&contents) {
            Ok(ledger) => Ok(LoadedLedger {
                ledger,
                corrupt: None,
            }),
            Err(message) => {
                let backup = self.backup_path();
                if let Err(rename_err) = std::fs::rename(&self.path, &backup) {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %rename_err,
                        "Could not move corrupt ledger aside"
                    );
                }
                tracing::error!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %message,
                    "Prune ledger is corrupt, starting from an empty ledger"
                );
                Ok(LoadedLedger {
                    ledger: Ledger::new(),
                    corrupt: Some(MirrorError::LedgerCorrupt {
                        path: self.path.clone(),
                        message,
                    }),
                })
            }
        }
    }

    /// Persist atomically, stamping `saved_at`.
    pub fn save(&self, ledger: &mut Ledger, now: DateTime<Utc>) -> Result<()> {
        let io_err = |source| MirrorError::Ledger {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        ledger.saved_at = Some(now);
        let json = serde_json::to_vec_pretty(ledger).map_err(|e| io_err(e.into()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        tracing::debug!(path = %self.path.display(), entries = ledger.len(), "Saved prune ledger");
        Ok(())
    }
}
