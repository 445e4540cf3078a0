use crate::{HistoryError, HistoryResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk shapes accepted when loading
///
/// Current runs write the object form. A bare array of identifiers, as written by
/// older versions, is still read; its entries simply have no known location.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    List(Vec<String>),
    Wrapped {
        downloaded: Vec<String>,
        #[serde(default)]
        locations: HashMap<String, PathBuf>,
    },
}

/// Persisted form, sorted for stable diffs
#[derive(Serialize)]
struct PersistedHistory<'a> {
    downloaded: Vec<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    locations: BTreeMap<&'a str, &'a Path>,
}

/// Persistent set of identifiers of files downloaded by earlier runs
///
/// Alongside each identifier the store may remember where its file was placed,
/// relative to the download folder. Exclusively owned by the orchestrator for the
/// duration of a run.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    identifiers: HashSet<String>,
    locations: HashMap<String, PathBuf>,
}

impl HistoryStore {
    /// Creates an empty store that will persist to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            identifiers: HashSet::new(),
            locations: HashMap::new(),
        }
    }

    /// Loads the store from `path`
    ///
    /// A missing file yields an empty store. Unparseable content is reported as
    /// [`HistoryError::Corrupt`] instead of being discarded.
    pub fn load(path: &Path) -> HistoryResult<Self> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No history file at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(HistoryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let parsed: HistoryFile =
            serde_json::from_slice(&content).map_err(|source| HistoryError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let (identifiers, mut locations): (HashSet<String>, HashMap<String, PathBuf>) =
            match parsed {
                HistoryFile::List(ids) => (ids.into_iter().collect(), HashMap::new()),
                HistoryFile::Wrapped {
                    downloaded,
                    locations,
                } => (downloaded.into_iter().collect(), locations),
            };
        locations.retain(|id, _| identifiers.contains(id));

        tracing::info!(
            "Loaded {} history entries from {}",
            identifiers.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            identifiers,
            locations,
        })
    }

    /// Returns true if the identifier was recorded by this or an earlier run
    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Where the file for `identifier` was last placed, relative to the download folder
    ///
    /// None for unknown identifiers and for entries loaded from the bare-array form.
    pub fn location_of(&self, identifier: &str) -> Option<&Path> {
        self.locations.get(identifier).map(PathBuf::as_path)
    }

    /// Adds an identifier and persists the whole store immediately
    ///
    /// Returns `Ok(false)` when the identifier was already present; nothing is written
    /// in that case. If persisting fails the identifier is removed again, so memory
    /// never claims more than the file on disk.
    pub fn record(&mut self, identifier: &str) -> HistoryResult<bool> {
        self.insert(identifier, None)
    }

    /// Like [`record`](Self::record), also remembering where the file was placed
    ///
    /// A changed location for a known identifier is persisted too, but still returns
    /// `Ok(false)`.
    pub fn record_at(&mut self, identifier: &str, location: &Path) -> HistoryResult<bool> {
        self.insert(identifier, Some(location))
    }

    fn insert(&mut self, identifier: &str, location: Option<&Path>) -> HistoryResult<bool> {
        let added = self.identifiers.insert(identifier.to_string());

        // Some(previous) when the location changed
        let replaced = match location {
            Some(location) if self.location_of(identifier) != Some(location) => Some(
                self.locations
                    .insert(identifier.to_string(), location.to_path_buf()),
            ),
            _ => None,
        };

        if !added && replaced.is_none() {
            return Ok(false);
        }

        if let Err(e) = self.save() {
            if added {
                self.identifiers.remove(identifier);
            }
            match replaced {
                Some(Some(previous)) => {
                    self.locations.insert(identifier.to_string(), previous);
                }
                Some(None) => {
                    self.locations.remove(identifier);
                }
                None => {}
            }
            return Err(e);
        }

        tracing::debug!("Recorded {} in history", identifier);
        Ok(added)
    }

    /// Writes the store to its own path
    pub fn save(&self) -> HistoryResult<()> {
        self.save_to(&self.path)
    }

    /// Writes the store to `path` atomically
    ///
    /// The content goes to a temporary sibling file which is synced and then renamed
    /// over the target, so readers only ever see a complete file.
    pub fn save_to(&self, path: &Path) -> HistoryResult<()> {
        let io_err = |source: std::io::Error| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        };

        let persisted = PersistedHistory {
            downloaded: self.sorted(),
            locations: self
                .locations
                .iter()
                .map(|(id, location)| (id.as_str(), location.as_path()))
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&persisted)?;

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(io_err)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history".to_string());
        let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

        let written = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, path)
        })();

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        Ok(())
    }

    /// Identifiers in sorted order, as persisted
    pub fn sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.identifiers.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Path the store persists to
    pub fn path(&self) -> &Path {
        &self.path
    }
}
