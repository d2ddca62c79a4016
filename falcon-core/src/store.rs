//! Local persistence store
//!
//! Two JSON documents live in the falcon directory:
//! - `config.json` - the global [`FalconConfig`] (a local `.falconrc` may override it)
//! - `history.json` - the [`History`] log and cost counters
//!
//! Every write goes through [`atomic_write`]: the document is serialized to a
//! temp file beside the target, then renamed over it. Reads never fail: a
//! missing or malformed document is replaced by its default.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::{self, ConfigPatch, FalconConfig};
use crate::error::{Error, Result};
use crate::types::{Generation, History};

const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "history.json";
const LOGS_DIR: &str = "logs";

/// Handle on the falcon directory and the local override file.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
    local_config: PathBuf,
}

impl Store {
    /// Open the store at `~/.falcon`, with `./.falconrc` as the local override.
    pub fn open_default() -> Result<Self> {
        Self::open(
            config::falcon_dir(),
            PathBuf::from(config::LOCAL_CONFIG_FILE),
        )
    }

    /// Open a store over an explicit directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>, local_config: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            dir: dir.into(),
            local_config: local_config.into(),
        };
        ensure_dir(&store.dir)?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn local_config_path(&self) -> &Path {
        &self.local_config
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join(LOGS_DIR)
    }

    // ============================================
    // Config
    // ============================================

    /// Defaults, then the global file, then the local override.
    pub fn load_config(&self) -> FalconConfig {
        let mut config = FalconConfig::default();
        for path in [self.config_path(), self.local_config.clone()] {
            if let Some(patch) = read_document::<ConfigPatch>(&path) {
                config = config.apply(&patch);
            }
        }
        let unknown = config.unknown_models();
        if !unknown.is_empty() {
            tracing::warn!(models = ?unknown, "Config references unknown models");
        }
        config
    }

    /// Merge `patch` over the global file and write the full result.
    ///
    /// The local override is never written. Returns the saved global config.
    pub fn save_config(&self, patch: &ConfigPatch) -> Result<FalconConfig> {
        let path = self.config_path();
        let existing = read_document::<ConfigPatch>(&path).unwrap_or_default();
        let merged = FalconConfig::default().apply(&existing).apply(patch);
        write_document(&path, &merged)?;
        tracing::info!(path = %path.display(), "Saved config");
        Ok(merged)
    }

    // ============================================
    // History
    // ============================================

    /// Load history, resetting the session and daily counters on a new day.
    pub fn load_history(&self) -> History {
        self.load_history_at(today())
    }

    pub fn load_history_at(&self, today: NaiveDate) -> History {
        let mut history =
            read_document::<History>(&self.history_path()).unwrap_or_else(|| History::empty(today));
        if history.roll_over(today) {
            tracing::debug!(%today, "New day, cost counters reset");
        }
        history
    }

    /// Record a generation and persist the history. Returns the saved document.
    pub fn append_generation(&self, generation: Generation) -> Result<History> {
        self.append_generation_at(generation, today())
    }

    pub fn append_generation_at(&self, generation: Generation, today: NaiveDate) -> Result<History> {
        let mut history = self.load_history_at(today);
        tracing::info!(
            id = %generation.id,
            model = %generation.model,
            cost = generation.cost,
            "Recording generation"
        );
        history.record(generation, today);
        write_document(&self.history_path(), &history)?;
        Ok(history)
    }

    /// Most recent generation, if any.
    pub fn last_generation(&self) -> Option<Generation> {
        self.load_history().generations.pop()
    }
}

/// Current calendar day in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;
    Ok(())
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable document, using defaults");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed document, using defaults");
            None
        }
    }
}

fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(dir)?;
    }
    let mut json = serde_json::to_vec_pretty(doc)?;
    json.push(b'\n');
    atomic_write(path, &json)
}

/// Write `contents` to `path` via a temp file in the same directory and a rename.
///
/// The temp file is `<name>.<random>.tmp`, owner-only on unix. It is removed if
/// any step fails; the target is either the old or the new content.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let staged = stage(path, contents)?;
    staged.persist(path).map_err(|e| Error::Persistence {
        path: path.to_path_buf(),
        // Dropping `e.file` deletes the temp file
        source: e.error,
    })?;
    Ok(())
}

/// Write `contents` to a fresh temp file next to `path`, without renaming.
fn stage(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let persistence = |source| Error::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        "{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(persistence)?;
    tmp.write_all(contents).map_err(persistence)?;
    tmp.as_file().sync_all().map_err(persistence)?;
    Ok(tmp)
}
