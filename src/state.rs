//! Durable dedup state — the set of already-downloaded entry URLs.
//!
//! Persisted as flat text, one URL per line, `\n`-terminated, no header. The
//! format is an external interface: other tools (and older installs) read
//! and seed it directly, so it stays a plain line-per-URL file rather than a
//! database.

use crate::error::Result;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Minimum length for a persisted line to be accepted as a URL on load.
/// Guards against blank lines and stray fragments; real torrent URLs are
/// comfortably longer.
pub const MIN_URL_LEN: usize = 20;

/// Insertion-ordered set of previously-downloaded URLs, backed by a flat
/// text file.
///
/// Loaded once at startup, mutated append-only as entries succeed, and
/// rewritten wholesale by [`save`](DedupStore::save). Not safe for
/// concurrent mutation — a single owner serializes all writes.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    urls: Vec<String>,
    index: HashSet<String>,
}

impl DedupStore {
    /// Load the store from `path`.
    ///
    /// Lines whose length does not exceed [`MIN_URL_LEN`] are skipped (the
    /// trailing newline is stripped first); a partially-garbled file loads
    /// its valid lines rather than failing wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::error::Error::Io) when the file cannot
    /// be opened or read. A missing state file is fatal by design: starting
    /// with a silently-empty set would re-download the entire history. Use
    /// [`create`](DedupStore::create) to bootstrap a fresh install.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;

        let mut store = Self {
            path,
            urls: Vec::new(),
            index: HashSet::new(),
        };

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.len() > MIN_URL_LEN {
                store.insert(line);
            } else if !line.trim().is_empty() {
                debug!(line = %line, "skipping short line in state file");
            }
        }

        info!(
            restored = store.urls.len(),
            path = %store.path.display(),
            "restored dedup state"
        );
        Ok(store)
    }

    /// Create an empty store, writing an empty state file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::error::Error::Io) when the file cannot
    /// be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        File::create(&path)?;
        Ok(Self {
            path,
            urls: Vec::new(),
            index: HashSet::new(),
        })
    }

    /// Rewrite the state file with the current contents, one URL per line,
    /// in insertion order. Prior contents are truncated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::error::Error::Io) when the file cannot
    /// be opened or a write fails partway. A partial file on disk is an
    /// accepted risk — there is no atomic rename; a crash mid-save loses at
    /// most the entries since the last successful save, which the remote
    /// side absorbs via its duplicate detection.
    pub fn save(&self) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for url in &self.urls {
            writer.write_all(url.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(
            saved = self.urls.len(),
            path = %self.path.display(),
            "saved dedup state"
        );
        Ok(())
    }

    /// Whether `url` has already been recorded
    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    /// Record `url`. Returns false (and keeps the original insertion
    /// position) when it was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.urls.push(url);
        true
    }

    /// Number of recorded URLs
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// True when no URLs are recorded
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Recorded URLs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Path of the backing state file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
