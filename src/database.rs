//! The compilation database: load, merge, persist.
//!
//! Entries live in a map keyed by the canonicalised source path, so a
//! re-capture of the same file within one run replaces the earlier
//! record and saves come out in a stable order.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::source;

/// One compiler invocation for one source file, in the shape C/C++
/// tooling consumes: the working directory, the file as it appeared in
/// argv, and the full argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub directory: PathBuf,
    pub file: String,
    pub arguments: Vec<String>,
}

/// Accumulates entries across one run, merged over whatever a prior run
/// left behind at the output path.
pub struct CompilationDatabase {
    entries: BTreeMap<PathBuf, Entry>,
    is_source: fn(&str) -> bool,
}

impl CompilationDatabase {
    pub fn new() -> Self {
        Self::with_source_filter(source::is_source_file)
    }

    /// The source recogniser is a plain function value so tests (and any
    /// future policy change about headers) can swap it out.
    pub fn with_source_filter(is_source: fn(&str) -> bool) -> Self {
        Self {
            entries: BTreeMap::new(),
            is_source,
        }
    }

    /// Merge in a database written by a prior run. A missing file is an
    /// empty starting state; a malformed one aborts the run before the
    /// build is ever launched. Entries whose `directory/file` no longer
    /// exists are dropped.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(err).context(format!("cannot read '{}'", path.display()));
            }
        };

        let prior: Vec<Entry> = serde_json::from_slice(&raw)
            .with_context(|| format!("malformed compilation database '{}'", path.display()))?;

        let mut kept = 0usize;
        let total = prior.len();
        for entry in prior {
            let location = entry.directory.join(&entry.file);
            if !location.exists() {
                continue;
            }
            kept += 1;
            self.entries.insert(resolve_key(&location), entry);
        }
        debug!(
            path = %path.display(),
            kept,
            pruned = total - kept,
            "loaded prior database"
        );

        Ok(())
    }

    /// Record one compiler invocation: every argv token the recogniser
    /// accepts becomes an entry of its own, all sharing `directory` and
    /// `arguments`. Invocations without a recognised source contribute
    /// nothing. Within one run the last capture for a source wins.
    pub fn add(&mut self, directory: &Path, arguments: &[String]) {
        let is_source = self.is_source;
        for token in arguments.iter().filter(|token| is_source(token.as_str())) {
            let key = resolve_key(&directory.join(token));
            debug!(file = %token, key = %key.display(), "recording compilation");
            self.entries.insert(
                key,
                Entry {
                    directory: directory.to_path_buf(),
                    file: token.clone(),
                    arguments: arguments.to_vec(),
                },
            );
        }
    }

    /// Persist everything as a JSON array with a trailing newline. The
    /// write goes to a temporary file next to the target and is renamed
    /// into place, so a failed save never leaves a torn database.
    pub fn save(&self, path: &Path) -> Result<()> {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries: Vec<&Entry> = self.entries.values().collect();
        let rendered =
            serde_json::to_string_pretty(&entries).context("cannot serialize the database")?;

        let mut staged = NamedTempFile::new_in(directory)
            .with_context(|| format!("cannot stage a write in '{}'", directory.display()))?;
        staged
            .write_all(rendered.as_bytes())
            .and_then(|()| staged.write_all(b"\n"))
            .context("cannot write the staged database")?;
        staged
            .persist(path)
            .with_context(|| format!("cannot rename the database into '{}'", path.display()))?;

        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CompilationDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// The deduplication key: the absolute, symlink-resolved source path.
/// When resolution fails (the file may already be gone mid-build) the
/// plain join still identifies the entry.
fn resolve_key(location: &Path) -> PathBuf {
    fs::canonicalize(location).unwrap_or_else(|_| location.to_path_buf())
}
