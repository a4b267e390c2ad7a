//! Changeset file collections.
//!
//! A [`ChangesetSource`] is a read-only tree of files addressed by
//! `/`-separated paths relative to its root. [`DirSource`] reads from the
//! local file system, [`MemorySource`] holds files in memory (for changesets
//! compiled into the binary with `include_str!`, or for tests).

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::filename::{extract_version, FileNameError};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// Anything else (symlinks, devices, ...).
    Other,
}

/// A single entry returned by [`ChangesetSource::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetEntry {
    /// File name without any directory component.
    pub name: String,
    /// What the entry is.
    pub kind: EntryKind,
}

impl ChangesetEntry {
    /// Creates a regular file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// Creates a directory entry.
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    /// Returns true for regular files with a `.sql` extension (any case).
    #[must_use]
    pub fn is_changeset(&self) -> bool {
        self.kind == EntryKind::File
            && Path::new(&self.name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
    }
}

/// Read-only access to changeset files.
pub trait ChangesetSource: Send + Sync + fmt::Debug {
    /// Lists the entries of the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if the directory does not exist,
    /// or [`io::ErrorKind::InvalidData`] for a name that is not valid UTF-8.
    fn read_dir(&self, path: &str) -> io::Result<Vec<ChangesetEntry>>;

    /// Opens the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if the file does not exist.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;
}

impl<S: ChangesetSource + ?Sized> ChangesetSource for Arc<S> {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ChangesetEntry>> {
        (**self).read_dir(path)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        (**self).open(path)
    }
}

/// Joins a file name onto a base path within a source.
#[must_use]
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Runs a blocking source read on tokio's blocking thread pool.
pub(crate) async fn blocking<T, F>(read: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(io::Error::other)?
}

/// Stably sorts entries by the version prefix of their names.
///
/// Entries with equal versions keep their relative order. This is not a
/// validating pass: every entry is expected to carry a version prefix, and
/// the first one that does not aborts the sort, leaving `entries` untouched.
///
/// # Errors
///
/// Returns the [`FileNameError`] of the first entry whose version cannot
/// be extracted.
pub fn sort_entries(entries: &mut Vec<ChangesetEntry>) -> Result<(), FileNameError> {
    let versions = entries
        .iter()
        .map(|entry| extract_version(&entry.name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut keyed: Vec<(i64, ChangesetEntry)> =
        versions.into_iter().zip(entries.drain(..)).collect();
    keyed.sort_by_key(|(version, _)| *version);
    entries.extend(keyed.into_iter().map(|(_, entry)| entry));

    Ok(())
}

/// Changesets stored in a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        resolved.extend(path.split('/').filter(|part| !part.is_empty() && *part != "."));
        resolved
    }
}

impl ChangesetSource for DirSource {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ChangesetEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };
            let name = entry.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {name:?} is not valid UTF-8"),
                )
            })?;
            entries.push(ChangesetEntry { name, kind });
        }
        Ok(entries)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(self.resolve(path))?))
    }
}

/// Changesets held in memory, keyed by their full path.
///
/// Directories are implied by the paths of the files they contain.
#[derive(Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file at `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<str>, content: impl AsRef<[u8]>) -> Self {
        self.insert(path, content);
        self
    }

    /// Adds or replaces a file at `path`.
    pub fn insert(&mut self, path: impl AsRef<str>, content: impl AsRef<[u8]>) {
        self.files
            .insert(normalize(path.as_ref()), Arc::from(content.as_ref()));
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: no such file or directory"))
}

impl ChangesetSource for MemorySource {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ChangesetEntry>> {
        let dir = normalize(path);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut entries: Vec<ChangesetEntry> = Vec::new();
        for key in self.files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((sub, _)) => ChangesetEntry::dir(sub),
                None => ChangesetEntry::file(rest),
            };
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        if entries.is_empty() && !dir.is_empty() {
            return Err(not_found(path));
        }
        Ok(entries)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let content = self
            .files
            .get(&normalize(path))
            .ok_or_else(|| not_found(path))?;
        Ok(Box::new(Cursor::new(Arc::clone(content))))
    }
}
