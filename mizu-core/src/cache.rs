//! Disk cache of extracted pages, keyed by (archive id, entry name).
//!
//! Layout: `<root>/<archive id>/<cache_file_name(entry)>`. The filesystem is
//! the source of truth; the in-memory map only records what this process has
//! handed out so eviction can find it. Deleting the directory behind the
//! cache's back just turns the next lookup into a miss.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::{MizuError, Result};
use crate::repo::{OpenParams, PageRepo};
use crate::repo_factory::{Backend, open_repo};
use crate::stats::{CacheCounters, CacheStats};
use crate::util::sanitize::{cache_file_name, sanitize_component};

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct CacheKey {
    archive_id: String,
    entry: String,
}

pub struct ExtractionCache {
    root: PathBuf,
    entries: DashMap<CacheKey, PathBuf>,
    in_flight: DashMap<CacheKey, Arc<Mutex<()>>>,
    counters: CacheCounters,
}

impl ExtractionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            counters: CacheCounters::default(),
        }
    }

    pub fn archive_dir(&self, archive_id: &str) -> PathBuf {
        self.root.join(sanitize_component(archive_id))
    }

    /// Deterministic location of an entry, whether or not it is cached.
    pub fn path_for(&self, archive_id: &str, entry: &str) -> PathBuf {
        self.archive_dir(archive_id).join(cache_file_name(entry))
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Cached file for `entry`, extracting it from `archive_path` on a miss.
    pub fn get(&self, archive_id: &str, archive_path: &Path, entry: &str) -> Result<PathBuf> {
        self.get_with(archive_id, entry, || {
            open_repo(
                Backend::Zip,
                OpenParams {
                    archive_path: archive_path.to_path_buf(),
                },
            )
        })
    }

    /// Same as [`get`](Self::get) but extracting through an already open repo.
    pub fn get_from(&self, archive_id: &str, repo: &dyn PageRepo, entry: &str) -> Result<PathBuf> {
        self.get_with(archive_id, entry, || Ok(RepoRef(repo)))
    }

    fn get_with<R, F>(&self, archive_id: &str, entry: &str, open: F) -> Result<PathBuf>
    where
        R: AsRepo,
        F: FnOnce() -> Result<R>,
    {
        let key = CacheKey {
            archive_id: archive_id.to_string(),
            entry: entry.to_string(),
        };
        let dest = self.path_for(archive_id, entry);

        if let Some(hit) = self.lookup(&key, &dest) {
            return Ok(hit);
        }

        // one extraction per key; the loser of the race re-checks and hits
        let gate = self.in_flight.entry(key.clone()).or_default().clone();
        let _guard = gate
            .lock()
            .map_err(|e| MizuError::Format(format!("cache lock poisoned: {e}")))?;

        if let Some(hit) = self.lookup(&key, &dest) {
            return Ok(hit);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let repo = open()?;
        let n = repo.as_repo().extract_to(entry, &dest)?;
        self.counters
            .extracted_bytes
            .fetch_add(n, Ordering::Relaxed);
        tracing::debug!(archive_id, entry, bytes = n, "extracted page");

        self.entries.insert(key, dest.clone());
        Ok(dest)
    }

    fn lookup(&self, key: &CacheKey, dest: &Path) -> Option<PathBuf> {
        if dest.is_file() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.entries.insert(key.clone(), dest.to_path_buf());
            return Some(dest.to_path_buf());
        }
        // stale mapping: the file was removed externally
        self.entries.remove(key);
        None
    }

    pub fn is_cached(&self, archive_id: &str, entry: &str) -> bool {
        self.path_for(archive_id, entry).is_file()
    }

    /// Remove one cached page; returns whether a file was deleted.
    pub fn evict(&self, archive_id: &str, entry: &str) -> Result<bool> {
        let key = CacheKey {
            archive_id: archive_id.to_string(),
            entry: entry.to_string(),
        };
        self.entries.remove(&key);
        self.in_flight.remove(&key);
        let p = self.path_for(archive_id, entry);
        match fs::remove_file(&p) {
            Ok(()) => {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Evict every page of `archive_id` handed out by this cache except `keep`.
    pub fn retain(&self, archive_id: &str, keep: &[&str]) -> Result<usize> {
        let keep: HashSet<&str> = keep.iter().copied().collect();
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().archive_id == archive_id && !keep.contains(e.key().entry.as_str()))
            .map(|e| e.key().entry.clone())
            .collect();
        let mut n = 0;
        for entry in doomed {
            if self.evict(archive_id, &entry)? {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Drop the whole per-archive directory.
    pub fn clear_archive(&self, archive_id: &str) -> Result<()> {
        self.entries.retain(|k, _| k.archive_id != archive_id);
        self.in_flight.retain(|k, _| k.archive_id != archive_id);
        let dir = self.archive_dir(archive_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// (files, bytes) currently on disk under the cache root.
    pub fn disk_usage(&self) -> (u64, u64) {
        let mut files = 0;
        let mut bytes = 0;
        for e in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            files += 1;
            bytes += e.metadata().map(|m| m.len()).unwrap_or(0);
        }
        (files, bytes)
    }
}

trait AsRepo {
    fn as_repo(&self) -> &dyn PageRepo;
}

impl AsRepo for Box<dyn PageRepo> {
    fn as_repo(&self) -> &dyn PageRepo {
        self.as_ref()
    }
}

struct RepoRef<'a>(&'a dyn PageRepo);

impl AsRepo for RepoRef<'_> {
    fn as_repo(&self) -> &dyn PageRepo {
        self.0
    }
}
