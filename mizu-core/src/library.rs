use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::cache::ExtractionCache;
use crate::config::MizuConfig;
use crate::domain::{ArchiveRow, PageRow, archive_id, now_unix};
use crate::error::{MizuError, Result};
use crate::probe::{ProbeOptions, probe_aspect_ratios};
use crate::read::index::is_archive_name;
use crate::repo::{OpenParams, PageRepo};
use crate::repo_factory::{Backend, open_repo};
use crate::session::ReadingSession;
use crate::stats::LibraryStats;
use crate::store::Catalog;
use crate::util::natural::natural_cmp;
use crate::util::sanitize::{cache_file_name, sanitize_component};
use crate::util::throttle::ThrottledProgress;

#[derive(Debug, Default)]
pub struct ScanReport {
    pub added: Vec<ArchiveRow>,
    pub known: usize,
    /// Archives that could not be ingested, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// The user's collection: catalog, page cache and cover store together.
pub struct Library {
    config: MizuConfig,
    catalog: Mutex<Catalog>,
    cache: ExtractionCache,
}

impl Library {
    pub fn open(config: MizuConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let catalog = Catalog::open(&config.catalog_path())?;
        let cache = ExtractionCache::new(config.cache_root());
        Ok(Self {
            config,
            catalog: Mutex::new(catalog),
            cache,
        })
    }

    pub fn config(&self) -> &MizuConfig {
        &self.config
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    pub(crate) fn catalog(&self) -> Result<MutexGuard<'_, Catalog>> {
        self.catalog
            .lock()
            .map_err(|e| MizuError::Format(format!("catalog lock poisoned: {e}")))
    }

    pub fn archives(&self) -> Result<Vec<ArchiveRow>> {
        Ok(self.catalog()?.archives())
    }

    pub fn archive(&self, id: &str) -> Result<ArchiveRow> {
        self.catalog()?
            .archive(id)
            .cloned()
            .ok_or_else(|| MizuError::NotFound(format!("archive {id}")))
    }

    /// Look an archive up by id, or by path when `key` names a known file.
    pub fn resolve(&self, key: &str) -> Result<ArchiveRow> {
        let cat = self.catalog()?;
        if let Some(row) = cat.archive(key) {
            return Ok(row.clone());
        }
        let p = canonical(Path::new(key));
        cat.archive_by_path(&p)
            .cloned()
            .ok_or_else(|| MizuError::NotFound(format!("archive {key}")))
    }

    /// Discover `.zip`/`.cbz` files under `dir` and ingest the ones not yet known.
    pub fn scan(&self, dir: &Path) -> Result<ScanReport> {
        if !dir.is_dir() {
            return Err(MizuError::NotFound(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        let found = discover_archives(dir, self.config.scan_depth);
        let total = found.len();

        let fresh: Vec<PathBuf> = {
            let cat = self.catalog()?;
            found
                .into_iter()
                .filter(|p| cat.archive_by_path(p).is_none())
                .collect()
        };
        let mut report = ScanReport {
            known: total - fresh.len(),
            ..Default::default()
        };
        tracing::info!(dir = %dir.display(), found = total, new = fresh.len(), "scanning library");

        let covers = self.config.covers_root();
        let results: Vec<(PathBuf, Result<ArchiveRow>)> = fresh
            .into_par_iter()
            .map(|p| {
                let r = ingest_archive(&p, &covers);
                (p, r)
            })
            .collect();

        let mut cat = self.catalog()?;
        for (path, res) in results {
            match res {
                Ok(row) => {
                    // a concurrent scan may have won the race
                    if cat.archive_by_path(&row.path).is_some() {
                        continue;
                    }
                    tracing::info!(archive = %row.name, pages = row.total_pages, "added archive");
                    cat.upsert_archive(row.clone())?;
                    report.added.push(row);
                }
                Err(e) => {
                    tracing::warn!(archive = %path.display(), error = %e, "skipping archive");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Stored pages for `archive`, indexing and probing it first if it was
    /// never measured.
    pub fn ensure_pages(
        &self,
        archive: &ArchiveRow,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<PageRow>> {
        if let Some(pages) = self.stored_pages(&archive.id)? {
            return Ok(pages);
        }
        let repo = open_repo(
            Backend::Zip,
            OpenParams {
                archive_path: archive.path.clone(),
            },
        )?;
        self.measure_and_store(archive, repo.as_ref(), progress)
    }

    fn stored_pages(&self, archive_id: &str) -> Result<Option<Vec<PageRow>>> {
        let cat = self.catalog()?;
        if cat.is_measured(archive_id) || cat.has_pages(archive_id) {
            return Ok(Some(cat.pages_for(archive_id)));
        }
        Ok(None)
    }

    fn measure_and_store(
        &self,
        archive: &ArchiveRow,
        repo: &dyn PageRepo,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<PageRow>> {
        let rows = self.measure(&archive.id, repo, progress)?;

        let mut cat = self.catalog()?;
        let inserted = cat.insert_pages(rows)?;
        let pages = cat.pages_for(&archive.id);
        cat.mark_measured(&archive.id, pages.len() as u32)?;
        tracing::info!(
            archive = %archive.name,
            inserted,
            measured = pages.len(),
            "page metadata stored"
        );
        Ok(pages)
    }

    fn measure(
        &self,
        archive_id: &str,
        repo: &dyn PageRepo,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<PageRow>> {
        let entries = repo.list_pages()?;
        let opts = ProbeOptions {
            max_entry_bytes: self.config.max_entry_bytes,
        };
        let mut throttled = ThrottledProgress::new(self.config.progress_interval(), progress);
        let ratios = probe_aspect_ratios(repo, &entries, &opts, &mut |p| throttled.report(p));
        throttled.finish();

        Ok(entries
            .iter()
            .enumerate()
            .filter_map(|(seq, e)| {
                ratios
                    .get(&e.name)
                    .map(|r| PageRow::new(archive_id, &e.name, *r, seq as u32))
            })
            .collect())
    }

    pub fn open_session(&self, archive_id: &str) -> Result<ReadingSession<'_>> {
        let archive = self.archive(archive_id)?;
        let repo = open_repo(
            Backend::Zip,
            OpenParams {
                archive_path: archive.path.clone(),
            },
        )?;
        let pages = match self.stored_pages(archive_id)? {
            Some(pages) => pages,
            None => self.measure_and_store(&archive, repo.as_ref(), &mut |_| {})?,
        };
        // measuring may have updated the row
        let archive = self.archive(archive_id)?;
        let resume = self
            .catalog()?
            .progress(archive_id)
            .map(|p| p.last_page as usize)
            .unwrap_or(0);
        Ok(ReadingSession::new(self, archive, repo, pages, resume))
    }

    /// Store `last_page` as the last read page, clamped to the pages a reader
    /// can see.
    pub fn set_progress(&self, archive_id: &str, last_page: u32) -> Result<()> {
        let mut cat = self.catalog()?;
        let total = cat
            .archive(archive_id)
            .map(|a| a.page_count())
            .ok_or_else(|| MizuError::NotFound(format!("archive {archive_id}")))?;
        let last = last_page.min(total.saturating_sub(1));
        cat.set_progress(archive_id, last, total)
    }

    pub fn progress(&self, archive_id: &str) -> Result<Option<crate::domain::ReadProgress>> {
        Ok(self.catalog()?.progress(archive_id).cloned())
    }

    /// Remove catalog rows whose archive file no longer exists, together with
    /// their extracted pages and cover.
    pub fn sweep_missing(&self) -> Result<Vec<ArchiveRow>> {
        let mut cat = self.catalog()?;
        let gone: Vec<ArchiveRow> = cat
            .archives()
            .into_iter()
            .filter(|a| !a.path.is_file())
            .collect();
        for a in &gone {
            cat.remove_archive(&a.id)?;
            self.cache.clear_archive(&a.id)?;
            let cover_dir = self.config.covers_root().join(sanitize_component(&a.id));
            if cover_dir.exists() {
                fs::remove_dir_all(&cover_dir)?;
            }
            tracing::info!(archive = %a.path.display(), "removed missing archive");
        }
        Ok(gone)
    }

    pub fn compact(&self) -> Result<()> {
        self.catalog()?.compact()
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let cat = self.catalog()?;
        let archives = cat.archives();
        let read_archives = archives
            .iter()
            .filter(|a| cat.progress(&a.id).is_some_and(|p| p.last_page > 0))
            .count();
        let (_, pages) = cat.counts();
        let (cache_files, cache_bytes) = self.cache.disk_usage();
        Ok(LibraryStats {
            archives: archives.len() as u64,
            pages: pages as u64,
            read_archives: read_archives as u64,
            cache_files,
            cache_bytes,
            cache: self.cache.stats(),
        })
    }
}

fn canonical(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())
}

/// Archive files under `dir`, natural order of file name.
pub fn discover_archives(dir: &Path, depth: usize) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(depth.max(1))
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(is_archive_name))
        .map(|e| canonical(e.path()))
        .collect();
    out.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    out
}

/// Build the catalog row for one archive: id, page count and cover.
pub fn ingest_archive(path: &Path, covers_root: &Path) -> Result<ArchiveRow> {
    let path = canonical(path);
    let meta = fs::metadata(&path)?;
    let repo = open_repo(
        Backend::Zip,
        OpenParams {
            archive_path: path.clone(),
        },
    )?;
    let pages = repo.list_pages()?;
    let first = pages
        .first()
        .ok_or_else(|| MizuError::Format("archive has no images".into()))?;

    let id = archive_id(&path);
    let cover_dir = covers_root.join(sanitize_component(&id));
    let cover_file = cover_dir.join(cache_file_name(&first.name));
    let cover = if cover_file.is_file() {
        Some(cover_file)
    } else {
        match repo.extract_to(&first.name, &cover_file) {
            Ok(_) => Some(cover_file),
            Err(e) => {
                tracing::warn!(
                    archive = %path.display(),
                    entry = %first.name,
                    error = %e,
                    "no cover"
                );
                None
            }
        }
    };

    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Ok(ArchiveRow {
        id,
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path,
        cover_path: cover,
        total_pages: pages.len() as u32,
        size: meta.len(),
        modified,
        added_at: now_unix(),
        measured_pages: None,
    })
}
