pub mod index;
pub mod journal;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{ArchiveRow, PageRow, ReadProgress, now_unix};
use crate::error::{MizuError, Result};
use crate::store::index::InMemIndex;
use crate::store::journal::{Journal, LogRecord, encode_record, write_header};
use crate::util::natural::natural_cmp;

/// Persistent catalog of archives, pages and read progress.
///
/// Every mutation is appended to the journal first and then applied to the
/// in-memory index, so a reopened catalog replays to the same state.
pub struct Catalog {
    pub path: PathBuf,
    index: InMemIndex,
    journal: Journal,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self> {
        let mut journal = Journal::open(path)?;
        let mut index = InMemIndex::default();
        for rec in journal.replay()? {
            index.apply(&rec);
        }
        tracing::debug!(
            catalog = %path.display(),
            archives = index.archives.len(),
            pages = index.page_count(),
            "catalog loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            index,
            journal,
        })
    }

    fn commit(&mut self, rec: LogRecord) -> Result<()> {
        self.journal.append(&rec)?;
        self.index.apply(&rec);
        Ok(())
    }

    pub fn upsert_archive(&mut self, row: ArchiveRow) -> Result<()> {
        self.commit(LogRecord::PutArchive(row))
    }

    pub fn archive(&self, id: &str) -> Option<&ArchiveRow> {
        self.index.archives.get(id)
    }

    pub fn archive_by_path(&self, path: &Path) -> Option<&ArchiveRow> {
        self.index
            .by_path
            .get(path)
            .and_then(|id| self.index.archives.get(id))
    }

    /// All archives, natural order of display name.
    pub fn archives(&self) -> Vec<ArchiveRow> {
        let mut rows: Vec<ArchiveRow> = self.index.archives.values().cloned().collect();
        rows.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        rows
    }

    pub fn remove_archive(&mut self, id: &str) -> Result<()> {
        if !self.index.archives.contains_key(id) {
            return Err(MizuError::NotFound(format!("archive {id}")));
        }
        self.commit(LogRecord::RemoveArchive { id: id.to_string() })
    }

    /// Insert rows whose (archive id, name) is not yet stored; returns how many
    /// were new. Re-running an indexing pass never duplicates rows.
    pub fn insert_pages(&mut self, pages: Vec<PageRow>) -> Result<usize> {
        let fresh: Vec<PageRow> = pages
            .into_iter()
            .filter(|p| !self.index.has_page(&p.archive_id, &p.name))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        let n = fresh.len();
        self.commit(LogRecord::PutPages(fresh))?;
        Ok(n)
    }

    /// Pages of one archive in natural order of entry name.
    pub fn pages_for(&self, archive_id: &str) -> Vec<PageRow> {
        let mut rows: Vec<PageRow> = self
            .index
            .pages
            .get(archive_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        rows
    }

    /// Record that `archive_id` went through measuring, even if no page
    /// survived it.
    pub fn mark_measured(&mut self, archive_id: &str, pages: u32) -> Result<()> {
        let Some(row) = self.index.archives.get(archive_id) else {
            return Err(MizuError::NotFound(format!("archive {archive_id}")));
        };
        if row.measured_pages == Some(pages) {
            return Ok(());
        }
        let mut row = row.clone();
        row.measured_pages = Some(pages);
        self.commit(LogRecord::PutArchive(row))
    }

    pub fn is_measured(&self, archive_id: &str) -> bool {
        self.index
            .archives
            .get(archive_id)
            .is_some_and(|a| a.measured_pages.is_some())
    }

    pub fn has_pages(&self, archive_id: &str) -> bool {
        self.index
            .pages
            .get(archive_id)
            .is_some_and(|m| !m.is_empty())
    }

    pub fn set_progress(
        &mut self,
        archive_id: &str,
        last_page: u32,
        total_pages: u32,
    ) -> Result<()> {
        if let Some(p) = self.index.progress.get(archive_id) {
            if p.last_page == last_page && p.total_pages == total_pages {
                return Ok(());
            }
        }
        self.commit(LogRecord::SetProgress(ReadProgress {
            archive_id: archive_id.to_string(),
            last_page,
            total_pages,
            updated_at: now_unix(),
        }))
    }

    pub fn progress(&self, archive_id: &str) -> Option<&ReadProgress> {
        self.index.progress.get(archive_id)
    }

    pub fn counts(&self) -> (usize, usize) {
        (self.index.archives.len(), self.index.page_count())
    }

    /// Rewrite the journal as a minimal snapshot of the current state.
    pub fn compact(&mut self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        write_header(&mut tmp)?;
        let mut buf = Vec::with_capacity(64 * 1024);
        for rec in self.index.snapshot() {
            encode_record(&mut buf, &rec)?;
        }
        tmp.write_all(&buf)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| MizuError::Io(e.error))?;

        self.journal = Journal::open(&self.path)?;
        tracing::info!(catalog = %self.path.display(), bytes = buf.len(), "catalog compacted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, path: &str, name: &str) -> ArchiveRow {
        ArchiveRow {
            id: id.into(),
            path: PathBuf::from(path),
            name: name.into(),
            cover_path: None,
            total_pages: 3,
            size: 10,
            modified: 0,
            added_at: 0,
            measured_pages: None,
        }
    }

    #[test]
    fn reopen_replays_everything() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("catalog.mizu");
        {
            let mut c = Catalog::open(&p).unwrap();
            c.upsert_archive(row("a", "/lib/a.cbz", "a.cbz")).unwrap();
            c.insert_pages(vec![
                PageRow::new("a", "p10.png", 0.5, 2),
                PageRow::new("a", "p2.png", 0.6, 1),
                PageRow::new("a", "p1.png", 0.7, 0),
            ])
            .unwrap();
            c.set_progress("a", 2, 3).unwrap();
        }
        let c = Catalog::open(&p).unwrap();
        assert_eq!(c.archive_by_path(Path::new("/lib/a.cbz")).unwrap().id, "a");
        let names: Vec<_> = c.pages_for("a").into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["p1.png", "p2.png", "p10.png"]);
        assert_eq!(c.progress("a").unwrap().last_page, 2);
    }

    #[test]
    fn duplicate_page_inserts_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Catalog::open(&dir.path().join("c.mizu")).unwrap();
        let pages = vec![PageRow::new("a", "p1.png", 0.5, 0)];
        assert_eq!(c.insert_pages(pages.clone()).unwrap(), 1);
        assert_eq!(c.insert_pages(pages).unwrap(), 0);
        assert_eq!(c.counts().1, 1);
    }

    #[test]
    fn compact_keeps_state_and_shrinks_log() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.mizu");
        let mut c = Catalog::open(&p).unwrap();
        c.upsert_archive(row("a", "/lib/a.cbz", "a.cbz")).unwrap();
        for page in 0..50 {
            c.set_progress("a", page, 50).unwrap();
        }
        let before = std::fs::metadata(&p).unwrap().len();
        c.compact().unwrap();
        let after = std::fs::metadata(&p).unwrap().len();
        assert!(after < before);

        // still appendable after the swap
        c.set_progress("a", 7, 50).unwrap();
        drop(c);
        let c = Catalog::open(&p).unwrap();
        assert_eq!(c.progress("a").unwrap().last_page, 7);
        assert!(c.archive("a").is_some());
    }

    #[test]
    fn damaged_length_prefix_does_not_take_the_catalog_down() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.mizu");
        let mut bytes = b"MIZULOG\0\x01".to_vec();
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]);
        std::fs::write(&p, bytes).unwrap();

        let mut c = Catalog::open(&p).unwrap();
        assert_eq!(c.counts(), (0, 0));
        c.upsert_archive(row("a", "/lib/a.cbz", "a.cbz")).unwrap();
        drop(c);
        assert!(Catalog::open(&p).unwrap().archive("a").is_some());
    }

    #[test]
    fn measured_marker_survives_reopen_without_pages() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("c.mizu");
        {
            let mut c = Catalog::open(&p).unwrap();
            c.upsert_archive(row("a", "/lib/a.cbz", "a.cbz")).unwrap();
            assert!(!c.is_measured("a"));
            c.mark_measured("a", 0).unwrap();
            assert!(matches!(c.mark_measured("b", 1), Err(MizuError::NotFound(_))));
        }
        let c = Catalog::open(&p).unwrap();
        assert!(c.is_measured("a"));
        assert!(!c.has_pages("a"));
        assert_eq!(c.archive("a").unwrap().page_count(), 0);
    }

    #[test]
    fn removing_unknown_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Catalog::open(&dir.path().join("c.mizu")).unwrap();
        assert!(matches!(c.remove_archive("nope"), Err(MizuError::NotFound(_))));
    }
}
