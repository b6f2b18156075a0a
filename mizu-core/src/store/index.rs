use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::domain::{ArchiveRow, PageRow, ReadProgress};
use crate::store::journal::LogRecord;

/// Replayed state of the catalog journal: archives, their pages, and read
/// progress. Applying a record twice leaves the index unchanged.
#[derive(Clone, Debug, Default)]
pub struct InMemIndex {
    pub archives: BTreeMap<String, ArchiveRow>,
    pub by_path: HashMap<PathBuf, String>,
    /// archive id -> page name -> row
    pub pages: HashMap<String, BTreeMap<String, PageRow>>,
    pub progress: HashMap<String, ReadProgress>,
}

impl InMemIndex {
    pub fn has_page(&self, archive_id: &str, name: &str) -> bool {
        self.pages
            .get(archive_id)
            .is_some_and(|m| m.contains_key(name))
    }

    pub fn page_count(&self) -> usize {
        self.pages.values().map(|m| m.len()).sum()
    }

    pub fn apply(&mut self, rec: &LogRecord) {
        match rec {
            LogRecord::PutArchive(row) => {
                if let Some(old) = self.archives.get(&row.id) {
                    if old.path != row.path {
                        self.by_path.remove(&old.path);
                    }
                }
                self.by_path.insert(row.path.clone(), row.id.clone());
                self.archives.insert(row.id.clone(), row.clone());
            }
            LogRecord::RemoveArchive { id } => {
                if let Some(old) = self.archives.remove(id) {
                    self.by_path.remove(&old.path);
                }
                self.pages.remove(id);
                self.progress.remove(id);
            }
            LogRecord::PutPages(rows) => {
                for row in rows {
                    // insert-if-absent: first writer of (archive, name) wins
                    self.pages
                        .entry(row.archive_id.clone())
                        .or_default()
                        .entry(row.name.clone())
                        .or_insert_with(|| row.clone());
                }
            }
            LogRecord::SetProgress(p) => {
                self.progress.insert(p.archive_id.clone(), p.clone());
            }
        }
    }

    /// Records that rebuild this index from scratch.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let mut out = Vec::with_capacity(self.archives.len() * 3);
        for (id, row) in &self.archives {
            out.push(LogRecord::PutArchive(row.clone()));
            if let Some(pages) = self.pages.get(id) {
                let mut rows: Vec<PageRow> = pages.values().cloned().collect();
                rows.sort_by_key(|r| r.seq);
                out.push(LogRecord::PutPages(rows));
            }
            if let Some(p) = self.progress.get(id) {
                out.push(LogRecord::SetProgress(p.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(id: &str, path: &str) -> ArchiveRow {
        ArchiveRow {
            id: id.into(),
            path: PathBuf::from(path),
            name: path.into(),
            cover_path: None,
            total_pages: 2,
            size: 0,
            modified: 0,
            added_at: 0,
            measured_pages: None,
        }
    }

    #[test]
    fn page_inserts_are_idempotent() {
        let mut ix = InMemIndex::default();
        let first = PageRow::new("a", "p1.png", 0.5, 0);
        let mut again = first.clone();
        again.aspect_ratio = 9.0;

        ix.apply(&LogRecord::PutPages(vec![first.clone()]));
        ix.apply(&LogRecord::PutPages(vec![again, PageRow::new("a", "p2.png", 0.7, 1)]));

        assert_eq!(ix.page_count(), 2);
        assert_eq!(ix.pages["a"]["p1.png"], first);
    }

    #[test]
    fn remove_drops_pages_and_progress() {
        let mut ix = InMemIndex::default();
        ix.apply(&LogRecord::PutArchive(archive("a", "/x/a.cbz")));
        ix.apply(&LogRecord::PutPages(vec![PageRow::new("a", "p1.png", 0.5, 0)]));
        ix.apply(&LogRecord::SetProgress(ReadProgress {
            archive_id: "a".into(),
            last_page: 1,
            total_pages: 2,
            updated_at: 0,
        }));
        ix.apply(&LogRecord::RemoveArchive { id: "a".into() });

        assert!(ix.archives.is_empty());
        assert!(ix.by_path.is_empty());
        assert_eq!(ix.page_count(), 0);
        assert!(ix.progress.is_empty());
    }

    #[test]
    fn snapshot_rebuilds_same_state() {
        let mut ix = InMemIndex::default();
        ix.apply(&LogRecord::PutArchive(archive("a", "/x/a.cbz")));
        ix.apply(&LogRecord::PutArchive(archive("b", "/x/b.cbz")));
        ix.apply(&LogRecord::PutPages(vec![
            PageRow::new("a", "p2.png", 0.5, 1),
            PageRow::new("a", "p1.png", 0.6, 0),
        ]));
        ix.apply(&LogRecord::RemoveArchive { id: "b".into() });

        let mut rebuilt = InMemIndex::default();
        for rec in ix.snapshot() {
            rebuilt.apply(&rec);
        }
        assert_eq!(rebuilt.archives, ix.archives);
        assert_eq!(rebuilt.pages, ix.pages);
        assert_eq!(rebuilt.by_path, ix.by_path);
    }
}
