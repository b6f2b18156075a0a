use std::path::PathBuf;

use rayon::prelude::*;

use crate::domain::{ArchiveRow, PageRow};
use crate::error::Result;
use crate::library::Library;
use crate::repo::PageRepo;

/// One archive opened for reading.
///
/// Pages are served from the extraction cache on demand, extracted through
/// an archive handle held for the whole session. Moving the visible page
/// records progress and evicts pages that fell out of the window.
pub struct ReadingSession<'a> {
    library: &'a Library,
    archive: ArchiveRow,
    repo: Box<dyn PageRepo>,
    pages: Vec<PageRow>,
    current: usize,
}

impl<'a> ReadingSession<'a> {
    pub(crate) fn new(
        library: &'a Library,
        archive: ArchiveRow,
        repo: Box<dyn PageRepo>,
        pages: Vec<PageRow>,
        resume: usize,
    ) -> Self {
        let current = resume.min(pages.len().saturating_sub(1));
        Self {
            library,
            archive,
            repo,
            pages,
            current,
        }
    }

    pub fn archive(&self) -> &ArchiveRow {
        &self.archive
    }

    pub fn pages(&self) -> &[PageRow] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page to scroll to when the session opens.
    pub fn resume_index(&self) -> usize {
        self.current
    }

    /// Indices within the eviction window around `index`.
    pub fn window(&self, index: usize) -> std::ops::Range<usize> {
        let w = self.library.config().eviction_window;
        let lo = index.saturating_sub(w);
        let hi = (index + w + 1).min(self.pages.len());
        lo..hi.max(lo)
    }

    fn fetch(&self, index: usize) -> Result<PathBuf> {
        let page = self.pages.get(index).ok_or_else(|| {
            crate::error::MizuError::NotFound(format!("page {index} of {}", self.pages.len()))
        })?;
        self.library
            .cache()
            .get_from(&self.archive.id, self.repo.as_ref(), &page.name)
    }

    /// Extracted file for page `index`, or `None` when it cannot be produced
    /// (the reader shows a broken-image placeholder then).
    pub fn page_file(&self, index: usize) -> Option<PathBuf> {
        match self.fetch(index) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(archive = %self.archive.name, index, error = %e, "page unavailable");
                None
            }
        }
    }

    /// Record `index` as the visible page: persist progress and evict cached
    /// pages outside the window. Returns the window to prefetch.
    pub fn set_visible(&mut self, index: usize) -> Result<std::ops::Range<usize>> {
        if self.pages.is_empty() {
            return Ok(0..0);
        }
        let index = index.min(self.pages.len() - 1);
        self.current = index;
        self.library.set_progress(&self.archive.id, index as u32)?;

        let window = self.window(index);
        let keep: Vec<&str> = self.pages[window.clone()]
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let evicted = self.library.cache().retain(&self.archive.id, &keep)?;
        if evicted > 0 {
            tracing::debug!(archive = %self.archive.name, index, evicted, "evicted pages");
        }
        Ok(window)
    }

    /// Extract the window around `index` in parallel; returns how many pages
    /// are available afterwards.
    pub fn prefetch(&self, index: usize) -> usize {
        self.window(index)
            .into_par_iter()
            .filter(|i| self.page_file(*i).is_some())
            .count()
    }

    /// End the session and drop the archive's extracted pages.
    pub fn close(self) -> Result<()> {
        self.library.cache().clear_archive(&self.archive.id)
    }
}
