#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod stats;

pub mod util {
    pub mod natural;
    pub mod sanitize;
    pub mod throttle;
}

pub mod read {
    pub mod extract;
    pub mod index;
    pub mod opened;
}

pub mod repo;
pub mod repo_factory;
pub mod repo_zip;

pub mod cache;
pub mod probe;
pub mod store;

pub mod library;
pub mod session;

// Re-exports: stable API surface
pub use cache::ExtractionCache;
pub use config::MizuConfig;
pub use library::{Library, ScanReport};
pub use probe::probe_aspect_ratios;
pub use read::extract::extract_pages;
pub use read::index::list_pages;
pub use session::ReadingSession;
pub use store::Catalog;
pub use util::natural::natural_cmp;
