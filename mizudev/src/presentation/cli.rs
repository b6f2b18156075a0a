use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "mizudev CLI (alpha)", long_about = None)]
pub struct Cli {
    /// Library data directory (catalog, page cache, covers)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON config file; --data-dir overrides its data_dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover .zip/.cbz archives in a folder and add new ones to the library
    Scan { dir: PathBuf },

    /// List library archives with reading progress
    List,

    /// Show pages (entry name + aspect ratio) of an archive, measuring it if needed
    Pages {
        /// archive id or path
        archive: String,
    },

    /// Extract one page through the page cache and print its cached path
    Get {
        /// archive id or path
        archive: String,
        /// zero-based page index in natural order
        index: usize,
        /// also copy the page to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show or set the last read page of an archive
    Progress {
        /// archive id or path
        archive: String,
        /// zero-based page index; omit to print the stored value
        page: Option<u32>,
    },

    /// List image entries of any archive file without touching the library
    Index { archive: PathBuf },

    /// Extract all pages of an archive file into a folder
    Extract { archive: PathBuf, dest: PathBuf },

    /// Drop cached pages of one archive
    Evict {
        /// archive id or path
        archive: String,
    },

    /// Forget archives whose files were deleted
    Sweep,

    /// Rewrite the catalog journal as a snapshot
    Compact,

    /// Library and cache statistics
    Stats,
}
