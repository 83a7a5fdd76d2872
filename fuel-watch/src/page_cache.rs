//! On-disk snapshots of provider pages, for working on scrapers offline.
//!
//! A page found in the cache is returned without touching the network.
//! A missing page is fetched once and stored. Nothing ever expires; delete
//! the file to refresh it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.html", slug))
    }

    pub fn load(&self, slug: &str) -> Result<Option<String>, FetchError> {
        match fs_err::read_to_string(self.page_path(slug)) {
            Ok(html) => Ok(Some(html)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn store(&self, slug: &str, html: &str) -> Result<(), FetchError> {
        fs_err::create_dir_all(&self.dir)?;
        fs_err::write(self.page_path(slug), html)?;
        Ok(())
    }
}
