//! Page-based file I/O. Demand-loads pages into a bounded cache; writes
//! back only on explicit flush, never eagerly.
use super::node::{new_page, Page, PAGE_SIZE, TABLE_MAX_PAGES};
use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

pub struct Pager {
    file: File,
    /// `None` until the slot is demand-loaded or allocated.
    cache: heapless::Vec<Option<Page>, { TABLE_MAX_PAGES as usize }>,
    /// Number of pages that exist (allocated, not necessarily flushed).
    num_pages: u32,
}

impl Pager {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(Error::CorruptFile(
                "database file is not a whole number of pages".into(),
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut cache = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            // Capacity is fixed at TABLE_MAX_PAGES, push never fails.
            let _ = cache.push(None);
        }

        debug!(num_pages, "opened pager");
        Ok(Pager { file, cache, num_pages })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Fetches a page, demand-loading it from disk on first touch.
    /// Pages beyond the on-disk length but below `num_pages` are fresh
    /// zeroed buffers (freshly allocated, not yet flushed).
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Page, Error> {
        if page_num >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfRange(page_num));
        }

        let on_disk_pages = (self.file.metadata()?.len() / PAGE_SIZE as u64) as u32;
        let slot = &mut self.cache[page_num as usize];
        if slot.is_none() {
            let mut page = new_page();
            if page_num < on_disk_pages {
                trace!(page_num, "loading page from disk");
                self.file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(&mut page)?;
            }
            *slot = Some(page);
        }

        if page_num + 1 > self.num_pages {
            self.num_pages = page_num + 1;
        }
        Ok(self.cache[page_num as usize].as_mut().unwrap())
    }

    /// Returns the page number that a newly materialized page would get.
    /// The page is only actually allocated by the following `get_page`.
    pub fn allocate_page(&self) -> Result<u32, Error> {
        if self.num_pages >= TABLE_MAX_PAGES {
            warn!(num_pages = self.num_pages, "table full, cannot allocate a page");
            return Err(Error::TableFull);
        }
        Ok(self.num_pages)
    }

    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let page = self.cache[page_num as usize]
            .as_ref()
            .ok_or_else(|| Error::CorruptFile(format!("flush of empty cache slot {}", page_num)))?;
        self.file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(page)?;
        trace!(page_num, "flushed page");
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), Error> {
        for page_num in 0..self.num_pages {
            if self.cache[page_num as usize].is_some() {
                self.flush(page_num)?;
            }
        }
        self.file.flush()?;
        debug!(num_pages = self.num_pages, "closed pager");
        Ok(())
    }
}
