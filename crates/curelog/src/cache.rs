//! Per-section file cache for the formatter stage.
//!
//! Avoids re-sending a section to the model when its raw text hasn't changed
//! since the last run. Each section is persisted as a pair of files under the
//! data directory: `{stem}_{date}.raw.md` (the source text as last seen) and
//! `{stem}_{date}.processed.md` (the curated output). A lookup is a hit only
//! when the stored raw text matches the section byte-for-byte and a non-empty
//! processed file exists.

use crate::journal::Section;
use std::path::{Path, PathBuf};

/// Result of a cache lookup for one section.
#[derive(Debug)]
pub enum CacheLookup {
    /// Raw text unchanged and curated output on disk.
    Hit(String),
    /// Section must be (re)formatted; the new raw text has been persisted.
    Miss,
}

/// File-backed cache of curated sections, keyed by section date.
#[derive(Debug)]
pub struct SectionCache {
    data_dir: PathBuf,
    /// Input file stem, namespacing cache files per source journal.
    stem: String,
    hits: u64,
    misses: u64,
}

impl SectionCache {
    /// Open a cache rooted at `data_dir`, creating the directory if needed.
    pub fn new(data_dir: impl Into<PathBuf>, stem: impl Into<String>) -> Result<Self, String> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| format!("failed to create data dir '{}': {e}", data_dir.display()))?;
        Ok(Self {
            data_dir,
            stem: stem.into(),
            hits: 0,
            misses: 0,
        })
    }

    fn raw_path(&self, date: &str) -> PathBuf {
        self.data_dir.join(format!("{}_{date}.raw.md", self.stem))
    }

    fn processed_path(&self, date: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_{date}.processed.md", self.stem))
    }

    /// Look up a section. On a miss the section's current raw text is written
    /// so the next run can detect whether it changed again.
    pub fn lookup(&mut self, section: &Section) -> Result<CacheLookup, String> {
        let raw_path = self.raw_path(&section.date);
        let text = section.text();

        let raw_unchanged = match std::fs::read_to_string(&raw_path) {
            Ok(stored) => stored == text,
            Err(_) => false,
        };

        if raw_unchanged {
            if let Ok(processed) = std::fs::read_to_string(self.processed_path(&section.date)) {
                let processed = processed.trim().to_string();
                if !processed.is_empty() {
                    self.hits += 1;
                    return Ok(CacheLookup::Hit(processed));
                }
            }
        } else {
            std::fs::write(&raw_path, &text)
                .map_err(|e| format!("failed to write '{}': {e}", raw_path.display()))?;
        }

        self.misses += 1;
        Ok(CacheLookup::Miss)
    }

    /// Store the curated output for a section.
    pub fn store(&self, date: &str, curated: &str) -> Result<(), String> {
        let path = self.processed_path(date);
        std::fs::write(&path, curated)
            .map_err(|e| format!("failed to write '{}': {e}", path.display()))
    }

    /// Cache hit count for this run.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache miss count for this run.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(date: &str, body: &str) -> Section {
        Section {
            date: date.into(),
            header: format!("### {date}"),
            body: body.into(),
        }
    }

    #[test]
    fn first_lookup_is_miss_and_persists_raw() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SectionCache::new(dir.path(), "journal").unwrap();
        let s = section("2023-04-10", "Ferritin 8 ng/mL");

        assert!(matches!(cache.lookup(&s).unwrap(), CacheLookup::Miss));
        assert_eq!(cache.misses(), 1);

        let raw = std::fs::read_to_string(dir.path().join("journal_2023-04-10.raw.md")).unwrap();
        assert_eq!(raw, s.text());
    }

    #[test]
    fn unchanged_section_hits_after_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SectionCache::new(dir.path(), "journal").unwrap();
        let s = section("2023-04-10", "Ferritin 8 ng/mL");

        assert!(matches!(cache.lookup(&s).unwrap(), CacheLookup::Miss));
        cache.store("2023-04-10", "### 2023-04-10\n- **Ferritin:** 8 ng/mL").unwrap();

        match cache.lookup(&s).unwrap() {
            CacheLookup::Hit(curated) => assert!(curated.contains("Ferritin")),
            CacheLookup::Miss => panic!("expected hit"),
        }
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn changed_section_misses_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SectionCache::new(dir.path(), "journal").unwrap();
        let s1 = section("2023-04-10", "Ferritin 8 ng/mL");

        cache.lookup(&s1).unwrap();
        cache.store("2023-04-10", "curated v1").unwrap();

        let s2 = section("2023-04-10", "Ferritin 8 ng/mL; Vitamin C 500mg daily");
        assert!(matches!(cache.lookup(&s2).unwrap(), CacheLookup::Miss));

        // The raw file now reflects the updated section.
        let raw = std::fs::read_to_string(dir.path().join("journal_2023-04-10.raw.md")).unwrap();
        assert!(raw.contains("Vitamin C"));
    }

    #[test]
    fn empty_processed_file_does_not_hit() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SectionCache::new(dir.path(), "journal").unwrap();
        let s = section("2023-04-10", "Ferritin 8 ng/mL");

        cache.lookup(&s).unwrap();
        cache.store("2023-04-10", "  \n").unwrap();

        assert!(matches!(cache.lookup(&s).unwrap(), CacheLookup::Miss));
    }

    #[test]
    fn stems_namespace_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = SectionCache::new(dir.path(), "journal-a").unwrap();
        let mut b = SectionCache::new(dir.path(), "journal-b").unwrap();
        let s = section("2023-04-10", "shared date");

        a.lookup(&s).unwrap();
        a.store("2023-04-10", "curated by a").unwrap();

        // Same date under a different stem is still a miss.
        assert!(matches!(b.lookup(&s).unwrap(), CacheLookup::Miss));
    }
}
