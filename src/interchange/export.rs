//! Exporting the local store to the interchange file.
//!
//! Exports use snapshot mode: the interchange file is the current state of
//! the whole lexicon, not a log of changes; the version-control tool in the
//! secondary repository tracks history. Output is canonically sorted so an
//! unchanged store re-exports byte-identically.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::ProjectLayout;
use crate::error::{Error, Result};
use crate::interchange::{self, file, EntryRecord, INTERCHANGE_EXTENSION};
use crate::notes;
use crate::store::SqliteLexicon;

/// Auxiliary ranges document, derived from the same store snapshot as the
/// entries it accompanies.
#[derive(Debug, Serialize)]
struct RangesDoc {
    ranges: Vec<Range>,
}

#[derive(Debug, Serialize)]
struct Range {
    id: &'static str,
    values: Vec<String>,
}

/// Exporter for the secondary lexicon repository.
pub struct Exporter<'a> {
    store: &'a SqliteLexicon,
    layout: &'a ProjectLayout,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over a store and project layout.
    #[must_use]
    pub fn new(store: &'a SqliteLexicon, layout: &'a ProjectLayout) -> Self {
        Self { store, layout }
    }

    /// Serialize the whole store into the secondary repository.
    ///
    /// Creates the repository directory if needed, reuses an already
    /// discovered interchange file name, writes the interchange and ranges
    /// files atomically, then rewrites the primary annotation log into the
    /// interchange addressing scheme.
    ///
    /// Returns the absolute path of the written interchange file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExportFailed`]; on failure no partially-written
    /// file is referenced as current (writes are temp-then-rename).
    pub fn export(&self) -> Result<PathBuf> {
        self.export_inner().map_err(|e| Error::ExportFailed {
            message: e.to_string(),
        })
    }

    fn export_inner(&self) -> Result<PathBuf> {
        let dir = self.layout.lexicon_repo_dir();
        fs::create_dir_all(&dir)?;

        let path = interchange::discover_interchange_file(&dir).unwrap_or_else(|| {
            dir.join(format!("{}.{INTERCHANGE_EXTENSION}", self.layout.name()))
        });

        let entries = self.store.all_entries()?;
        tracing::info!(
            entries = entries.len(),
            file = %path.display(),
            "exporting lexicon"
        );

        let mut records: Vec<EntryRecord> =
            entries.into_iter().map(EntryRecord::new).collect();
        file::write_interchange(&path, &mut records)?;
        self.write_ranges(&path, &records)?;

        // Annotation logs addressed for the primary repository have to be
        // readable by tools working on the secondary one.
        notes::transcode_file_to_interchange(
            &self.layout.primary_notes_path(),
            &notes::lexicon_notes_path(&path),
        )?;

        Ok(path)
    }

    /// Write the ranges file next to the interchange file.
    ///
    /// Currently one range: the distinct grammatical-info values in use,
    /// sorted. Derived data only, so repeated exports stay byte-identical.
    fn write_ranges(&self, interchange: &std::path::Path, records: &[EntryRecord]) -> Result<()> {
        let values: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.entry.senses.iter())
            .filter_map(|s| s.grammatical_info.clone())
            .collect();

        let doc = RangesDoc {
            ranges: vec![Range {
                id: "grammatical-info",
                values: values.into_iter().collect(),
            }],
        };

        let mut content = serde_json::to_string_pretty(&doc)?;
        content.push('\n');
        file::atomic_write(&interchange::ranges_path(interchange), &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interchange::ranges_path;
    use crate::model::LexEntry;
    use tempfile::TempDir;

    fn project(tmp: &TempDir) -> (ProjectLayout, SqliteLexicon) {
        let root = tmp.path().join("kamus");
        fs::create_dir_all(&root).unwrap();
        let layout = ProjectLayout::new(root);
        let store = SqliteLexicon::open(&layout.store_path()).unwrap();
        (layout, store)
    }

    #[test]
    fn creates_repo_and_both_files() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        store
            .upsert_entry(&LexEntry::new("pintu").with_gloss("door"))
            .unwrap();

        let path = Exporter::new(&store, &layout).export().unwrap();

        assert!(path.exists());
        assert!(ranges_path(&path).exists());
        assert_eq!(path.parent().unwrap(), layout.lexicon_repo_dir());
        assert_eq!(file::count_records(&path).unwrap(), 1);
    }

    #[test]
    fn unchanged_data_exports_byte_identically() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        store.upsert_entry(&LexEntry::new("rumah")).unwrap();
        store.upsert_entry(&LexEntry::new("pintu")).unwrap();

        let exporter = Exporter::new(&store, &layout);
        let path = exporter.export().unwrap();
        let first = fs::read(&path).unwrap();
        let first_ranges = fs::read(ranges_path(&path)).unwrap();

        let again = exporter.export().unwrap();
        assert_eq!(path, again);
        assert_eq!(first, fs::read(&path).unwrap());
        assert_eq!(first_ranges, fs::read(ranges_path(&path)).unwrap());
    }

    #[test]
    fn reuses_discovered_interchange_file_name() {
        let tmp = TempDir::new().unwrap();
        let (layout, store) = project(&tmp);
        let dir = layout.lexicon_repo_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("legacy.lex"), "{\"format_version\":2}\n").unwrap();

        let path = Exporter::new(&store, &layout).export().unwrap();
        assert_eq!(path.file_name().unwrap(), "legacy.lex");
    }

    #[test]
    fn ranges_collect_grammatical_info_sorted() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        let mut verb = LexEntry::new("makan").with_gloss("eat");
        verb.senses[0].grammatical_info = Some("verb".to_string());
        let mut noun = LexEntry::new("pintu").with_gloss("door");
        noun.senses[0].grammatical_info = Some("noun".to_string());
        store.upsert_entry(&verb).unwrap();
        store.upsert_entry(&noun).unwrap();

        let path = Exporter::new(&store, &layout).export().unwrap();
        let ranges = fs::read_to_string(ranges_path(&path)).unwrap();
        let noun_at = ranges.find("noun").unwrap();
        let verb_at = ranges.find("verb").unwrap();
        assert!(noun_at < verb_at);
    }
}
