//! Importing an interchange file into the local store.
//!
//! The whole import is one unit of work: a mid-import failure leaves the
//! store exactly as it was. Two merge styles exist (see [`MergeStyle`]):
//! `KeepBoth` unions the file into the store, `KeepOnlyNew` mirrors the
//! file exactly, deleting local-only entries.
//!
//! Modification timestamps are only trusted under `KeepBoth`. Trusting a
//! stale local timestamp while mirror-deleting would skip entries changed
//! only on the remote side, so `KeepOnlyNew` always takes the file's
//! version.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ProjectLayout;
use crate::error::{Error, Result};
use crate::interchange::{file, hash, migrate, MergeStyle, FORMAT_VERSION};
use crate::model::Relation;
use crate::notes;
use crate::store::SqliteLexicon;

/// Counters for one import operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    /// New entries created.
    pub created: usize,
    /// Existing entries updated from the file.
    pub updated: usize,
    /// Entries skipped (identical content, or local copy newer).
    pub skipped: usize,
    /// Local entries deleted (mirror style only).
    pub deleted: usize,
    /// Relations dropped because their target never appeared.
    pub relations_dropped: usize,
}

impl ImportStats {
    /// Total entries read from the file.
    #[must_use]
    pub fn total_processed(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Importer applying an interchange file under a [`MergeStyle`].
pub struct MergeImporter<'a> {
    store: &'a mut SqliteLexicon,
    layout: &'a ProjectLayout,
    style: MergeStyle,
}

impl<'a> MergeImporter<'a> {
    /// Create an importer with the given merge style.
    #[must_use]
    pub fn new(store: &'a mut SqliteLexicon, layout: &'a ProjectLayout, style: MergeStyle) -> Self {
        Self {
            store,
            layout,
            style,
        }
    }

    /// Apply `path` to the local store.
    ///
    /// Migrates the file first when it declares an older format version,
    /// applies every entry inside one transaction, resolves deferred
    /// relations, rewrites the repository's annotation log into the local
    /// scheme, and writes a human-readable change log.
    ///
    /// Returns the change log path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImportFailed`] wrapping the underlying cause. On
    /// error nothing has been committed to the store.
    pub fn import(&mut self, path: &Path) -> Result<PathBuf> {
        let style = self.style;
        self.import_inner(path)
            .map_err(|e| match e {
                already @ Error::ImportFailed { .. } => already,
                other => Error::ImportFailed {
                    file: path.to_path_buf(),
                    style,
                    message: other.to_string(),
                },
            })
    }

    fn import_inner(&mut self, path: &Path) -> Result<PathBuf> {
        let header = file::read_header(path)?;
        let effective = if header.format_version < FORMAT_VERSION {
            migrate::migrate_to_current(path, header.format_version)?
        } else if header.format_version > FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion {
                found: header.format_version,
                supported: FORMAT_VERSION,
            });
        } else {
            path.to_path_buf()
        };

        let records = file::read_records(&effective)?;
        let file_guids: HashSet<Uuid> = records.iter().map(|r| r.entry.guid).collect();
        tracing::info!(
            file = %path.display(),
            style = %self.style,
            entries = records.len(),
            "importing interchange file"
        );

        let style = self.style;
        let stats = self.store.mutate("import_interchange", |tx| {
            let mut stats = ImportStats::default();
            let mut deferred: Vec<(Uuid, Vec<Relation>)> = Vec::new();

            for record in &records {
                let incoming = &record.entry;
                let existing = SqliteLexicon::tx_get(tx, incoming.guid)?;
                let write = match &existing {
                    None => {
                        stats.created += 1;
                        true
                    }
                    Some(local) => {
                        if hash::content_hash(local) == hash::content_hash(incoming) {
                            stats.skipped += 1;
                            false
                        } else {
                            match style {
                                MergeStyle::KeepBoth => {
                                    if incoming.date_modified > local.date_modified {
                                        stats.updated += 1;
                                        true
                                    } else {
                                        stats.skipped += 1;
                                        false
                                    }
                                }
                                MergeStyle::KeepOnlyNew => {
                                    stats.updated += 1;
                                    true
                                }
                            }
                        }
                    }
                };

                if write {
                    let mut bare = incoming.clone();
                    if !bare.relations.is_empty() {
                        // Relation targets may appear later in the file;
                        // apply the entry bare, attach relations afterwards.
                        deferred.push((bare.guid, std::mem::take(&mut bare.relations)));
                    }
                    SqliteLexicon::tx_upsert(tx, &bare)?;
                }
            }

            if style == MergeStyle::KeepOnlyNew {
                for guid in SqliteLexicon::tx_all_guids(tx)? {
                    if !file_guids.contains(&guid) && SqliteLexicon::tx_delete(tx, guid)? {
                        stats.deleted += 1;
                    }
                }
            }

            // Forward references resolved now that every entry exists.
            for (guid, relations) in deferred {
                let mut kept = Vec::with_capacity(relations.len());
                for relation in relations {
                    if SqliteLexicon::tx_get(tx, relation.target)?.is_some() {
                        kept.push(relation);
                    } else {
                        tracing::warn!(
                            entry = %guid,
                            target = %relation.target,
                            rel_type = %relation.rel_type,
                            "dropping relation with unresolved target"
                        );
                        stats.relations_dropped += 1;
                    }
                }
                SqliteLexicon::tx_set_relations(tx, guid, &kept)?;
            }

            Ok(stats)
        })?;

        // The secondary repository's annotation log, freshly pulled, has to
        // be readable by local tools again.
        notes::transcode_file_to_local(
            &notes::lexicon_notes_path(path),
            &self.layout.primary_notes_path(),
        )?;

        self.write_change_log(path, &stats)
    }

    fn write_change_log(&self, source: &Path, stats: &ImportStats) -> Result<PathBuf> {
        let dir = self.layout.sync_logs_dir();
        fs::create_dir_all(&dir)?;
        let log_path = dir.join(format!(
            "import-{}.log",
            Utc::now().format("%Y%m%d-%H%M%S%.3f")
        ));
        let body = format!(
            "Import of {source} ({style})\n\
             created: {created}\n\
             updated: {updated}\n\
             skipped: {skipped}\n\
             deleted: {deleted}\n\
             relations dropped: {dropped}\n",
            source = source.display(),
            style = self.style,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            deleted = stats.deleted,
            dropped = stats.relations_dropped,
        );
        fs::write(&log_path, body)?;
        Ok(log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interchange::{file::write_interchange, EntryRecord};
    use crate::model::LexEntry;
    use chrono::Duration;
    use tempfile::TempDir;

    fn project(tmp: &TempDir) -> (ProjectLayout, SqliteLexicon) {
        let root = tmp.path().join("kamus");
        fs::create_dir_all(&root).unwrap();
        let layout = ProjectLayout::new(root);
        let store = SqliteLexicon::open(&layout.store_path()).unwrap();
        (layout, store)
    }

    fn write_file(dir: &Path, entries: &[LexEntry]) -> PathBuf {
        let path = dir.join("incoming.lex");
        let mut records: Vec<EntryRecord> =
            entries.iter().cloned().map(EntryRecord::new).collect();
        write_interchange(&path, &mut records).unwrap();
        path
    }

    #[test]
    fn keep_both_unions_local_and_file() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let a = LexEntry::new("a");
        let b = LexEntry::new("b");
        let c = LexEntry::new("c");
        store.upsert_entry(&a).unwrap();
        store.upsert_entry(&b).unwrap();

        let path = write_file(tmp.path(), &[b.clone(), c.clone()]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();

        let guids = store.all_guids().unwrap();
        assert_eq!(guids.len(), 3);
        assert!(guids.contains(&a.guid));
        assert!(guids.contains(&b.guid));
        assert!(guids.contains(&c.guid));
    }

    #[test]
    fn keep_only_new_mirrors_the_file() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let a = LexEntry::new("a");
        let b = LexEntry::new("b");
        let c = LexEntry::new("c");
        store.upsert_entry(&a).unwrap();
        store.upsert_entry(&b).unwrap();

        let path = write_file(tmp.path(), &[b.clone(), c.clone()]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepOnlyNew)
            .import(&path)
            .unwrap();

        let guids = store.all_guids().unwrap();
        assert_eq!(guids.len(), 2);
        assert!(!guids.contains(&a.guid), "local-only entry must be deleted");
        assert!(guids.contains(&b.guid));
        assert!(guids.contains(&c.guid));
    }

    #[test]
    fn keep_both_trusts_newer_timestamp_only() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let mut local = LexEntry::new("pintu").with_gloss("door");
        store.upsert_entry(&local).unwrap();

        // Stale remote copy: older date_modified, different content.
        let mut stale = local.clone();
        stale.lemma = "pintu-old".to_string();
        stale.date_modified = local.date_modified - Duration::hours(1);
        let path = write_file(tmp.path(), &[stale]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();
        assert_eq!(store.get_entry(local.guid).unwrap().unwrap().lemma, "pintu");

        // Newer remote copy wins.
        local.lemma = "pintu-new".to_string();
        local.date_modified = Utc::now() + Duration::hours(1);
        let path = write_file(tmp.path(), &[local.clone()]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();
        assert_eq!(
            store.get_entry(local.guid).unwrap().unwrap().lemma,
            "pintu-new"
        );
    }

    #[test]
    fn keep_only_new_ignores_timestamps() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let local = LexEntry::new("pintu");
        store.upsert_entry(&local).unwrap();

        let mut remote = local.clone();
        remote.lemma = "pintu-remote".to_string();
        remote.date_modified = local.date_modified - Duration::hours(1);
        let path = write_file(tmp.path(), &[remote]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepOnlyNew)
            .import(&path)
            .unwrap();

        // File wins even though its timestamp is older.
        assert_eq!(
            store.get_entry(local.guid).unwrap().unwrap().lemma,
            "pintu-remote"
        );
    }

    #[test]
    fn forward_relations_are_resolved() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let target = LexEntry::new("rumah");
        let mut source = LexEntry::new("pintu");
        source.relations.push(Relation {
            rel_type: "part-of".to_string(),
            target: target.guid,
        });
        // Source sorts before or after target depending on guid; the file
        // order is canonical, so the relation may well be a forward
        // reference. Either way it must survive.
        let path = write_file(tmp.path(), &[source.clone(), target.clone()]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();

        let back = store.get_entry(source.guid).unwrap().unwrap();
        assert_eq!(back.relations.len(), 1);
        assert_eq!(back.relations[0].target, target.guid);
    }

    #[test]
    fn unresolved_relation_is_dropped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);

        let mut source = LexEntry::new("pintu");
        source.relations.push(Relation {
            rel_type: "synonym".to_string(),
            target: Uuid::new_v4(),
        });
        let path = write_file(tmp.path(), &[source.clone()]);
        MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();

        let back = store.get_entry(source.guid).unwrap().unwrap();
        assert!(back.relations.is_empty());
    }

    #[test]
    fn parse_failure_commits_nothing() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        store.upsert_entry(&LexEntry::new("a")).unwrap();

        let good = serde_json::to_string(&EntryRecord::new(LexEntry::new("b"))).unwrap();
        let path = tmp.path().join("broken.lex");
        fs::write(&path, format!("{{\"format_version\":2}}\n{good}\ngarbage\n")).unwrap();

        let err = MergeImporter::new(&mut store, &layout, MergeStyle::KeepOnlyNew)
            .import(&path)
            .unwrap_err();
        assert!(matches!(err, Error::ImportFailed { .. }));
        // Pre-import state intact: one entry, the original.
        assert_eq!(store.entry_count().unwrap(), 1);
    }

    #[test]
    fn change_log_is_written_and_returned() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        let path = write_file(tmp.path(), &[LexEntry::new("a")]);

        let log = MergeImporter::new(&mut store, &layout, MergeStyle::KeepBoth)
            .import(&path)
            .unwrap();
        assert!(log.starts_with(layout.sync_logs_dir()));
        let body = fs::read_to_string(&log).unwrap();
        assert!(body.contains("created: 1"));
    }

    #[test]
    fn export_then_mirror_import_into_empty_store_is_lossless() {
        let tmp = TempDir::new().unwrap();
        let (layout, mut store) = project(&tmp);
        let mut entry = LexEntry::new("makan").with_gloss("eat");
        entry.senses[0].grammatical_info = Some("verb".to_string());
        store.upsert_entry(&entry).unwrap();
        store.upsert_entry(&LexEntry::new("pintu")).unwrap();

        let exported = crate::interchange::Exporter::new(&store, &layout)
            .export()
            .unwrap();

        let other_root = tmp.path().join("fresh");
        fs::create_dir_all(&other_root).unwrap();
        let other_layout = ProjectLayout::new(other_root);
        let mut fresh = SqliteLexicon::open(&other_layout.store_path()).unwrap();
        MergeImporter::new(&mut fresh, &other_layout, MergeStyle::KeepOnlyNew)
            .import(&exported)
            .unwrap();

        assert_eq!(fresh.all_entries().unwrap(), store.all_entries().unwrap());
    }
}
