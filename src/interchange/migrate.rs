//! Migration of older interchange format versions.
//!
//! Version 1 carried a single `gloss` string per entry and knew nothing of
//! relations. Version 2 (current) replaced the gloss with a `senses` array
//! and added `relations`.
//!
//! Migration never touches the source file: the upgraded copy is written
//! to a temp file and then renamed onto a stable scratch path next to the
//! source, overwriting any stale copy, so repeated runs are idempotent.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::interchange::FORMAT_VERSION;

/// Stable scratch path the migrated copy is renamed to.
///
/// Keeps a non-`.lex` extension so interchange-file discovery never picks
/// up the scratch copy.
#[must_use]
pub fn scratch_path(source: &Path) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(".migrated");
    source.with_file_name(name)
}

/// Upgrade `source` (declaring `from_version`) to the current format.
///
/// Returns the scratch path holding the upgraded copy.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] if the file cannot be parsed or a
/// record cannot be upgraded, and [`Error::UnsupportedFormatVersion`] for
/// versions this build does not know.
pub fn migrate_to_current(source: &Path, from_version: u32) -> Result<PathBuf> {
    if from_version >= FORMAT_VERSION {
        return Ok(source.to_path_buf());
    }
    if from_version != 1 {
        return Err(Error::UnsupportedFormatVersion {
            found: from_version,
            supported: FORMAT_VERSION,
        });
    }

    tracing::info!(
        file = %source.display(),
        from = from_version,
        to = FORMAT_VERSION,
        "migrating interchange file"
    );

    let upgraded = upgrade_v1(source).map_err(|e| Error::MigrationFailed {
        file: source.to_path_buf(),
        message: e.to_string(),
    })?;

    let scratch = scratch_path(source);
    let temp = scratch.with_extension("migrated.tmp");
    fs::write(&temp, upgraded)?;
    // Rename over any stale copy from an interrupted earlier run.
    fs::rename(&temp, &scratch)?;
    Ok(scratch)
}

fn upgrade_v1(source: &Path) -> Result<String> {
    let reader = BufReader::new(File::open(source)?);
    let mut output = format!("{{\"format_version\":{FORMAT_VERSION}}}\n");

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line_num == 0 || line.trim().is_empty() {
            continue;
        }
        let mut record: Value =
            serde_json::from_str(&line).map_err(|e| Error::InvalidRecord {
                line: line_num + 1,
                message: e.to_string(),
            })?;

        let entry = record
            .get_mut("entry")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::InvalidRecord {
                line: line_num + 1,
                message: "record has no entry object".to_string(),
            })?;

        if let Some(gloss) = entry.remove("gloss") {
            entry.insert("senses".to_string(), json!([{ "gloss": gloss }]));
        } else {
            entry.entry("senses").or_insert_with(|| json!([]));
        }
        entry.entry("relations").or_insert_with(|| json!([]));

        // The stored hash predates the field move; recompute it.
        let entry_value = record
            .get("entry")
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(obj) = record.as_object_mut() {
            obj.insert(
                "content_hash".to_string(),
                Value::String(super::hash::content_hash(&entry_value)),
            );
        }

        output.push_str(&serde_json::to_string(&record)?);
        output.push('\n');
    }

    Ok(output)
}
