//! Atomic file operations and record I/O for the interchange format.
//!
//! Writes go to a temp file, get fsynced, then rename over the target, so
//! a crash mid-export never leaves a truncated interchange file referenced
//! as current.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::interchange::{EntryRecord, Header, FORMAT_VERSION};

/// Write content to a file atomically (temp file + fsync + rename).
///
/// # Errors
///
/// Returns an error if any file operation fails; the original file (if
/// any) is left untouched on failure.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write a full interchange file: header line, then entry records sorted
/// by guid (the canonical order the version-control diff depends on).
///
/// # Errors
///
/// Returns an error if serialization or the atomic write fails.
pub fn write_interchange(path: &Path, records: &mut Vec<EntryRecord>) -> Result<()> {
    records.sort_by_key(|r| r.entry.guid);

    let mut content = serde_json::to_string(&Header {
        format_version: FORMAT_VERSION,
    })?;
    content.push('\n');
    for record in records.iter() {
        content.push_str(&serde_json::to_string(record)?);
        content.push('\n');
    }
    atomic_write(path, &content)
}

/// Read the header line of an interchange file without parsing the body.
///
/// # Errors
///
/// Returns an error if the file is missing, empty, or the header is not
/// valid JSON.
pub fn read_header(path: &Path) -> Result<Header> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut first = String::new();
    reader.read_line(&mut first)?;
    if first.trim().is_empty() {
        return Err(Error::InvalidRecord {
            line: 1,
            message: "missing header line".to_string(),
        });
    }
    serde_json::from_str(first.trim()).map_err(|e| Error::InvalidRecord {
        line: 1,
        message: e.to_string(),
    })
}

/// Read all entry records of an interchange file.
///
/// The header must already have been validated (or migrated) to the
/// current format version.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any line fails to
/// parse, with the 1-indexed line number for debugging.
pub fn read_records(path: &Path) -> Result<Vec<EntryRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line_num == 0 || line.trim().is_empty() {
            continue;
        }
        let record: EntryRecord =
            serde_json::from_str(&line).map_err(|e| Error::InvalidRecord {
                line: line_num + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }

    Ok(records)
}

/// Number of entry records in an interchange file (header excluded).
///
/// Returns 0 when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn count_records(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let count = reader
        .lines()
        .skip(1)
        .filter(|l| l.as_ref().is_ok_and(|s| !s.trim().is_empty()))
        .count();
    Ok(count)
}

/// Size of a file in bytes; 0 when absent.
#[must_use]
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LexEntry;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kamus.lex");

        atomic_write(&path, "one\n").unwrap();
        atomic_write(&path, "two\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");
    }

    #[test]
    fn interchange_round_trip_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kamus.lex");

        let mut records = vec![
            EntryRecord::new(LexEntry::new("pintu")),
            EntryRecord::new(LexEntry::new("rumah")),
        ];
        write_interchange(&path, &mut records).unwrap();

        assert_eq!(read_header(&path).unwrap().format_version, FORMAT_VERSION);
        let back = read_records(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(count_records(&path).unwrap(), 2);
    }

    #[test]
    fn records_are_sorted_by_guid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kamus.lex");

        let mut records = vec![
            EntryRecord::new(LexEntry::new("zebra")),
            EntryRecord::new(LexEntry::new("alpha")),
        ];
        write_interchange(&path, &mut records).unwrap();

        let back = read_records(&path).unwrap();
        assert!(back[0].entry.guid <= back[1].entry.guid);
    }

    #[test]
    fn bad_line_reports_its_number() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kamus.lex");
        fs::write(&path, "{\"format_version\":2}\nnot json\n").unwrap();

        match read_records(&path) {
            Err(Error::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_header_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.lex");
        fs::write(&path, "").unwrap();
        assert!(read_header(&path).is_err());
    }
}
