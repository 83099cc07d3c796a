//! Annotation-log reference transcoding.
//!
//! Annotation logs embed reference URLs addressing the entry they annotate.
//! The primary repository and the secondary (lexicon) repository use
//! different addressing schemes:
//!
//! - local:       `lexsync://localhost/link?app=lexicon&tool=entryEdit&guid=G&tag=&label=L`
//! - interchange: `lexicon://file?type=entry&label=L&id=G`
//!
//! Transcoding is a pure, stateless, line-oriented rewrite of the
//! `ref="..."` attribute. Field values are matched bounded by `&` or the
//! end of the value, but label text may legitimately contain XML-escaped
//! sequences (`&quot;`, `&amp;`, ...), so those entity runs are matched
//! explicitly instead of terminating the field. A line without both a
//! label and a guid passes through verbatim.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::interchange::file::atomic_write;

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"ref="([^"]*)""#).expect("static regex"))
}

fn guid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]guid=([^&]*)").expect("static regex"))
}

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]id=([^&]*)").expect("static regex"))
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A label value is a run of non-& text, optionally continued by XML
    // entity escapes. The regex crate has no lookahead, so the escapes are
    // spelled out.
    RE.get_or_init(|| {
        Regex::new(r"[?&]label=([^&]*(?:&(?:amp|quot|lt|gt|apos|#[0-9]+);[^&]*)*)")
            .expect("static regex")
    })
}

/// Extract the guid from a reference value, accepting either the local
/// `guid=` or the interchange `id=` field name.
fn guid_field(value: &str) -> Option<&str> {
    guid_re()
        .captures(value)
        .or_else(|| id_re().captures(value))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn label_field(value: &str) -> Option<&str> {
    label_re()
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn rewrite_ref<F>(line: &str, rewrite: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some(caps) = ref_re().captures(line) else {
        return line.to_string();
    };
    let value_match = caps.get(1).expect("capture group 1 always present");
    let Some(new_value) = rewrite(value_match.as_str()) else {
        return line.to_string();
    };
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..value_match.start()]);
    out.push_str(&new_value);
    out.push_str(&line[value_match.end()..]);
    out
}

/// Rewrite one line from the local scheme to the interchange scheme.
///
/// Lines without a `ref` attribute, or whose reference lacks a label or
/// guid, pass through unchanged.
#[must_use]
pub fn to_interchange_line(line: &str) -> String {
    rewrite_ref(line, |value| {
        let guid = guid_field(value)?;
        let label = label_field(value)?;
        Some(format!("lexicon://file?type=entry&label={label}&id={guid}"))
    })
}

/// Rewrite one line from the interchange scheme to the local scheme.
#[must_use]
pub fn to_local_line(line: &str) -> String {
    rewrite_ref(line, |value| {
        let guid = guid_field(value)?;
        let label = label_field(value)?;
        Some(format!(
            "lexsync://localhost/link?app=lexicon&tool=entryEdit&guid={guid}&tag=&label={label}"
        ))
    })
}

/// Path of the annotation log that accompanies an interchange file.
#[must_use]
pub fn lexicon_notes_path(interchange: &Path) -> PathBuf {
    let mut name = interchange
        .file_name()
        .unwrap_or_default()
        .to_os_string();
    name.push(".notes");
    interchange.with_file_name(name)
}

/// Transcode an annotation log file into the interchange scheme.
///
/// A missing source file is not an error; the destination is simply left
/// alone.
///
/// # Errors
///
/// Returns an error if the source exists but cannot be read, or the
/// destination cannot be written.
pub fn transcode_file_to_interchange(src: &Path, dest: &Path) -> Result<()> {
    transcode_file(src, dest, to_interchange_line)
}

/// Transcode an annotation log file into the local scheme.
///
/// # Errors
///
/// Returns an error if the source exists but cannot be read, or the
/// destination cannot be written.
pub fn transcode_file_to_local(src: &Path, dest: &Path) -> Result<()> {
    transcode_file(src, dest, to_local_line)
}

fn transcode_file(src: &Path, dest: &Path, line_fn: fn(&str) -> String) -> Result<()> {
    if !src.exists() {
        return Ok(());
    }
    let input = fs::read_to_string(src)?;
    let mut output = String::with_capacity(input.len());
    for line in input.lines() {
        output.push_str(&line_fn(line));
        output.push('\n');
    }
    tracing::debug!(src = %src.display(), dest = %dest.display(), "transcoded annotation log");
    atomic_write(dest, &output)
}
