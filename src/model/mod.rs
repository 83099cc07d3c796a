//! Lexical entry data types.
//!
//! These types are what the interchange file carries, one entry per line.
//! They deliberately stay close to the serialized shape so a round trip
//! through the interchange format is lossless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single lexical entry.
///
/// The guid is the identity key for all merge decisions: two entries with
/// the same guid are the same entry, everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexEntry {
    /// Stable identity of the entry across all repositories.
    pub guid: Uuid,
    /// Headword form.
    pub lemma: String,
    /// Morphological type (stem, root, phrase, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morph_type: Option<String>,
    /// Senses in presentation order.
    #[serde(default)]
    pub senses: Vec<Sense>,
    /// Lexical relations to other entries (may reference entries that
    /// appear later in an interchange file).
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Creation timestamp.
    pub date_created: DateTime<Utc>,
    /// Last-modification timestamp. Trusted during `KeepBoth` merges only.
    pub date_modified: DateTime<Utc>,
}

impl LexEntry {
    /// Create a minimal entry with a fresh guid and current timestamps.
    #[must_use]
    pub fn new(lemma: &str) -> Self {
        let now = Utc::now();
        Self {
            guid: Uuid::new_v4(),
            lemma: lemma.to_string(),
            morph_type: None,
            senses: Vec::new(),
            relations: Vec::new(),
            date_created: now,
            date_modified: now,
        }
    }

    /// Add a sense with just a gloss.
    #[must_use]
    pub fn with_gloss(mut self, gloss: &str) -> Self {
        self.senses.push(Sense {
            gloss: gloss.to_string(),
            definition: None,
            grammatical_info: None,
        });
        self
    }
}

/// One sense of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    /// Short gloss.
    pub gloss: String,
    /// Longer definition text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    /// Grammatical category label (feeds the ranges file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammatical_info: Option<String>,
}

/// A typed relation from one entry to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Relation type label (synonym, antonym, variant, ...).
    pub rel_type: String,
    /// Guid of the target entry.
    pub target: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_json() {
        let mut entry = LexEntry::new("pintu").with_gloss("door");
        entry.senses[0].grammatical_info = Some("noun".to_string());
        entry.relations.push(Relation {
            rel_type: "synonym".to_string(),
            target: Uuid::new_v4(),
        });

        let json = serde_json::to_string(&entry).unwrap();
        let back: LexEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let entry = LexEntry::new("rumah");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("morph_type"));
    }
}
