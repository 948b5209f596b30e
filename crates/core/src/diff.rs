//! Section-aligned structural diff between two content snapshots.
//!
//! Sections are aligned by heading key (see [`crate::sections`]). Inside a
//! modified section an LCS line diff feeds the addition/deletion counters.
//! Everything here is pure and deterministic, so results may be cached by
//! `(from_id, to_id)`.

use serde::{Deserialize, Serialize};

use crate::sections::{Document, Section, PREAMBLE_KEY};
use crate::types::EntityId;
use crate::version::{ChangeRecord, ChangeType, ContentVersion};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a section differs between the two sides of a diff.
///
/// - `Addition`     -- heading present only in the `to` side.
/// - `Deletion`     -- heading present only in the `from` side.
/// - `Modification` -- heading present in both, text differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    Addition,
    Deletion,
    Modification,
}

impl DiffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Deletion => "deletion",
            Self::Modification => "modification",
        }
    }

    /// The type the same section has when the diff is taken the other way round.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Addition => Self::Deletion,
            Self::Deletion => Self::Addition,
            Self::Modification => Self::Modification,
        }
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One differing section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSection {
    /// Section key (heading text; empty for the preamble).
    pub section: String,
    #[serde(rename = "type")]
    pub diff_type: DiffType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

/// Line and section counters for a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Lines added (inside modified sections plus all lines of added sections).
    pub additions: usize,
    /// Lines removed (inside modified sections plus all lines of removed sections).
    pub deletions: usize,
    /// Number of modified sections.
    pub modifications: usize,
}

/// Diff between two raw content strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentDiff {
    pub summary: DiffSummary,
    pub sections: Vec<DiffSection>,
}

impl ContentDiff {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Keys of every section this diff touches.
    pub fn touched_sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.section.as_str())
    }

    pub fn section(&self, key: &str) -> Option<&DiffSection> {
        self.sections.iter().find(|s| s.section == key)
    }
}

/// Diff between two stored versions of the same content path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub from_version: EntityId,
    pub to_version: EntityId,
    pub from_number: i64,
    pub to_number: i64,
    pub summary: DiffSummary,
    pub sections: Vec<DiffSection>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Section diff
// ---------------------------------------------------------------------------

/// Diff two stored versions.
pub fn diff_versions(from: &ContentVersion, to: &ContentVersion) -> VersionDiff {
    let ContentDiff { summary, sections } = if from.id == to.id {
        ContentDiff::default()
    } else {
        diff_contents(&from.content, &to.content)
    };
    VersionDiff {
        from_version: from.id,
        to_version: to.id,
        from_number: from.version,
        to_number: to.version,
        summary,
        sections,
    }
}

/// Diff two content snapshots section by section.
///
/// Result order: sections of `from` in document order (deletions and
/// modifications), then sections that exist only in `to`, in `to` order.
pub fn diff_contents(from: &str, to: &str) -> ContentDiff {
    let old_doc = Document::parse(from);
    let new_doc = Document::parse(to);
    diff_documents(&old_doc, &new_doc)
}

/// Diff two already-parsed documents.
pub fn diff_documents(old_doc: &Document, new_doc: &Document) -> ContentDiff {
    let mut summary = DiffSummary::default();
    let mut sections = Vec::new();

    for old in old_doc.sections() {
        match new_doc.get(&old.key) {
            None => {
                summary.deletions += old.line_count();
                sections.push(DiffSection {
                    section: old.key.clone(),
                    diff_type: DiffType::Deletion,
                    old_content: Some(old.raw()),
                    new_content: None,
                });
            }
            Some(new) if !old.same_content(new) => {
                let (added, removed) = count_line_changes(old, new);
                summary.additions += added;
                summary.deletions += removed;
                summary.modifications += 1;
                sections.push(DiffSection {
                    section: old.key.clone(),
                    diff_type: DiffType::Modification,
                    old_content: Some(old.raw()),
                    new_content: Some(new.raw()),
                });
            }
            Some(_) => {}
        }
    }

    for new in new_doc.sections() {
        if old_doc.get(&new.key).is_none() {
            summary.additions += new.line_count();
            sections.push(DiffSection {
                section: new.key.clone(),
                diff_type: DiffType::Addition,
                old_content: None,
                new_content: Some(new.raw()),
            });
        }
    }

    ContentDiff { summary, sections }
}

fn count_line_changes(old: &Section, new: &Section) -> (usize, usize) {
    let old_raw = old.raw();
    let new_raw = new.raw();
    count_changed_lines(old_raw.trim_end(), new_raw.trim_end())
}

/// Human-readable change records describing a diff.
pub fn change_records_from_diff(diff: &ContentDiff) -> Vec<ChangeRecord> {
    diff.sections
        .iter()
        .map(|s| {
            let name = display_section(&s.section);
            let (change_type, description) = match s.diff_type {
                DiffType::Addition => (ChangeType::Addition, format!("Added section {name}")),
                DiffType::Deletion => (ChangeType::Deletion, format!("Removed section {name}")),
                DiffType::Modification => {
                    (ChangeType::Modification, format!("Modified section {name}"))
                }
            };
            ChangeRecord {
                description,
                section_path: s.section.clone(),
                change_type,
            }
        })
        .collect()
}

/// Quote a section key for messages; the preamble has no heading to show.
pub fn display_section(key: &str) -> String {
    if key == PREAMBLE_KEY {
        "(preamble)".to_string()
    } else {
        format!("'{key}'")
    }
}

// ---------------------------------------------------------------------------
// Line diff
// ---------------------------------------------------------------------------

/// Largest remaining `old × new` line grid compared line by line. Beyond
/// it the differing middle counts as wholly removed and wholly added.
pub const MAX_LINE_DIFF_CELLS: usize = 4_000_000;

/// Lines added and removed between two texts, as `(added, removed)`.
///
/// Common leading and trailing lines are skipped, then the LCS length of the
/// differing middle is computed with two rows, so memory stays linear in the
/// shorter side.
pub fn count_changed_lines(old: &str, new: &str) -> (usize, usize) {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_lines[prefix..]
        .iter()
        .rev()
        .zip(new_lines[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];

    if old_mid.is_empty() || new_mid.is_empty() {
        return (new_mid.len(), old_mid.len());
    }
    if old_mid.len().saturating_mul(new_mid.len()) > MAX_LINE_DIFF_CELLS {
        return (new_mid.len(), old_mid.len());
    }

    let common = lcs_len(old_mid, new_mid);
    (new_mid.len() - common, old_mid.len() - common)
}

fn lcs_len(a: &[&str], b: &[&str]) -> usize {
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];
    for x in outer {
        for (j, y) in inner.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[inner.len()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
