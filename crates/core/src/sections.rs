//! Structural splitting of markdown content into heading-keyed sections.
//!
//! A section runs from one heading line to the next. Text before the first
//! heading is the preamble, keyed by [`PREAMBLE_KEY`]. Parsing is lossless:
//! [`Document::render`] reproduces the parsed input byte for byte.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Key of the untitled section preceding the first heading.
pub const PREAMBLE_KEY: &str = "";

/// Heading level used when a section is created without an existing heading.
pub const DEFAULT_HEADING_LEVEL: u8 = 2;

/// ATX heading: one to six `#`, whitespace, title, optional closing `#`s.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*?)[ \t]*#*[ \t]*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// One heading-delimited slice of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Alignment key: the heading title, disambiguated for repeats.
    pub key: String,
    /// Heading level (1-6), `0` for the preamble.
    pub level: u8,
    /// The heading line including its line terminator; empty for the preamble.
    pub heading_line: String,
    /// Everything after the heading line up to the next heading.
    pub body: String,
}

impl Section {
    /// Build a fresh section with a generated heading line.
    pub fn new(key: &str, level: u8, body: &str) -> Self {
        if key == PREAMBLE_KEY {
            return Self {
                key: String::new(),
                level: 0,
                heading_line: String::new(),
                body: terminate(body),
            };
        }
        let level = level.clamp(1, 6);
        Self {
            key: key.to_string(),
            level,
            heading_line: format!("{} {}\n", "#".repeat(level as usize), key),
            body: terminate(body),
        }
    }

    /// Full text of the section: heading line followed by the body.
    pub fn raw(&self) -> String {
        format!("{}{}", self.heading_line, self.body)
    }

    /// Replace the body while keeping the heading line.
    pub fn with_body(&self, body: &str) -> Self {
        Self {
            body: terminate(body),
            ..self.clone()
        }
    }

    /// Sections are equal when their text matches up to trailing whitespace.
    pub fn same_content(&self, other: &Section) -> bool {
        self.raw().trim_end() == other.raw().trim_end()
    }

    /// Number of lines in the section, heading included, trailing blank
    /// lines excluded.
    pub fn line_count(&self) -> usize {
        self.raw().trim_end().lines().count()
    }
}

/// Ensure non-empty text ends with a newline so sections concatenate cleanly.
fn terminate(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// An ordered list of sections parsed from one content snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    /// Split content into sections. Headings inside fenced code blocks are
    /// treated as body text.
    pub fn parse(content: &str) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut current = Section {
            key: PREAMBLE_KEY.to_string(),
            level: 0,
            heading_line: String::new(),
            body: String::new(),
        };
        let mut in_fence = false;

        for line in content.split_inclusive('\n') {
            let bare = line.trim_end_matches(['\n', '\r']);
            let trimmed = bare.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }

            let heading = if in_fence { None } else { parse_heading(bare) };
            match heading {
                Some((level, title)) => {
                    let finished = std::mem::replace(
                        &mut current,
                        Section {
                            key: unique_key(&mut seen, &title),
                            level,
                            heading_line: line.to_string(),
                            body: String::new(),
                        },
                    );
                    if !(finished.key.is_empty() && finished.body.is_empty()) {
                        sections.push(finished);
                    }
                }
                None => current.body.push_str(line),
            }
        }

        if !(current.key.is_empty() && current.body.is_empty()) {
            sections.push(current);
        }

        Self { sections }
    }

    /// Concatenate all sections back into content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&section.heading_line);
            out.push_str(&section.body);
        }
        out
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.key == key)
    }

    /// Number of headed sections (the preamble is not counted).
    pub fn heading_count(&self) -> usize {
        self.sections.iter().filter(|s| s.level > 0).count()
    }

    /// Replace the section with the same key, or insert it when absent.
    ///
    /// New sections land after `after` when that key exists, at the front
    /// for the preamble, and at the end otherwise.
    pub fn upsert(&mut self, section: Section, after: Option<&str>) {
        if let Some(idx) = self.position(&section.key) {
            self.sections[idx] = section;
            return;
        }
        if section.key == PREAMBLE_KEY {
            self.sections.insert(0, section);
            return;
        }
        match after.and_then(|key| self.position(key)) {
            Some(idx) => self.sections.insert(idx + 1, section),
            None => self.sections.push(section),
        }
    }

    /// Remove a section by key, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Section> {
        let idx = self.position(key)?;
        Some(self.sections.remove(idx))
    }

    /// Key of the section immediately preceding `key`, if any.
    pub fn predecessor(&self, key: &str) -> Option<&str> {
        let idx = self.position(key)?;
        idx.checked_sub(1).map(|i| self.sections[i].key.as_str())
    }
}

/// Whether `key` can name a section: the preamble key, or a title that a
/// generated heading line parses back to unchanged.
pub fn is_valid_section_key(key: &str) -> bool {
    if key == PREAMBLE_KEY {
        return true;
    }
    if key.contains(['\n', '\r']) {
        return false;
    }
    parse_heading(&format!("## {key}")).is_some_and(|(_, title)| title == key)
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    let caps = HEADING_RE.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let title = caps.get(2)?.as_str().trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some((level, title))
}

fn unique_key(seen: &mut HashMap<String, usize>, title: &str) -> String {
    let count = seen.entry(title.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        title.to_string()
    } else {
        format!("{title} ({count})")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
