//! Content path, title, and body validation plus small text metrics.

use crate::error::CoreError;
use crate::sections::Document;

/// Maximum length of a content path such as `architecture/overview`.
pub const MAX_PATH_LENGTH: usize = 512;

/// Maximum length of a version title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum size of a content snapshot in bytes.
pub const MAX_CONTENT_LENGTH: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a content path: non-empty `/`-separated segments of lowercase
/// alphanumerics, hyphens, and underscores, no leading or trailing slash.
pub fn validate_content_path(path: &str) -> Result<(), CoreError> {
    if path.is_empty() {
        return Err(CoreError::Validation("Content path must not be empty".into()));
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(CoreError::Validation(format!(
            "Content path must be at most {MAX_PATH_LENGTH} characters"
        )));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(CoreError::Validation(format!(
                "Content path '{path}' contains an empty segment"
            )));
        }
        if segment == "." || segment == ".." {
            return Err(CoreError::Validation(format!(
                "Content path '{path}' must not contain relative segments"
            )));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
        {
            return Err(CoreError::Validation(format!(
                "Content path '{path}' must contain only lowercase alphanumerics, '-', '_', '.' and '/'"
            )));
        }
    }
    Ok(())
}

/// Validate a version title (non-empty, <= 200 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a content snapshot's size.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LENGTH} bytes"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Title of the first heading in the content, if any.
pub fn first_heading(content: &str) -> Option<String> {
    Document::parse(content)
        .sections()
        .iter()
        .find(|s| s.level > 0)
        .map(|s| s.key.clone())
}

/// Whitespace-delimited word count.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
