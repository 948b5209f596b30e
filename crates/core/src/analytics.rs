//! Read-only statistics over one path's version history.

use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;
use serde::Serialize;

use crate::content::word_count;
use crate::sections::Document;
use crate::types::Timestamp;
use crate::version::{VersionHistory, VersionStatus};

/// Version counts bucketed by calendar period of their timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeFrequency {
    /// Keyed `YYYY-MM-DD`.
    pub daily: BTreeMap<String, usize>,
    /// Keyed by ISO week, `YYYY-Www`.
    pub weekly: BTreeMap<String, usize>,
    /// Keyed `YYYY-MM`.
    pub monthly: BTreeMap<String, usize>,
}

/// Size change between the lowest- and highest-numbered versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContentGrowth {
    pub word_delta: i64,
    pub section_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentAnalytics {
    pub content_path: String,
    pub version_count: usize,
    pub branch_count: usize,
    /// Sum of change records across all versions.
    pub total_changes: usize,
    /// Distinct author ids across versions and branches.
    pub contributors: usize,
    /// Mean seconds from creation to publish over every version ever published.
    pub average_review_time_secs: Option<f64>,
    /// Published / (published + rejected).
    pub approval_rate: Option<f64>,
    pub change_frequency: ChangeFrequency,
    pub content_growth: ContentGrowth,
}

pub fn day_bucket(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn week_bucket(ts: &Timestamp) -> String {
    let week = ts.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub fn month_bucket(ts: &Timestamp) -> String {
    ts.format("%Y-%m").to_string()
}

fn section_count(content: &str) -> i64 {
    Document::parse(content).heading_count() as i64
}

/// Aggregate statistics for a history. An empty history yields zeroes and
/// `None` ratios.
pub fn compute_analytics(history: &VersionHistory) -> ContentAnalytics {
    let versions = &history.versions;

    let total_changes = versions.iter().map(|v| v.changes.len()).sum();

    let contributors = versions
        .iter()
        .map(|v| v.author.id.as_str())
        .chain(history.branches.iter().map(|b| b.author.id.as_str()))
        .collect::<HashSet<_>>()
        .len();

    // A version was published if it carries a publish time, even when a
    // later publish archived it. Archived without one means rejected.
    let review_times: Vec<f64> = versions
        .iter()
        .filter_map(|v| v.published_at.map(|at| (at - v.timestamp).num_milliseconds()))
        .map(|ms| ms as f64 / 1000.0)
        .collect();
    let published = review_times.len();
    let rejected = versions
        .iter()
        .filter(|v| v.status == VersionStatus::Archived && v.published_at.is_none())
        .count();

    let average_review_time_secs =
        (published > 0).then(|| review_times.iter().sum::<f64>() / published as f64);
    let approval_rate =
        (published + rejected > 0).then(|| published as f64 / (published + rejected) as f64);

    let mut change_frequency = ChangeFrequency::default();
    for v in versions {
        *change_frequency.daily.entry(day_bucket(&v.timestamp)).or_default() += 1;
        *change_frequency.weekly.entry(week_bucket(&v.timestamp)).or_default() += 1;
        *change_frequency.monthly.entry(month_bucket(&v.timestamp)).or_default() += 1;
    }

    let oldest = versions.iter().min_by_key(|v| v.version);
    let newest = versions.iter().max_by_key(|v| v.version);
    let content_growth = match (oldest, newest) {
        (Some(oldest), Some(newest)) => ContentGrowth {
            word_delta: word_count(&newest.content) as i64 - word_count(&oldest.content) as i64,
            section_delta: section_count(&newest.content) - section_count(&oldest.content),
        },
        _ => ContentGrowth::default(),
    };

    ContentAnalytics {
        content_path: history.content_path.clone(),
        version_count: versions.len(),
        branch_count: history.branches.len(),
        total_changes,
        contributors,
        average_review_time_secs,
        approval_rate,
        change_frequency,
        content_growth,
    }
}
