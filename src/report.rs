//! Migration report aggregation.
//!
//! [`MigrationReport`] counts occurrences of measures within categories as
//! records flow through the mapper. It is additive only: counts grow, nothing
//! is ever removed, and recording never fails. Every component takes it by
//! shared reference, so the counters sit behind a mutex and the report can be
//! shared between workers or merged from per-worker partitions.

use indexmap::IndexMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard};

/// Category for run-wide statistics.
pub const GENERAL_STATISTICS: &str = "General statistics";

type Counters = IndexMap<String, IndexMap<String, u64>>;

/// Process-wide counters keyed by category and measure.
#[derive(Debug, Default)]
pub struct MigrationReport {
    counters: Mutex<Counters>,
}

/// One category of a summarized report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// Category name
    pub category: String,
    /// Measures sorted by name, paired with their counts
    pub measures: Vec<(String, u64)>,
}

impl MigrationReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere while the lock was held cannot leave the counters
    // half-updated, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Increment the count for `measure` within `category`.
    pub fn record(&self, category: &str, measure: impl Into<String>) {
        self.add(category, measure, 1);
    }

    /// Increment a run-wide statistic.
    pub fn stat(&self, measure: impl Into<String>) {
        self.record(GENERAL_STATISTICS, measure);
    }

    fn add(&self, category: &str, measure: impl Into<String>, count: u64) {
        let mut counters = self.lock();
        *counters
            .entry(category.to_string())
            .or_default()
            .entry(measure.into())
            .or_insert(0) += count;
    }

    /// Fold another report's counts into this one.
    ///
    /// Categories new to this report are appended in the other report's order.
    pub fn merge(&self, other: &MigrationReport) {
        let snapshot = other.lock().clone();
        for (category, measures) in snapshot {
            for (measure, count) in measures {
                self.add(&category, measure, count);
            }
        }
    }

    /// Current count for a measure, zero if never recorded.
    #[must_use]
    pub fn count(&self, category: &str, measure: &str) -> u64 {
        self.lock()
            .get(category)
            .and_then(|measures| measures.get(measure))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all counts within a category.
    #[must_use]
    pub fn category_total(&self, category: &str) -> u64 {
        self.lock()
            .get(category)
            .map_or(0, |measures| measures.values().sum())
    }

    /// Categories in insertion order, each with measures sorted by name.
    #[must_use]
    pub fn summarize(&self) -> Vec<ReportSection> {
        self.lock()
            .iter()
            .map(|(category, measures)| {
                let mut measures: Vec<(String, u64)> = measures
                    .iter()
                    .map(|(measure, count)| (measure.clone(), *count))
                    .collect();
                measures.sort_by(|a, b| a.0.cmp(&b.0));
                ReportSection {
                    category: category.clone(),
                    measures,
                }
            })
            .collect()
    }

    /// Render the summary as Markdown tables.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for section in self.summarize() {
            let _ = writeln!(
                out,
                "## {} - {} things\n",
                section.category,
                section.measures.len()
            );
            out.push_str("Measure | Count\n--- | ---:\n");
            for (measure, count) in &section.measures {
                let _ = writeln!(out, "{} | {count}", measure.replace('|', "\\|"));
            }
            out.push('\n');
        }
        out
    }
}
