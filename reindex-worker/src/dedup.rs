//! Collect the distinct product identifiers found across a set of uploaded spreadsheets.
use std::collections::HashSet;

use tracing::{error, info};

use crate::events::{percentage, EventSender, PipelineEvent};
use crate::spreadsheet::{read_rows, InputFile, Row};

/// The column the indexer keys products on.
pub const PRODUCT_ID_COLUMN: &str = "_ProductId (Not changeable)";

/// A set of identifiers that remembers the order they were first seen in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `identifier` unless it is empty or already present. Returns whether it was added.
    pub fn insert(&mut self, identifier: String) -> bool {
        if identifier.is_empty() || self.seen.contains(&identifier) {
            return false;
        }
        self.seen.insert(identifier.clone());
        self.ordered.push(identifier);
        true
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }
}

/// Scans input files for identifier values.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    /// Column names to look for, in order of preference.
    candidate_columns: Vec<String>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(&[PRODUCT_ID_COLUMN])
    }
}

impl Deduplicator {
    pub fn new(candidate_columns: &[&str]) -> Self {
        Self {
            candidate_columns: candidate_columns.iter().map(|c| (*c).to_owned()).collect(),
        }
    }

    /// The first candidate column present in at least one of `rows`, if any.
    pub fn matched_column(&self, rows: &[Row]) -> Option<&str> {
        self.candidate_columns
            .iter()
            .find(|column| rows.iter().any(|row| row.contains_column(column)))
            .map(String::as_str)
    }

    /// Add every truthy value of the matched column in `rows` to `identifiers`.
    /// Returns how many new identifiers were added.
    pub fn extend_from_rows(&self, rows: &[Row], identifiers: &mut IdentifierSet) -> usize {
        let Some(column) = self.matched_column(rows) else {
            return 0;
        };

        rows.iter()
            .filter_map(|row| row.get(column))
            .filter(|cell| cell.is_truthy())
            .filter(|cell| identifiers.insert(cell.to_key_string()))
            .count()
    }

    /// Read every file in turn and collect the identifiers they hold.
    ///
    /// A file that cannot be parsed is reported through an `error` event and contributes nothing;
    /// the remaining files are still processed. A `progress` event follows every file, read or not.
    pub async fn deduplicate(&self, files: &[InputFile], events: &EventSender) -> IdentifierSet {
        let mut identifiers = IdentifierSet::new();

        for (index, file) in files.iter().enumerate() {
            let to_parse = file.clone();
            let parsed = tokio::task::spawn_blocking(move || read_rows(&to_parse)).await;

            match parsed {
                Ok(Ok(rows)) => {
                    let added = self.extend_from_rows(&rows, &mut identifiers);
                    info!(
                        file = %file.name,
                        rows = rows.len(),
                        added,
                        "scanned file for identifiers"
                    );
                }
                Ok(Err(parse_error)) => {
                    error!("failed to read {}: {}", file.name, parse_error);
                    metrics::counter!("reindex_files_failed").increment(1);
                    events.error(format!("Error processing {}: {}", file.name, parse_error));
                }
                Err(join_error) => {
                    error!("failed to read {}: {}", file.name, join_error);
                    metrics::counter!("reindex_files_failed").increment(1);
                    events.error(format!("Error processing {}: {}", file.name, join_error));
                }
            }

            events.send(PipelineEvent::Progress {
                progress: percentage(index + 1, files.len()),
                current_file: Some(file.name.clone()),
                processed_count: None,
                total_count: None,
            });
        }

        identifiers
    }
}
