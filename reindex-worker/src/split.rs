//! Merge several catalog exports into one deduplicated set of products and re-emit it as
//! fixed-size spreadsheets.
//!
//! Unlike identifier deduplication, a file that fails to parse aborts the whole split: the output
//! files are a re-import of the catalog, and silently dropping one input would drop its products
//! from every chunk written after it.
use std::collections::HashMap;

use tracing::{error, info};

use crate::dedup::PRODUCT_ID_COLUMN;
use crate::error::PipelineError;
use crate::events::{scaled_percentage, EventSender, PipelineEvent};
use crate::sink::OutputSink;
use crate::spreadsheet::{read_rows, write_rows, Cell, InputFile, Row};

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

pub const OUTPUT_SHEET_NAME: &str = "Hoja1";

/// Column layout of every generated file, matching the catalog import template.
pub const OUTPUT_SCHEMA: [&str; 48] = [
    "_SkuId (Not changeable)",
    "_SkuName",
    "_ActivateSkuIfPossible",
    "_SkuIsActive (Not changeable)",
    "_SkuEan",
    "_Height",
    "_ActualHeight",
    "_Width",
    "_ActualWidth",
    "_Length",
    "_ActualLength",
    "_Weight",
    "_ActualWeight",
    "_MeasurementUnit",
    "_UnitMultiplier",
    "_SKUReferenceCode",
    "_RewardValue",
    "_EstimatedArrivalDate",
    "_ManufacturerCode",
    "_ProductId (Not changeable)",
    "_ProductName (Required)",
    "_ProductShortDescription",
    "_ProductIsActive (Not changeable)",
    "_ProductReferenceCodeId",
    "_ShowOnSite",
    "_CaptionLink (Not changeable)",
    "_ProductDescription",
    "_ProductLaunchDate",
    "_Keywords",
    "_SiteTitle",
    "_MetaTagDescription",
    "_SupplierId",
    "_ShowOutOfStock",
    "_Kit (Not changeable)",
    "_DepartamentId (Not changeable)",
    "_DepartamentName",
    "_CategoryId",
    "_CategoryName",
    "_Brand",
    "_BrandId",
    "_CubicWeight",
    "_CommercialCondition",
    "_Stores",
    "_Accessories",
    "_Similar",
    "_Suggestions",
    "_ShowTogether",
    "_Attachment",
];

/// Rows keyed by identifier. A later row replaces an earlier one with the same identifier but
/// keeps the position where that identifier was first seen.
#[derive(Debug, Default)]
pub struct MergedRows {
    rows: Vec<Row>,
    positions: HashMap<String, usize>,
}

impl MergedRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, row: Row) {
        match self.positions.get(&key) {
            Some(&position) => self.rows[position] = row,
            None => {
                self.positions.insert(key, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// A spreadsheet produced by a split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub file_name: String,
    pub file_url: String,
    pub row_count: usize,
}

pub struct SplitOrchestrator {
    schema: Vec<String>,
    id_column: String,
    chunk_size: usize,
}

impl Default for SplitOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl SplitOrchestrator {
    pub fn new(chunk_size: usize) -> Self {
        Self::with_schema(&OUTPUT_SCHEMA, PRODUCT_ID_COLUMN, chunk_size)
    }

    pub fn with_schema(schema: &[&str], id_column: &str, chunk_size: usize) -> Self {
        Self {
            schema: schema.iter().map(|column| (*column).to_owned()).collect(),
            id_column: id_column.to_owned(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Add every row with a truthy identifier to `merged`, later rows winning.
    pub fn merge_rows(&self, rows: Vec<Row>, merged: &mut MergedRows) {
        for row in rows {
            let key = match row.get(&self.id_column) {
                Some(cell) if cell.is_truthy() => cell.to_key_string(),
                _ => continue,
            };
            merged.insert(key, row);
        }
    }

    /// Lay `row` out in schema order. Columns the row does not have become empty text; columns
    /// outside the schema are dropped.
    pub fn arrange(&self, row: &Row) -> Vec<Cell> {
        self.schema
            .iter()
            .map(|column| {
                row.get(column)
                    .cloned()
                    .unwrap_or_else(|| Cell::Text(String::new()))
            })
            .collect()
    }

    /// Split `rows` into consecutive chunks of at most `chunk_size`, each laid out in schema order.
    pub fn arrange_chunks(&self, rows: &[Row]) -> Vec<Vec<Vec<Cell>>> {
        rows.chunks(self.chunk_size)
            .map(|chunk| chunk.iter().map(|row| self.arrange(row)).collect())
            .collect()
    }

    /// Read every file, merge their rows by identifier and store one spreadsheet per chunk.
    pub async fn run(
        &self,
        files: &[InputFile],
        sink: &dyn OutputSink,
        events: &EventSender,
    ) -> Result<Vec<SplitOutput>, PipelineError> {
        let result = self.split(files, sink, events).await;

        if let Err(ref pipeline_error) = result {
            error!("split failed: {}", pipeline_error);
            events.error(pipeline_error.to_string());
        }

        result
    }

    async fn split(
        &self,
        files: &[InputFile],
        sink: &dyn OutputSink,
        events: &EventSender,
    ) -> Result<Vec<SplitOutput>, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::NoInputError);
        }

        events.log(format!("Loading {} file(s)...", files.len()));
        let mut merged = MergedRows::new();

        for (index, file) in files.iter().enumerate() {
            let to_parse = file.clone();
            let rows = tokio::task::spawn_blocking(move || read_rows(&to_parse)).await??;
            let row_count = rows.len();

            self.merge_rows(rows, &mut merged);

            info!(file = %file.name, rows = row_count, "read file for split");
            events.log(format!("{} read with {} rows.", file.name, row_count));
            events.progress(scaled_percentage(index + 1, files.len(), 50));
        }

        let rows = merged.into_rows();
        events.log(format!(
            "Deduplication complete: {} unique items.",
            rows.len()
        ));

        let chunks = self.arrange_chunks(&rows);
        events.log(format!("Generating {} output file(s)...", chunks.len()));

        let chunk_count = chunks.len();
        let mut outputs = Vec::with_capacity(chunk_count);

        for (index, chunk) in chunks.into_iter().enumerate() {
            let file_name = format!("bloque_{}.xlsx", index + 1);
            let row_count = chunk.len();

            let schema = self.schema.clone();
            let bytes = tokio::task::spawn_blocking(move || {
                let headers: Vec<&str> = schema.iter().map(String::as_str).collect();
                write_rows(OUTPUT_SHEET_NAME, &headers, &chunk)
            })
            .await??;

            let file_url = sink.store(&file_name, bytes).await?;

            info!(file = %file_name, rows = row_count, "generated output file");
            events.log(format!(
                "File generated: {} ({} items).",
                file_name, row_count
            ));
            events.send(PipelineEvent::Download {
                file_name: file_name.clone(),
                file_url: file_url.clone(),
            });
            events.progress(50 + scaled_percentage(index + 1, chunk_count, 50));

            outputs.push(SplitOutput {
                file_name,
                file_url,
                row_count,
            });
        }

        events.send(PipelineEvent::Complete {
            message: "Process finished successfully.".to_owned(),
        });

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> Row {
        [
            (PRODUCT_ID_COLUMN, Cell::from(id)),
            ("_ProductName (Required)", Cell::from(name)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_later_rows_win_and_keep_first_position() {
        let orchestrator = SplitOrchestrator::default();
        let mut merged = MergedRows::new();

        orchestrator.merge_rows(vec![product("P1", "old"), product("P2", "two")], &mut merged);
        orchestrator.merge_rows(vec![product("P1", "new"), product("", "nameless")], &mut merged);

        let rows = merged.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(PRODUCT_ID_COLUMN), Some(&Cell::from("P1")));
        assert_eq!(
            rows[0].get("_ProductName (Required)"),
            Some(&Cell::from("new"))
        );
        assert_eq!(rows[1].get(PRODUCT_ID_COLUMN), Some(&Cell::from("P2")));
    }

    #[test]
    fn test_arrange_follows_schema() {
        let orchestrator = SplitOrchestrator::default();
        let mut row = product("P1", "Shirt");
        row.insert("NotInSchema", Cell::from("dropped"));
        row.insert("_SkuId (Not changeable)", Cell::Number(77.0));

        let cells = orchestrator.arrange(&row);

        assert_eq!(cells.len(), OUTPUT_SCHEMA.len());
        assert_eq!(cells[0], Cell::Number(77.0));
        assert_eq!(cells[1], Cell::from(""));
        assert_eq!(cells[19], Cell::from("P1"));
        assert_eq!(cells[20], Cell::from("Shirt"));
    }

    #[test]
    fn test_chunks_of_twenty_five_thousand_rows() {
        let orchestrator = SplitOrchestrator::default();
        let rows: Vec<Row> = (0..25_000)
            .map(|i| product(&format!("P{i}"), "name"))
            .collect();

        let chunks = orchestrator.arrange_chunks(&rows);

        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10_000, 10_000, 5_000]);
        assert!(chunks
            .iter()
            .flatten()
            .all(|cells| cells.len() == OUTPUT_SCHEMA.len()));
        assert_eq!(chunks[2][4_999][19], Cell::from("P24999"));
        assert_eq!(chunks[2][4_999][47], Cell::from(""));
    }
}
