#![allow(dead_code)]

use reindex_worker::events::PipelineEvent;
use reindex_worker::spreadsheet::InputFile;
use rust_xlsxwriter::Workbook;
use tokio::sync::mpsc;

pub const PRODUCT_ID: &str = "_ProductId (Not changeable)";

/// Build an xlsx upload with `headers` as its first row. `None` cells are left blank.
pub fn workbook(name: &str, headers: &[&str], rows: &[Vec<Option<&str>>]) -> InputFile {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .expect("failed to write header");
    }
    for (index, cells) in rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(text) = cell {
                worksheet
                    .write_string(index as u32 + 1, col as u16, *text)
                    .expect("failed to write cell");
            }
        }
    }

    let bytes = workbook.save_to_buffer().expect("failed to save workbook");
    InputFile::new(name, bytes)
}

/// A single-column upload holding one product id per row.
pub fn product_ids(name: &str, ids: &[&str]) -> InputFile {
    let rows: Vec<Vec<Option<&str>>> = ids.iter().map(|id| vec![Some(*id)]).collect();
    workbook(name, &[PRODUCT_ID], &rows)
}

pub fn corrupted(name: &str) -> InputFile {
    InputFile::new(name, b"PK\x03\x04 this zip ends abruptly".to_vec())
}

/// Collect every event sent so far. Call once all senders are dropped.
pub async fn drain(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
