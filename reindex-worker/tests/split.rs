use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Reader};
use reindex_worker::error::PipelineError;
use reindex_worker::events::{EventSender, PipelineEvent};
use reindex_worker::sink::{DirectorySink, MemorySink};
use reindex_worker::split::{SplitOrchestrator, OUTPUT_SCHEMA};
use reindex_worker::spreadsheet::{read_rows, Cell, InputFile};

mod common;
use common::{corrupted, drain, workbook, PRODUCT_ID};

const NAME: &str = "_ProductName (Required)";

fn catalog(name: &str, products: &[(&str, &str)]) -> InputFile {
    let rows: Vec<Vec<Option<&str>>> = products
        .iter()
        .map(|(id, product_name)| vec![Some(*id), Some(*product_name), Some("ignored")])
        .collect();
    workbook(name, &[PRODUCT_ID, NAME, "NotInSchema"], &rows)
}

#[tokio::test]
async fn test_split_keeps_last_version_of_each_product() {
    let orchestrator = SplitOrchestrator::new(2);
    let sink = MemorySink::new();
    let (events, rx) = EventSender::channel();

    let files = [
        catalog("a.xlsx", &[("P1", "old name"), ("P2", "second")]),
        catalog("b.xlsx", &[("P1", "new name"), ("P3", "third")]),
    ];
    let outputs = orchestrator
        .run(&files, &sink, &events)
        .await
        .expect("split failed");
    drop(events);

    let names: Vec<_> = outputs.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(names, vec!["bloque_1.xlsx", "bloque_2.xlsx"]);
    assert_eq!(outputs[0].row_count, 2);
    assert_eq!(outputs[1].row_count, 1);

    let stored = sink.take();
    let first = read_rows(&InputFile::new(&stored[0].0, stored[0].1.clone())).unwrap();
    let second = read_rows(&InputFile::new(&stored[1].0, stored[1].1.clone())).unwrap();

    assert_eq!(first[0].get(PRODUCT_ID), Some(&Cell::from("P1")));
    assert_eq!(first[0].get(NAME), Some(&Cell::from("new name")));
    assert_eq!(first[1].get(PRODUCT_ID), Some(&Cell::from("P2")));
    assert_eq!(second[0].get(PRODUCT_ID), Some(&Cell::from("P3")));
    assert!(!first[0].contains_column("NotInSchema"));

    let events = drain(rx).await;
    let downloads = events
        .iter()
        .filter(|event| matches!(event, PipelineEvent::Download { .. }))
        .count();
    assert_eq!(downloads, 2);

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![25, 50, 75, 100]);

    let completions = events
        .iter()
        .filter(|event| matches!(event, PipelineEvent::Complete { .. }))
        .count();
    assert_eq!(completions, 1);
    assert!(matches!(events.last(), Some(PipelineEvent::Complete { .. })));
}

#[tokio::test]
async fn test_output_header_follows_schema() {
    let orchestrator = SplitOrchestrator::default();
    let sink = MemorySink::new();

    orchestrator
        .run(
            &[catalog("a.xlsx", &[("P1", "only")])],
            &sink,
            &EventSender::disabled(),
        )
        .await
        .unwrap();

    let stored = sink.take();
    assert_eq!(stored.len(), 1);

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(stored[0].1.clone())).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Hoja1".to_owned()]);

    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    let header: Vec<String> = range
        .rows()
        .next()
        .unwrap()
        .iter()
        .map(|cell| cell.to_string())
        .collect();
    assert_eq!(header, OUTPUT_SCHEMA);
}

#[tokio::test]
async fn test_unreadable_file_aborts_split() {
    let orchestrator = SplitOrchestrator::default();
    let sink = MemorySink::new();
    let (events, rx) = EventSender::channel();

    let files = [catalog("a.xlsx", &[("P1", "one")]), corrupted("broken.xlsx")];
    let result = orchestrator.run(&files, &sink, &events).await;
    drop(events);

    assert!(matches!(result, Err(PipelineError::ParseError(_))));
    assert!(sink.take().is_empty());

    let events = drain(rx).await;
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Error { message }) if message.contains("broken.xlsx")
    ));
    assert!(!events
        .iter()
        .any(|event| matches!(event, PipelineEvent::Complete { .. })));
}

#[tokio::test]
async fn test_split_requires_input() {
    let result = SplitOrchestrator::default()
        .run(&[], &MemorySink::new(), &EventSender::disabled())
        .await;

    assert!(matches!(result, Err(PipelineError::NoInputError)));
}

#[tokio::test]
async fn test_split_writes_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path());

    let outputs = SplitOrchestrator::new(1)
        .run(
            &[catalog("a.xlsx", &[("P1", "one"), ("P2", "two")])],
            &sink,
            &EventSender::disabled(),
        )
        .await
        .unwrap();

    assert_eq!(outputs.len(), 2);
    assert!(dir.path().join("bloque_1.xlsx").exists());
    assert!(dir.path().join("bloque_2.xlsx").exists());
    assert!(outputs[1].file_url.ends_with("bloque_2.xlsx"));
}
