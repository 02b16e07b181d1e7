use std::io::Cursor;
use std::path::PathBuf;

use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::LogReaderOptions;
use crate::reader::parse_ticks;
use crate::schema;
use crate::{read_log_file, read_log_table};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn parse_str(content: &str) -> Result<crate::ParsedLogTable, ParserError> {
    read_log_table(Cursor::new(content.as_bytes()), &LogReaderOptions::default())
}

#[test]
fn loads_sample_export_with_every_row() {
    let parsed = read_log_file(fixture_path("eclog_sample.csv"), &LogReaderOptions::default())
        .expect("sample export should load");

    assert_eq!(parsed.row_count(), 6);
    assert_eq!(parsed.malformed_timestamps, 1);
    assert_eq!(parsed.ragged_rows, 0);

    for name in schema::RAW_COLUMNS {
        assert!(parsed.df.column(name).is_ok(), "missing column {name}");
    }
    assert!(parsed.df.column("SessionId").is_ok(), "passthrough column dropped");
}

#[test]
fn timestamp_column_is_typed_as_ticks() {
    let parsed = read_log_file(fixture_path("eclog_sample.csv"), &LogReaderOptions::default())
        .expect("sample export should load");

    let ticks = parsed.df.column(schema::TIMESTAMP).unwrap().i64().unwrap();
    assert_eq!(ticks.get(0), Some(637_114_464_000_000_000));
    assert_eq!(ticks.get(4), None);
    assert_eq!(ticks.get(5), None);

    let method = parsed.df.column(schema::HTTP_METHOD).unwrap();
    assert_eq!(method.dtype(), &DataType::String);
}

#[test]
fn empty_fields_become_nulls() {
    let parsed = read_log_file(fixture_path("eclog_sample.csv"), &LogReaderOptions::default())
        .expect("sample export should load");

    let user_id = parsed.df.column(schema::USER_ID).unwrap();
    assert_eq!(user_id.null_count(), 3);

    let referrer = parsed.df.column(schema::REFERRER).unwrap().str().unwrap();
    assert_eq!(referrer.get(1), Some("-"));
    assert_eq!(referrer.get(5), None);
}

#[test]
fn short_and_long_rows_are_kept() {
    let content = "TimeStamp,IpId,Uri\n1,aaPL,/x\n2,bbDE\n3,ccUS,/y,extra\n";
    let parsed = parse_str(content).expect("ragged rows should load");

    assert_eq!(parsed.row_count(), 3);
    assert_eq!(parsed.ragged_rows, 2);
    let uri = parsed.df.column("Uri").unwrap().str().unwrap();
    assert_eq!(uri.get(1), None);
    assert_eq!(uri.get(2), Some("/y"));
}

#[test]
fn header_only_file_yields_empty_table() {
    let parsed = parse_str("TimeStamp,IpId\n").expect("header-only file should load");
    assert_eq!(parsed.row_count(), 0);
    assert_eq!(parsed.df.width(), 2);
}

#[test]
fn rejects_missing_and_duplicate_headers() {
    assert!(matches!(parse_str(""), Err(ParserError::MissingHeader)));
    assert!(matches!(
        parse_str("IpId,IpId\na,b\n"),
        Err(ParserError::InvalidHeader { index: 1, .. })
    ));
}

#[test]
fn custom_delimiter_is_honoured() {
    let options = LogReaderOptions {
        delimiter: b';',
        ..LogReaderOptions::default()
    };
    let parsed = read_log_table(Cursor::new("TimeStamp;Uri\n10;/a,b\n"), &options)
        .expect("semicolon file should load");
    let uri = parsed.df.column("Uri").unwrap().str().unwrap();
    assert_eq!(uri.get(0), Some("/a,b"));
}

#[test]
fn unreadable_path_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.csv");
    let err = read_log_file(&missing, &LogReaderOptions::default()).unwrap_err();
    match err {
        ParserError::Open { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!missing.exists());
}

#[test]
fn tick_parsing_accepts_signed_integers_only() {
    assert_eq!(parse_ticks(" 0 "), Some(0));
    assert_eq!(parse_ticks("-5"), Some(-5));
    assert_eq!(parse_ticks("18446744073709551615"), None);
    assert_eq!(parse_ticks("6.3e17"), None);
}
