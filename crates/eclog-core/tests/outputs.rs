use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use eclog_core::config::EnrichConfig;
use eclog_core::error::PipelineError;
use eclog_core::outputs::{format_timestamp_micros, persist_output, render_csv, OutputFormat};
use eclog_core::pipelines::Orchestrator;
use eclog_core::timestamp_decoder::{NoopProgress, TICKS_PER_DAY};
use polars::df;
use polars::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../eclog-parser/tests/data")
        .join(name)
}

#[test]
fn timestamps_use_microsecond_precision() {
    let epoch_micros = -62_135_596_800_000_000;
    assert_eq!(
        format_timestamp_micros(epoch_micros).as_deref(),
        Some("0001-01-01 00:00:00.000000")
    );
    assert_eq!(
        format_timestamp_micros(epoch_micros + 1_500_000).as_deref(),
        Some("0001-01-01 00:00:01.500000")
    );
}

#[test]
fn enriched_csv_matches_the_dataset_contract() -> Result<()> {
    let orchestrator = Orchestrator::new(EnrichConfig::default())?;
    let df = df![
        "TimeStamp" => [Some(0i64), Some(TICKS_PER_DAY), None],
        "IpId" => [Some("a1pl"), Some("z"), None],
        "UserAgent" => ["Chrome Safari", "Googlebot", "curl"],
        "Uri" => ["/p-1", "/search?q=a,b", "/x"],
        "Referrer" => [None, Some("-"), Some("https://www.google.com/")],
    ]?;
    let enriched = orchestrator.run(df, &mut NoopProgress)?;

    let csv = String::from_utf8(render_csv(&enriched.dataframe, b',')?)?;
    let lines: Vec<&str> = csv.lines().collect();

    let header = [
        "TimeStamp",
        "IpId",
        "UserAgent",
        "Uri",
        "Referrer",
        "CountryCode",
        "Browser",
        "OS",
        "Device_Type",
        "URI_Type",
        "Referrer_Type",
    ];
    assert_eq!(lines[0], header.join(","));
    assert_eq!(
        lines[1],
        "0001-01-01 00:00:00.000000,a1pl,Chrome Safari,/p-1,,PL,\
         Chrome,Unknown,Desktop,Product,Direct"
    );
    assert_eq!(
        lines[2],
        "0001-01-02 00:00:00.000000,z,Googlebot,\"/search?q=a,b\",-,,Bot,Unknown,Bot,Search,Direct"
    );
    assert_eq!(
        lines[3],
        ",,curl,/x,https://www.google.com/,,Unknown,Unknown,Desktop,Other,Search Engine"
    );
    assert_eq!(lines.len(), 4);
    Ok(())
}

#[test]
fn non_text_columns_are_rendered_plainly() -> Result<()> {
    let df = df![
        "count" => [Some(3i64), None],
        "cached" => [true, false],
    ]?;
    let csv = String::from_utf8(render_csv(&df, b';')?)?;
    assert_eq!(csv, "count;cached\n3;true\n;false\n");
    Ok(())
}

#[test]
fn persist_replaces_the_target_atomically() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("out.csv");
    fs::write(&target, "stale")?;

    let df = df!["Uri" => ["/a", "/b"]]?;
    let persisted = persist_output(&df, &target, OutputFormat::Csv, b',')?;

    assert_eq!(fs::read_to_string(&target)?, "Uri\n/a\n/b\n");
    assert_eq!(persisted.bytes, 10);
    assert_eq!(persisted.blake3, blake3::hash(b"Uri\n/a\n/b\n").to_hex().to_string());

    let leftovers = fs::read_dir(dir.path())?.count();
    assert_eq!(leftovers, 1, "staging file left behind");
    Ok(())
}

#[test]
fn parquet_output_keeps_native_types() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("out.parquet");

    let orchestrator = Orchestrator::new(EnrichConfig::default())?;
    let df = df![
        "TimeStamp" => [TICKS_PER_DAY],
        "IpId" => ["a1pl"],
        "UserAgent" => ["Firefox"],
        "Uri" => ["/"],
        "Referrer" => ["-"],
    ]?;
    let enriched = orchestrator.run(df, &mut NoopProgress)?;
    persist_output(&enriched.dataframe, &target, OutputFormat::Parquet, b',')?;

    let restored = ParquetReader::new(fs::File::open(&target)?).finish()?;
    assert_eq!(restored.height(), 1);
    assert!(matches!(
        restored.column("TimeStamp")?.dtype(),
        DataType::Datetime(TimeUnit::Microseconds, _)
    ));
    Ok(())
}

#[test]
fn unwritable_destination_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("missing-dir").join("out.csv");
    let df = df!["Uri" => ["/a"]]?;

    let err = persist_output(&df, &target, OutputFormat::Csv, b',').unwrap_err();
    assert!(matches!(err, PipelineError::Persist { ref path, .. } if *path == target));
    assert!(!target.exists());
    Ok(())
}

#[test]
fn rerunning_the_pipeline_is_byte_identical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    let config = EnrichConfig {
        redact_user_id: true,
        ..EnrichConfig::default()
    };
    let orchestrator = Orchestrator::new(config)?;
    let input = fixture_path("eclog_sample.csv");

    let run_a = orchestrator.run_file(&input, &first, &mut NoopProgress)?;
    let run_b = orchestrator.run_file(&input, &second, &mut NoopProgress)?;

    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    assert_eq!(run_a.persisted.blake3, run_b.persisted.blake3);
    assert_eq!(run_a.malformed_timestamps, 1);

    let content = fs::read_to_string(&first)?;
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "SessionId,TimeStamp,HttpMethod,Uri,HttpVersion,ResponseCode,Bytes,Referrer,UserAgent,IpId,\
         CountryCode,Browser,OS,Device_Type,URI_Type,Referrer_Type"
    );
    assert!(content
        .lines()
        .nth(1)
        .unwrap()
        .starts_with("1001,2019-12-09 00:00:00.000000,GET,/p-12345,"));
    Ok(())
}

#[test]
fn failed_runs_leave_no_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("broken.csv");
    let output = dir.path().join("out.csv");
    fs::write(&input, "TimeStamp,IpId\n1,aaPL\n")?;

    let err = Orchestrator::new(EnrichConfig::default())?
        .run_file(&input, &output, &mut NoopProgress)
        .unwrap_err();

    assert!(matches!(err, PipelineError::MissingColumn(_)));
    assert!(!output.exists());
    Ok(())
}
