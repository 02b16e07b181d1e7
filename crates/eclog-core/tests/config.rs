use anyhow::Result;
use eclog_core::config::{delimiter_byte, EnrichConfig};
use eclog_core::error::PipelineError;
use eclog_core::outputs::OutputFormat;

#[test]
fn empty_document_yields_defaults() -> Result<()> {
    let config = EnrichConfig::from_toml_str("")?;
    assert_eq!(config, EnrichConfig::default());
    assert_eq!(config.progress_interval, 100_000);
    assert_eq!(config.internal_domain, "shop.our-internet-company.pl");
    assert_eq!(config.columns.timestamp, "TimeStamp");
    assert_eq!(config.delimiter_byte()?, b',');
    Ok(())
}

#[test]
fn partial_document_overrides_selected_fields() -> Result<()> {
    let config = EnrichConfig::from_toml_str(
        r#"
progress_interval = 500
redact_user_id = true
delimiter = ";"
output_format = "parquet"

[columns]
ip_id = "ClientIp"
"#,
    )?;

    assert_eq!(config.progress_stride()?.get(), 500);
    assert!(config.redact_user_id);
    assert_eq!(config.output_format, OutputFormat::Parquet);
    assert_eq!(config.columns.ip_id, "ClientIp");
    assert_eq!(config.columns.uri, "Uri");

    let options = config.reader_options()?;
    assert_eq!(options.delimiter, b';');
    assert_eq!(options.timestamp_column, "TimeStamp");
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() {
    let err = EnrichConfig::from_toml_str("progress_intervall = 10").unwrap_err();
    assert!(matches!(err, PipelineError::Toml(_)));
}

#[test]
fn invalid_values_fail_validation() {
    for document in [
        "progress_interval = 0",
        "delimiter = '\"'",
        "delimiter = \"ł\"",
        "internal_domain = \"  \"",
    ] {
        let err = EnrichConfig::from_toml_str(document).unwrap_err();
        assert!(
            matches!(err, PipelineError::Config(_)),
            "expected a config error for {document}, got {err:?}"
        );
    }
}

#[test]
fn delimiters_must_be_plain_ascii() {
    assert_eq!(delimiter_byte(';').unwrap(), b';');
    assert_eq!(delimiter_byte('\t').unwrap(), b'\t');
    for rejected in ['é', '"', '\n', '\r', 'ł'] {
        assert!(
            matches!(delimiter_byte(rejected), Err(PipelineError::Config(_))),
            "{rejected:?} should be rejected"
        );
    }
}

#[test]
fn load_reads_a_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("eclog.toml");
    std::fs::write(&path, "internal_domain = \"example.org\"\n")?;

    let config = EnrichConfig::load(&path)?;
    assert_eq!(config.internal_domain, "example.org");

    let missing = EnrichConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, PipelineError::Io(_)));
    Ok(())
}
