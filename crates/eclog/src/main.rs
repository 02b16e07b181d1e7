use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use eclog_core::config::{delimiter_byte, EnrichConfig};
use eclog_core::explore::{
    default_end_date, default_start_date, Chart, DatasetProvider, ExploreFilter,
};
use eclog_core::outputs::OutputFormat;
use eclog_core::pipelines::Orchestrator;
use eclog_core::timestamp_decoder::TracingProgress;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

const CONFIG_ENV: &str = "ECLOG_CONFIG";
const REDACTION_PROMPT: &str = "Do you want to remove the UserId column? (yes/no): ";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "E-commerce access log enrichment and exploration",
    long_about = None
)]
struct Cli {
    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a raw access log export and persist the result
    Enrich(EnrichArgs),
    /// Summarise an enriched dataset as chart tables
    Explore(ExploreArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// Raw access log (delimited text with a header row)
    #[arg(short, long)]
    input: PathBuf,
    /// Destination of the enriched dataset
    #[arg(short, long)]
    output: PathBuf,
    /// TOML configuration file (falls back to ECLOG_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Field delimiter of both input and CSV output
    #[arg(long)]
    delimiter: Option<char>,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Rows between progress updates while decoding timestamps
    #[arg(long)]
    progress_interval: Option<usize>,
    /// Referrers containing this domain count as internal navigation
    #[arg(long)]
    internal_domain: Option<String>,
    /// Remove the UserId column without prompting
    #[arg(long, conflicts_with = "keep_user_id")]
    redact_user_id: bool,
    /// Keep the UserId column without prompting
    #[arg(long)]
    keep_user_id: bool,
    /// Print the missing-value report as JSON instead of a table
    #[arg(long)]
    report_json: bool,
}

#[derive(Args, Debug)]
struct ExploreArgs {
    /// Enriched dataset written by `eclog enrich`
    #[arg(short, long)]
    input: PathBuf,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    #[arg(long, default_value_t = default_start_date())]
    start_date: NaiveDate,
    #[arg(long, default_value_t = default_end_date())]
    end_date: NaiveDate,
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=23))]
    start_hour: u32,
    #[arg(long, default_value_t = 23, value_parser = clap::value_parser!(u32).range(0..=23))]
    end_hour: u32,
    /// Country codes to include (repeatable); defaults to the most frequent ones
    #[arg(long = "country")]
    countries: Vec<String>,
    /// Show ln(1 + count) next to each count
    #[arg(long)]
    log_scale: bool,
    /// Charts to render (repeatable); all charts when omitted
    #[arg(long = "chart")]
    charts: Vec<Chart>,
    /// Print chart data as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Enrich(args) => handle_enrich(args),
        Command::Explore(args) => handle_explore(args),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn handle_enrich(args: EnrichArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    let mut config = load_config(config_path.as_deref())?;
    apply_overrides(&mut config, &args);

    config.redact_user_id = if args.redact_user_id {
        true
    } else if args.keep_user_id {
        false
    } else if config.redact_user_id {
        true
    } else if io::stdin().is_terminal() {
        ask_redaction(&mut io::stdin().lock(), &mut io::stdout())
            .context("failed to read the redaction answer")?
    } else {
        info!("stdin is not a terminal; keeping the user id column");
        false
    };

    let orchestrator = Orchestrator::new(config).context("invalid enrichment configuration")?;
    let run = orchestrator
        .run_file(&args.input, &args.output, &mut TracingProgress)
        .with_context(|| format!("failed to enrich {}", args.input.display()))?;

    if run.malformed_timestamps > 0 {
        warn!(malformed = run.malformed_timestamps, "non-numeric timestamps were left empty");
    }
    info!(
        path = %run.persisted.path.display(),
        rows = run.output.dataframe.height(),
        format = %run.persisted.format,
        blake3 = %run.persisted.blake3,
        "enriched dataset persisted"
    );

    let incomplete: Vec<&str> = run
        .output
        .missing_values
        .incomplete_columns()
        .map(|entry| entry.column.as_str())
        .collect();
    if !incomplete.is_empty() {
        warn!(columns = ?incomplete, "enriched dataset has columns with missing values");
    }

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&run.output.missing_values)?);
    } else {
        println!("Missing values ({} rows):", run.output.missing_values.row_count);
        println!("{}", render::missing_values_table(&run.output.missing_values));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EnrichConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            EnrichConfig::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => Ok(EnrichConfig::default()),
    }
}

fn apply_overrides(config: &mut EnrichConfig, args: &EnrichArgs) {
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
    if let Some(format) = args.format {
        config.output_format = format.into();
    }
    if let Some(interval) = args.progress_interval {
        config.progress_interval = interval;
    }
    if let Some(domain) = &args.internal_domain {
        config.internal_domain = domain.clone();
    }
}

/// Asks until the operator answers yes or no. End of input keeps the column.
fn ask_redaction<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        write!(output, "{REDACTION_PROMPT}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            _ => writeln!(output, "Please answer yes or no.")?,
        }
    }
}

fn handle_explore(args: ExploreArgs) -> Result<()> {
    let delimiter = delimiter_byte(args.delimiter).context("invalid --delimiter")?;

    let provider = DatasetProvider::new(args.input.clone(), delimiter);
    let dataset = provider
        .dataset()
        .with_context(|| format!("failed to load {}", provider.path().display()))?;
    if dataset.unparsed_timestamps() > 0 {
        warn!(
            unparsed = dataset.unparsed_timestamps(),
            "rows with unreadable timestamps are excluded from every chart"
        );
    }

    let filter = ExploreFilter {
        start_date: args.start_date,
        end_date: args.end_date,
        start_hour: args.start_hour,
        end_hour: args.end_hour,
        countries: (!args.countries.is_empty()).then(|| args.countries.clone()),
        log_scale: args.log_scale,
    };
    let view = dataset.filter(&filter)?;
    let selection: &[Chart] = if args.charts.is_empty() {
        &Chart::ALL
    } else {
        &args.charts
    };
    let charts = view.charts(selection)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&charts)?);
        return Ok(());
    }

    println!(
        "{} of {} rows selected; countries: {}",
        view.row_count(),
        dataset.row_count(),
        view.countries().join(", ")
    );
    for chart in &charts {
        println!();
        println!("{}", chart.title);
        println!("{}", render::chart_table(chart));
    }
    Ok(())
}
