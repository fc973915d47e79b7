use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use sheettrack_core::config::DEFAULT_CONFIG_FILE;
use sheettrack_core::source::Spreadsheet;
use sheettrack_core::source::local::read_spreadsheet;
use sheettrack_core::{
    GridExtractor, LocalWorkbookClient, MemoryStore, TrackerConfig, UpdateOrchestrator,
    WorksheetValidator,
};
use std::fs;
use std::path::{Path, PathBuf};

mod formatter;

#[derive(Parser)]
#[command(name = "sheettrack")]
#[command(about = "Collects teaching progress from teacher spreadsheets", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Update progress records for every active teacher
    Update {
        /// Write the resulting store as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the worksheets of a spreadsheet that belong to a teacher
    Validate {
        /// Spreadsheet URL
        #[arg(long)]
        url: String,
        /// Teacher name, used in log lines
        #[arg(long)]
        teacher: String,
    },
    /// Print the records of one worksheet of a workbook file
    Extract {
        /// Path to the Excel/ODS file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Worksheet title (also the grade level)
        #[arg(short, long)]
        sheet: String,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    if let Some(config_path) = path {
        debug!("Loading config from {}", config_path.display());
        return TrackerConfig::load(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Try to load default config from current directory if it exists
    let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_config_path.exists() {
        TrackerConfig::load(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        info!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        Ok(TrackerConfig::default())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    let exit_code = match &cli.command {
        Command::Update { output } => run_update(&config, &cli.format, output.as_deref())?,
        Command::Validate { url, teacher } => run_validate(&config, &cli.format, url, teacher)?,
        Command::Extract { file, sheet } => run_extract(&config, &cli.format, file, sheet)?,
    };

    std::process::exit(exit_code);
}

fn run_update(config: &TrackerConfig, format: &OutputFormat, output: Option<&Path>) -> Result<i32> {
    let client = LocalWorkbookClient::new(&config.source.directory);
    let orchestrator =
        UpdateOrchestrator::from_config(config, &client).context("Invalid configuration")?;
    let mut store = MemoryStore::new(config.catalog.clone());

    info!(
        "Reading workbooks from {}",
        config.source.directory.display()
    );
    let report = orchestrator
        .run(&config.teachers, &mut store)
        .context("Update aborted")?;

    match format {
        OutputFormat::Human => formatter::print_update_human(&report),
        OutputFormat::Json => formatter::print_update_json(&report)?,
    }

    if let Some(path) = output {
        fs::write(path, store.to_json()?)
            .with_context(|| format!("Failed to write store to {}", path.display()))?;
    }

    Ok(if report.has_failures() { 1 } else { 0 })
}

fn run_validate(
    config: &TrackerConfig,
    format: &OutputFormat,
    url: &str,
    teacher: &str,
) -> Result<i32> {
    let client = LocalWorkbookClient::new(&config.source.directory);
    let scorer = sheettrack_core::similarity::scorer_by_name(&config.validation.scorer)?;
    let options = config.validation.options_for(None);

    let worksheets = WorksheetValidator::new(&client, scorer.as_ref())
        .find_valid_worksheets(url, teacher, &options)
        .with_context(|| format!("Failed to validate worksheets of {}", url))?;

    match format {
        OutputFormat::Human => formatter::print_worksheets_human(teacher, &worksheets),
        OutputFormat::Json => formatter::print_worksheets_json(teacher, url, &worksheets)?,
    }
    Ok(0)
}

fn run_extract(config: &TrackerConfig, format: &OutputFormat, file: &Path, sheet: &str) -> Result<i32> {
    let title = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let spreadsheet = read_spreadsheet(file, title)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let worksheet = spreadsheet
        .worksheet(sheet)
        .with_context(|| format!("No worksheet '{}' in {}", sheet, file.display()))?;

    let extractor = GridExtractor::new(config.extraction.range()?);
    let data = extractor.extract(worksheet);

    match format {
        OutputFormat::Human => formatter::print_extracted_human(sheet, &data),
        OutputFormat::Json => formatter::print_extracted_json(sheet, &data)?,
    }
    Ok(0)
}
