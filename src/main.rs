//! fileindex - offline filesystem inventory.
//!
//! Usage:
//!   fidx [ROOTS]...             Index roots and print the report JSON
//!   fidx [ROOTS]... -o NAME     Write NAME.json and NAME_structure.txt
//!   fidx tree [ROOTS]...        Print the directory tree of the indexed files
//!   fidx volumes                List the local volume roots
//!   fidx schema                 Print the JSON schema of the index file
//!   fidx --help                 Show help
//!
//! Pass `*` or `all` as a root to index every local volume.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use strum::VariantNames;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use fileindex_report::{DirectoryTree, ReportWriter, WrittenFiles, index_schema};
use fileindex_scan::{
    IndexConfig, IndexReport, IndexRun, Indexer, LocalVolumes, ScanPhase, SortKey, VolumeSource,
};

/// Records listed in the summary print-out.
const PREVIEW_LIMIT: usize = 10;

#[derive(Parser)]
#[command(
    name = "fileindex",
    version,
    about = "Offline filesystem inventory",
    long_about = "fileindex walks one or more roots, records name, size, timestamps and \
                  attribute flags of every file, and writes a JSON report plus a \
                  directory tree. Existing reports are never overwritten."
)]
struct Cli {
    #[command(flatten)]
    index: IndexArgs,

    /// Output name; writes <NAME>.json and <NAME>_structure.txt (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Field to order files by
    #[arg(
        short,
        long,
        default_value = "path",
        value_parser = PossibleValuesParser::new(SortKey::VARIANTS.iter().copied())
            .map(|s| SortKey::from_name(&s))
    )]
    sort: SortKey,

    /// Directory reports are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the directory tree of the indexed files
    Tree {
        #[command(flatten)]
        index: IndexArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the local volume roots selected by `*` / `all`
    Volumes,

    /// Print the JSON schema of the index file
    Schema,
}

/// Options shared by every command that runs the pipeline.
#[derive(Args)]
struct IndexArgs {
    /// Roots to index (defaults to current directory)
    #[arg(default_value = ".")]
    roots: Vec<String>,

    /// Keep files under system directories such as `$Recycle.Bin`
    #[arg(long)]
    no_exclude: bool,

    /// Additional path segment names to exclude
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,

    /// Records committed between pauses
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause after every batch, in milliseconds
    #[arg(long)]
    batch_delay_ms: Option<u64>,

    /// Resident memory ceiling in MiB (0 disables the check)
    #[arg(long)]
    memory_ceiling_mb: Option<u64>,
}

impl IndexArgs {
    fn config(&self, sort_key: SortKey, output_dir: Option<&PathBuf>) -> Result<IndexConfig> {
        let mut builder = IndexConfig::builder();
        builder.exclude_enabled(!self.no_exclude).sort_key(sort_key);

        if !self.exclude.is_empty() {
            let mut names: Vec<String> = IndexConfig::default().excluded_names;
            names.extend(self.exclude.iter().cloned());
            builder.excluded_names(names);
        }
        if let Some(size) = self.batch_size {
            builder.batch_size(size);
        }
        if let Some(ms) = self.batch_delay_ms {
            builder.batch_delay(Duration::from_millis(ms));
        }
        if let Some(mb) = self.memory_ceiling_mb {
            builder.memory_ceiling(mb.saturating_mul(1024 * 1024));
        }
        if let Some(dir) = output_dir {
            builder.output_dir(dir.clone());
        }

        builder.build().context("Invalid configuration")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Some(Command::Tree { index, format }) => {
            run_tree(&index, format)?;
        }
        Some(Command::Volumes) => {
            run_volumes();
        }
        Some(Command::Schema) => {
            println!("{}", serde_json::to_string_pretty(&index_schema())?);
        }
        None => {
            let config = cli.index.config(cli.sort, cli.output_dir.as_ref())?;
            run_index(&cli.index.roots, config, cli.output.as_deref())?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let default = if verbose {
        "fileindex=debug,fileindex_core=debug,fileindex_scan=debug,fileindex_report=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Index roots, then write or print the report.
fn run_index(roots: &[String], config: IndexConfig, output: Option<&str>) -> Result<()> {
    let sort_key = config.sort_key;
    let writer = ReportWriter::from_config(&config);

    let run = index_with_progress(roots, config);
    report_warnings(&run);
    let report = run.into_report(sort_key);

    match output {
        Some(name) => {
            let written = writer
                .write(&report, name)
                .with_context(|| format!("Could not save report '{name}'; choose another output name"))?;
            print_summary(&report, &written);
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Print the directory tree of the indexed files.
fn run_tree(index: &IndexArgs, format: OutputFormat) -> Result<()> {
    let config = index.config(SortKey::Path, None)?;
    let run = index_with_progress(&index.roots, config);
    report_warnings(&run);
    let tree = DirectoryTree::from_report(&run.into_report(SortKey::Path));

    match format {
        OutputFormat::Text => println!("{}", tree.render()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
    }

    Ok(())
}

/// List volume roots.
fn run_volumes() {
    let roots = LocalVolumes.volume_roots();
    if roots.is_empty() {
        println!("No volumes found.");
    }
    for root in roots {
        println!("{}", root.display());
    }
}

/// Run the pipeline while drawing a progress line on stderr.
fn index_with_progress(roots: &[String], config: IndexConfig) -> IndexRun {
    let indexer = Indexer::new(config);
    let mut progress_rx = indexer.subscribe();

    eprintln!("Indexing {}...", roots.join(", "));

    let display = thread::spawn(move || {
        loop {
            match progress_rx.blocking_recv() {
                Ok(progress) => {
                    match progress.phase {
                        ScanPhase::Scanning => {
                            eprint!("\r Found {} files", progress.files_found);
                        }
                        ScanPhase::Committing => {
                            eprint!(
                                "\r Committed {}/{} files ({:.0}%)   ",
                                progress.files_committed,
                                progress.files_found.saturating_sub(progress.files_excluded),
                                progress.commit_ratio() * 100.0
                            );
                        }
                        ScanPhase::Done => {
                            eprintln!(
                                "\r Indexed {} of {} files in {:.2}s   ",
                                progress.files_committed,
                                progress.files_found,
                                progress.elapsed.as_secs_f64()
                            );
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "progress display lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let run = indexer.run(roots);
    drop(indexer);
    if display.join().is_err() {
        warn!("progress display thread panicked");
    }
    run
}

fn report_warnings(run: &IndexRun) {
    for warning in &run.warnings {
        debug!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
    }
    if !run.warnings.is_empty() {
        eprintln!("{} warning(s) during indexing", run.warnings.len());
    }
    if run.files_excluded > 0 {
        eprintln!("{} file(s) under excluded directories skipped", run.files_excluded);
    }
}

/// Print totals and the first records of a written report.
fn print_summary(report: &IndexReport, written: &WrittenFiles) {
    let summary = &report.summary;

    println!();
    println!("{}", "─".repeat(70));
    println!(" Index Summary");
    println!("{}", "─".repeat(70));
    println!(" Total files:   {}", summary.total_files);
    println!(" Total size:    {}", format_size(summary.total_size));
    println!(" Indexed paths: {}", summary.indexed_paths.join(", "));
    println!(" Timestamp:     {}", summary.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!();
    println!(" Index file:     {}", written.index_file.display());
    println!(" Structure file: {}", written.structure_file.display());
    println!();

    if report.is_empty() {
        println!(" No files indexed.");
        return;
    }

    println!(" First {} files:", PREVIEW_LIMIT.min(report.files.len()));
    for file in report.files.iter().take(PREVIEW_LIMIT) {
        println!(
            "   {:<40} {:>10}  {}",
            truncate(&file.path, 40),
            format_size(file.size),
            file.modified_time.format("%Y-%m-%d %H:%M")
        );
    }
    let remaining = report.files.len().saturating_sub(PREVIEW_LIMIT);
    if remaining > 0 {
        println!("   ... and {} more", remaining);
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length, keeping the tail.
fn truncate(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 1)).collect();
        format!("…{tail}")
    }
}
