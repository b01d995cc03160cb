//! protodrift - Find unknown protobuf fields in stored messages
//!
//! This tool decodes stored messages against a descriptor set and reports
//! every record carrying fields the schema does not know about. It can also
//! write copies with the unknown data stripped.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use protodrift_core::prost_reflect::MessageDescriptor;
use protodrift_core::scanner::unknown_field_sites;
use protodrift_core::{
    decode_records, drop_unknown_fields, encode_records, find_message, has_unknown_fields,
    load_descriptor_pool, Framing, UnknownFieldSite,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Find unknown protobuf fields in stored messages
#[derive(Parser, Debug)]
#[command(name = "protodrift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Encoded FileDescriptorSet describing the stored messages
    #[arg(short = 's', long, env = "PROTODRIFT_DESCRIPTOR_SET")]
    descriptor_set: PathBuf,

    /// Fully-qualified name of the stored message type
    #[arg(short, long)]
    message: String,

    /// Files hold varint length-delimited records instead of one message
    #[arg(long)]
    delimited: bool,

    /// Only process files with this extension in directory mode
    #[arg(long)]
    extension: Option<String>,

    /// Write copies with unknown fields removed
    #[arg(long)]
    strip: bool,

    /// Output directory for stripped copies
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Dry run - don't write files, just show what would be written
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Exit with an error if any record has unknown fields
    #[arg(long)]
    deny_unknown: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single file of stored messages
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of stored message files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per drifted message: `path#index: Type fields [n, ...]`
    Text,
    /// Just the path of each file with drift (for scripting)
    Filename,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Stats {
    files: usize,
    records: usize,
    drifted: usize,
    failed: usize,
    written: usize,
}

/// Outcome of checking one file
#[derive(Debug)]
struct FileReport {
    records: usize,
    /// Record index and drift site, in record order
    sites: Vec<(usize, UnknownFieldSite)>,
    drifted: usize,
    /// Re-encoded records with unknown fields removed, if requested and needed
    stripped: Option<Vec<u8>>,
}

impl Cli {
    fn framing(&self) -> Framing {
        if self.delimited {
            Framing::Delimited
        } else {
            Framing::Single
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stats = run(&cli)?;
    info!(
        "Summary: {} files, {} records, {} with unknown fields, {} failed, {} written",
        stats.files, stats.records, stats.drifted, stats.failed, stats.written
    );

    if cli.deny_unknown && stats.drifted > 0 {
        bail!("{} record(s) contain unknown fields", stats.drifted);
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<Stats> {
    let pool = load_descriptor_pool(&cli.descriptor_set).with_context(|| {
        format!(
            "Failed to load descriptor set: {}",
            cli.descriptor_set.display()
        )
    })?;
    let descriptor = find_message(&pool, &cli.message)?;

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(cli, &descriptor, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(cli, &descriptor, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single message file
fn process_single_file(cli: &Cli, descriptor: &MessageDescriptor, file: &Path) -> Result<Stats> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let relative = file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| file.to_path_buf());

    let mut stats = Stats::default();
    process_file(cli, descriptor, file, &relative, &mut stats)?;
    Ok(stats)
}

/// Process a directory of message files recursively
fn process_directory(
    cli: &Cli,
    descriptor: &MessageDescriptor,
    directory: &Path,
) -> Result<Stats> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut stats = Stats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || is_hidden(path) {
            continue;
        }

        if !matches_extension(path, cli.extension.as_deref()) {
            trace!("Skipping by extension: {}", path.display());
            continue;
        }

        let relative = path.strip_prefix(directory).unwrap_or(path);

        debug!("Processing: {}", path.display());
        if let Err(e) = process_file(cli, descriptor, path, relative, &mut stats) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
            stats.failed += 1;
        }
    }

    info!("Processed {} files", stats.files);
    Ok(stats)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
    match extension {
        None => true,
        Some(wanted) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
            .unwrap_or(false),
    }
}

/// Check one file, print its report and write the stripped copy if asked
fn process_file(
    cli: &Cli,
    descriptor: &MessageDescriptor,
    path: &Path,
    relative: &Path,
    stats: &mut Stats,
) -> Result<()> {
    trace!("Reading {}", path.display());
    let data =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let report = inspect(descriptor, &data, cli.framing(), cli.strip)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    stats.files += 1;
    stats.records += report.records;
    stats.drifted += report.drifted;

    match cli.format {
        OutputFormat::Text => {
            for (index, site) in &report.sites {
                println!(
                    "{}#{}: {} fields {:?}",
                    path.display(),
                    index,
                    site.message,
                    site.field_numbers
                );
            }
        }
        OutputFormat::Filename => {
            if report.drifted > 0 {
                println!("{}", path.display());
            }
        }
    }

    if let Some(stripped) = report.stripped {
        let output_path = cli.output.join(relative);
        if cli.dry_run {
            println!("Would write: {}", output_path.display());
        } else {
            write_output(&output_path, &stripped, cli.force)?;
            info!("Wrote {}", output_path.display());
            stats.written += 1;
        }
    }

    Ok(())
}

/// Decode every record in `data` and collect where unknown fields live
fn inspect(
    descriptor: &MessageDescriptor,
    data: &[u8],
    framing: Framing,
    strip: bool,
) -> protodrift_core::Result<FileReport> {
    let mut records = decode_records(descriptor, data, framing)?;

    let mut sites = Vec::new();
    let mut drifted = 0;
    for (index, record) in records.iter().enumerate() {
        if has_unknown_fields(record) {
            drifted += 1;
            sites.extend(unknown_field_sites(record).into_iter().map(|s| (index, s)));
        }
    }

    let stripped = if strip && drifted > 0 {
        records.iter_mut().for_each(drop_unknown_fields);
        Some(encode_records(&records, framing))
    } else {
        None
    };

    Ok(FileReport {
        records: records.len(),
        sites,
        drifted,
        stripped,
    })
}

/// Write a stripped copy, creating parent directories
fn write_output(output_path: &Path, content: &[u8], force: bool) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}
