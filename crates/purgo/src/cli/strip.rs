//! The `purgo strip` command.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::Style;
use purgo_core::{Config, DiscoveredFile, FileDiscovery, ItemId, ItemOutcome, Session};

/// Arguments for the `strip` command.
#[derive(Args, Debug)]
pub struct StripArgs {
    /// Files or directories to strip
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the clean copies are written to (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also pick up files without an image extension when walking directories
    #[arg(long)]
    pub all: bool,

    /// Number of parallel workers (defaults to the config value)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Remove embedded ICC colour profiles as well
    #[arg(long)]
    pub drop_icc: bool,

    /// Skip decoding source and output to compare pixels
    #[arg(long)]
    pub no_verify: bool,

    /// Fail non-image files instead of copying them untouched
    #[arg(long)]
    pub no_passthrough: bool,

    /// Print the export report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl StripArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        if self.drop_icc {
            config.strip.retain_icc_profile = false;
        }
        if self.no_verify {
            config.strip.verify_pixels = false;
        }
        if self.no_passthrough {
            config.strip.passthrough_unsupported = false;
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    stripped: u64,
    passed_through: u64,
    duplicates: u64,
    failed: u64,
    blocks_removed: u64,
    bytes_removed: u64,
}

/// Execute the strip command.
pub async fn execute(args: StripArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);

    let files = FileDiscovery::new(args.all).discover_all(args.inputs.iter().map(PathBuf::as_path));
    if files.is_empty() {
        tracing::warn!("No files found in {:?}", args.inputs);
        return Ok(());
    }
    tracing::info!(
        "Found {} file(s), {:.1} MB",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );

    let session = Session::new(config)?;
    let start = Instant::now();
    let progress = create_progress_bar(files.len() as u64);

    let mut tally = Tally::default();
    let completed = run_files(&session, &files, &progress, &mut tally).await;
    progress.finish_and_clear();

    let report = session.export_many(&completed, &args.output)?;
    tally.failed += report.failed.len() as u64;
    for failure in &report.failed {
        tracing::error!("Export failed for {}: {}", failure.id, failure.message);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    print_summary(&tally, report.written.len(), start.elapsed(), &args.output);

    session.shutdown().await;

    if tally.failed > 0 {
        anyhow::bail!("{} file(s) could not be cleaned", tally.failed);
    }
    Ok(())
}

/// Submit every file, then collect outcomes in submission order.
async fn run_files(
    session: &Session,
    files: &[DiscoveredFile],
    progress: &indicatif::ProgressBar,
    tally: &mut Tally,
) -> Vec<ItemId> {
    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        match tokio::fs::read(&file.path).await {
            Ok(payload) => {
                let name = file.path.to_string_lossy().into_owned();
                handles.push((file, session.submit(name, payload).await));
            }
            Err(e) => {
                tally.failed += 1;
                progress.inc(1);
                tracing::error!("Failed to read {:?}: {}", file.path, e);
            }
        }
    }

    let mut completed = Vec::with_capacity(handles.len());
    for (file, handle) in handles {
        match handle.wait().await {
            ItemOutcome::Completed(item) => {
                if item.outcome.is_pass_through() {
                    tally.passed_through += 1;
                    tracing::info!("Copied {:?} untouched (not a supported image)", file.path);
                } else {
                    tally.stripped += 1;
                    let removed = item.outcome.removed();
                    tally.blocks_removed += removed.len() as u64;
                    tally.bytes_removed += removed.iter().map(|b| b.len as u64).sum::<u64>();
                }
                completed.push(item.id);
            }
            ItemOutcome::Ignored => {
                tally.duplicates += 1;
                tracing::debug!("Skipped duplicate {:?}", file.path);
            }
            ItemOutcome::Failed(kind) => {
                tally.failed += 1;
                tracing::error!("Failed: {:?} - {}", file.path, kind);
            }
            ItemOutcome::Discarded => {
                tally.failed += 1;
                tracing::warn!("Discarded: {:?}", file.path);
            }
        }
        progress.inc(1);
    }
    completed
}

/// Create a progress bar for the strip run.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

fn print_summary(tally: &Tally, written: usize, elapsed: Duration, output: &std::path::Path) {
    let bold = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();
    let error = Style::new().for_stderr().red();

    eprintln!();
    eprintln!("  {}", bold.apply_to("Summary"));
    eprintln!("    Stripped:       {:>8}", tally.stripped);
    if tally.passed_through > 0 {
        eprintln!(
            "    {}",
            warn.apply_to(format!("Passed through: {:>8}", tally.passed_through))
        );
    }
    if tally.duplicates > 0 {
        eprintln!("    Duplicates:     {:>8}", tally.duplicates);
    }
    if tally.failed > 0 {
        eprintln!(
            "    {}",
            error.apply_to(format!("Failed:         {:>8}", tally.failed))
        );
    }
    eprintln!(
        "    Removed:        {:>8} blocks ({:.1} KB)",
        tally.blocks_removed,
        tally.bytes_removed as f64 / 1000.0
    );
    eprintln!(
        "    {}",
        dim.apply_to(format!(
            "Wrote {} file(s) to {} in {:.2}s",
            written,
            output.display(),
            elapsed.as_secs_f64()
        ))
    );
    eprintln!();
}
