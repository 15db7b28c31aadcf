use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, LevelFilter};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use umitrans::{transfer_umis, MergeConfig, DEFAULT_SEPARATOR};

const PROGRAM_NAME: &str = "umitrans";
const EXIT_FILE_IO_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(
    name = PROGRAM_NAME,
    author,
    version,
    about = "Transfer UMI sequences from a FASTQ file to read IDs in one or more FASTQ files"
)]
struct Args {
    /// Record program progress in LOG_FILE
    #[arg(long, value_name = "LOG_FILE")]
    log: Option<PathBuf>,

    /// FASTQ file containing UMI sequences
    #[arg(long, value_name = "FILE")]
    umi: PathBuf,

    /// Separator between read ID and UMI
    #[arg(long, value_name = "STR", default_value = DEFAULT_SEPARATOR)]
    sep: String,

    /// Input FASTQ files; each FILE is annotated into FILE.umi
    #[arg(long, value_name = "FILE", num_args = 1.., required = true)]
    seq: Vec<PathBuf>,

    /// Log progress to stderr and print a per-file summary
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Show a progress spinner on stderr
    #[arg(long, default_value_t = false)]
    progress: bool,
}

/// Set up the global logger.
///
/// With a log file, everything down to `debug` goes to that file, starting
/// with the command line. Otherwise warnings (or `info` with `--verbose`) go
/// to stderr.
fn init_logging(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let mut builder = Builder::new();
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .filter_level(LevelFilter::Debug)
                .target(Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(if verbose {
                LevelFilter::Info
            } else {
                LevelFilter::Warn
            });
        }
    }
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} - {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .context("Failed to initialise logging")?;

    if log_file.is_some() {
        info!("program started");
        info!(
            "command line: {}",
            std::env::args().collect::<Vec<_>>().join(" ")
        );
    }
    Ok(())
}

fn progress_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "{spinner} {pos} records [{elapsed_precise}]",
    )?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn run(args: &Args) -> Result<()> {
    let config = MergeConfig::new(&args.umi, args.seq.clone()).with_separator(args.sep.as_str());

    let start = std::time::Instant::now();
    let spinner = if args.progress {
        Some(progress_spinner()?)
    } else {
        None
    };

    let summary = transfer_umis(&config, |n| {
        if let Some(pb) = &spinner {
            pb.set_position(n);
        }
    })?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    // target, written, mismatched, unpaired
    if args.verbose {
        for t in &summary.targets {
            println!(
                "{}\t{}\t{}\t{}",
                t.output.display(),
                t.written,
                t.mismatched,
                t.unpaired()
            );
        }
        println!("Elapsed: {:.3}s", start.elapsed().as_secs_f64());
    }
    info!("program finished");
    Ok(())
}

/// CLI entry point: parse args, set up logging, and annotate every `--seq`
/// file. Fatal errors are reported on stderr and exit with status 1.
fn main() {
    let args = Args::parse();

    let outcome = init_logging(args.log.as_deref(), args.verbose).and_then(|_| run(&args));
    if let Err(e) = outcome {
        error!("{:#}", e);
        eprintln!("{} ERROR: {:#}, exiting", PROGRAM_NAME, e);
        std::process::exit(EXIT_FILE_IO_ERROR);
    }
}
