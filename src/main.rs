use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pevector::classify::ClassifierHandle;
use pevector::config::{ExtractorConfig, ScanConfig};
use pevector::features::Extractor;
use pevector::report::OutputFormat;
use pevector::scan::{run_scan, ScanProgress};
use pevector::sniff::is_pe_path;

#[derive(Parser)]
#[command(name = "pevector", version, about = "PE feature extraction for malware triage")]
struct Cli {
    /// Enable debug logging on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the feature vector of a single PE file as JSON.
    Extract {
        /// File to analyze.
        file: PathBuf,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Scan files and directories, reporting per-file outcomes.
    Scan {
        /// Files or directories to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format.
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Maximum file size in bytes; larger files are reported as failed.
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Follow symbolic links while walking directories.
        #[arg(long)]
        follow_symlinks: bool,

        /// Worker thread count; defaults to the rayon global pool.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Check whether a file starts with the MZ signature.
    Check {
        /// File to check.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    pevector::logging::init_tracing(if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Extract { file, pretty } => {
            let extractor = Extractor::new(ExtractorConfig::default());
            let features = extractor
                .extract_path(&file)
                .with_context(|| format!("failed to extract {}", file.display()))?;
            let json = if pretty {
                features.to_json_pretty()?
            } else {
                features.to_json()?
            };
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }

        Command::Scan {
            paths,
            format,
            max_file_size,
            follow_symlinks,
            threads,
        } => {
            let mut config = ScanConfig {
                follow_symlinks,
                threads,
                ..ScanConfig::default()
            };
            if let Some(limit) = max_file_size {
                config.extractor.io.max_file_size = limit;
            }

            let classifier: Option<ClassifierHandle> = None;
            let progress = ScanProgress::new();
            let report = run_scan(&paths, &config, classifier.as_ref(), &progress)?;

            match format {
                OutputFormat::Text => print!("{}", report.render_text()),
                OutputFormat::Json => println!("{}", report.render_json()?),
            }

            if report.failed_count() > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Command::Check { file } => {
            if is_pe_path(&file) {
                println!("PE");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("not PE");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
