use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use dsm_core::analyzer::LanguageAnalyzer;
use dsm_core::cancel::CancellationToken;
use dsm_core::config::PipelineConfig;
use dsm_core::fetch::Fetcher;
use dsm_core::pipeline::Orchestrator;
use dsm_core::progress::Frame;

use dsm_fetch::GitFetcher;
use dsm_lang_cpp::CppAnalyzer;
use dsm_lang_csharp::CsharpAnalyzer;
use dsm_lang_go::GoAnalyzer;
use dsm_lang_java::JavaAnalyzer;
use dsm_lang_js::JsAnalyzer;
use dsm_lang_python::PythonAnalyzer;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "dsm")]
#[command(about = "Fetch a repository and emit its Design Structure Matrix")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone a repository and emit its DSM payload
    Analyze {
        /// Repository URL (any scheme the VCS supports: https, ssh, file)
        url: String,
        /// Config file path (defaults to dsm.toml in the current directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Compact JSON (single line, no pretty-printing)
        #[arg(long)]
        compact: bool,
        /// Exclude test files from analysis
        #[arg(long)]
        no_tests: bool,
        /// Admitted-file count above which symbol-usage weighting is
        /// skipped in favor of the large-repo fast path
        #[arg(long)]
        large_repo_threshold: Option<usize>,
        /// Maximum repository size to fetch, in MiB
        #[arg(long)]
        max_repo_size_mib: Option<u64>,
        /// Suppress progress messages on stderr
        #[arg(long)]
        quiet: bool,
    },
    /// Create a default dsm.toml configuration file
    Init {
        /// Overwrite an existing dsm.toml
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            url,
            config,
            format,
            compact,
            no_tests,
            large_repo_threshold,
            max_repo_size_mib,
            quiet,
        } => run_analyze(
            &url,
            config,
            format,
            compact,
            no_tests,
            large_repo_threshold,
            max_repo_size_mib,
            quiet,
        ),
        Commands::Init { force } => run_init(force),
    };

    if let Err(e) = result {
        eprintln!("{}: {e:#}", "Error".red().bold());
        process::exit(2);
    }
}

fn build_analyzers() -> Result<Vec<Box<dyn LanguageAnalyzer>>> {
    Ok(vec![
        Box::new(GoAnalyzer::new().context("failed to init Go analyzer")?),
        Box::new(JavaAnalyzer::new().context("failed to init Java analyzer")?),
        Box::new(CsharpAnalyzer::new().context("failed to init C# analyzer")?),
        Box::new(PythonAnalyzer::new().context("failed to init Python analyzer")?),
        Box::new(CppAnalyzer::new().context("failed to init C/C++ analyzer")?),
        Box::new(JsAnalyzer::new().context("failed to init JS/TS analyzer")?),
    ])
}

fn run_init(force: bool) -> Result<()> {
    let path = std::path::Path::new("dsm.toml");
    if path.exists() && !force {
        anyhow::bail!("dsm.toml already exists (use --force to overwrite)");
    }
    std::fs::write(path, PipelineConfig::default_toml()).context("failed to write dsm.toml")?;
    println!("{} wrote dsm.toml", "OK".green().bold());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    url: &str,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    compact: bool,
    no_tests: bool,
    large_repo_threshold: Option<usize>,
    max_repo_size_mib: Option<u64>,
    quiet: bool,
) -> Result<()> {
    let base = match config_path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::load_or_default(&std::env::current_dir()?),
    };
    let config = PipelineConfig {
        include_tests: if no_tests { false } else { base.include_tests },
        large_repo_threshold: large_repo_threshold.unwrap_or(base.large_repo_threshold),
        max_repo_size_mib: max_repo_size_mib.unwrap_or(base.max_repo_size_mib),
        ..base
    };

    let fetcher: Box<dyn Fetcher> = Box::new(GitFetcher::new());
    let analyzers = build_analyzers()?;
    let orchestrator = Orchestrator::new(fetcher, analyzers, config);

    let (progress_tx, progress_rx) = dsm_core::progress::channel();
    let cancel = CancellationToken::new();

    let url_owned = url.to_string();
    let cancel_for_run = cancel.clone();
    let handle = std::thread::spawn(move || orchestrator.run(&url_owned, &progress_tx, &cancel_for_run));

    for frame in progress_rx.iter() {
        match frame {
            Frame::Progress(message) => {
                if !quiet {
                    eprintln!("{} {message}", "...".dimmed());
                }
            }
            Frame::Error(message) => {
                anyhow::bail!(message);
            }
            Frame::Complete(payload) => {
                let rendered = match format {
                    OutputFormat::Text => dsm_report::text::format_payload(&payload),
                    OutputFormat::Json => dsm_report::json::format_payload(&payload, compact),
                };
                println!("{rendered}");
                return Ok(());
            }
        }
    }

    // The channel closed without an error or complete frame only if the
    // worker thread panicked; surface whatever it returned (or its panic).
    match handle.join() {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => anyhow::bail!("analysis worker thread panicked"),
    }
}
