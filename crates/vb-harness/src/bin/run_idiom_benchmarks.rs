#![forbid(unsafe_code)]

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use vb_harness::report::{
    RunSummary, build_artifact, render_json, render_text, write_report_json,
};
use vb_harness::{
    CatalogSizes, Harness, HarnessConfig, RunMode, install_builtin_catalog, logging,
    registered_cases, with_registry,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Time slow reference idioms against their vectorized candidates"
)]
struct Cli {
    /// Cases to run (repeatable or comma separated); all cases when omitted
    #[arg(long = "case", value_delimiter = ',')]
    cases: Vec<String>,

    /// Skip the untimed warmup call before measuring
    #[arg(long)]
    no_warmup: bool,

    /// Verify equivalence only; no warmup and no speedup figures
    #[arg(long)]
    check_only: bool,

    /// Timed repetitions per implementation
    #[arg(long)]
    repetitions: Option<usize>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// JSON report path (defaults to artifacts/reports/)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Use small inputs
    #[arg(long)]
    smoke: bool,

    /// Tracing filter, e.g. `info` or `vb_harness=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Exit with status 1 when any candidate mismatches or fails
    #[arg(long)]
    fail_on_mismatch: bool,

    /// Print the registered cases and exit
    #[arg(long)]
    list: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("run_idiom_benchmarks failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_level.as_deref())?;

    let mut cfg = HarnessConfig::from_env().map_err(|err| err.to_string())?;
    if cli.smoke {
        cfg.sizes = CatalogSizes::smoke();
    }
    if let Some(repetitions) = cli.repetitions {
        cfg.options.repetitions = repetitions;
    }
    if cli.no_warmup {
        cfg.options.warmup = false;
    }
    if cli.check_only {
        cfg.options.mode = RunMode::CheckOnly;
    }
    if let Some(output) = cli.output {
        cfg.report_path = output;
    }

    install_builtin_catalog(&cfg.sizes).map_err(|err| err.to_string())?;

    if cli.list {
        with_registry(|catalog| {
            for case in catalog.iter() {
                println!("{:<30} {}", case.name(), case.description());
            }
        });
        return Ok(());
    }

    let mut harness = Harness::new(&cfg.options).map_err(|err| err.to_string())?;
    let cases = registered_cases(&cli.cases).map_err(|err| err.to_string())?;
    let reports = harness.run_cases(&cases);

    let artifact = build_artifact(
        &cfg.repo_root,
        harness.plan().mode,
        &reports,
        harness.ledger().events(),
    );
    match cli.format {
        OutputFormat::Table => print!("{}", render_text(&reports)),
        OutputFormat::Json => {
            let raw = render_json(&artifact).map_err(|err| err.to_string())?;
            println!("{raw}");
        }
    }
    write_report_json(&cfg.report_path, &artifact).map_err(|err| err.to_string())?;
    eprintln!("wrote {}", cfg.report_path.display());

    let summary = RunSummary::from_reports(&reports);
    if cli.fail_on_mismatch && !summary.all_passed() {
        return Err(format!(
            "{} mismatched, {} errored, {} failed cases",
            summary.mismatched, summary.errored, summary.failed_cases
        ));
    }
    Ok(())
}
