//! # Precast QA CLI
//!
//! Command-line front end for the QA engine: run a gradation on the spot,
//! log a test into a plant logbook, or compare two stored strand patterns.
//!
//! Set `RUST_LOG=qa_core=debug` to see engine diagnostics.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qa_core::file_io::{load_logbook, save_logbook, FileLock};
use qa_core::gradation::{
    check_compliance, check_limits, compute_gradation, GradationResult, LimitCheck, RawWeight,
};
use qa_core::logbook::QaLogbook;
use qa_core::record::TestSubmission;
use qa_core::sieves::AggregateCatalog;
use qa_core::strands::{format_comparison_for_display, format_comparison_for_report, StrandPosition};
use qa_core::{ComplianceReport, QaError, QaResult};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PositionArg {
    Bottom,
    Top,
}

impl From<PositionArg> for StrandPosition {
    fn from(value: PositionArg) -> Self {
        match value {
            PositionArg::Bottom => StrandPosition::Bottom,
            PositionArg::Top => StrandPosition::Top,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "qa_cli", about = "Precast aggregate and strand QA checks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the built-in aggregate specifications
    Specs,
    /// Compute a gradation without storing it
    Gradation {
        #[arg(short, long)]
        aggregate: String,
        /// Comma-separated weights in grams, largest sieve first (blank = empty sieve)
        #[arg(short, long)]
        weights: String,
        #[arg(long)]
        washed: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Record a gradation test in a logbook
    Submit {
        #[arg(short, long)]
        logbook: PathBuf,
        #[arg(short, long)]
        aggregate: String,
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(short, long)]
        weights: String,
        #[arg(long)]
        washed: Option<String>,
        #[arg(short, long, default_value = "qa")]
        user: String,
        /// Plant name recorded when a new logbook is created
        #[arg(long, default_value = "Precast Plant")]
        plant: String,
    },
    /// Compare two strand patterns stored in a logbook
    Compare {
        #[arg(short, long)]
        logbook: PathBuf,
        #[arg(long)]
        design: Option<String>,
        #[arg(long)]
        cast: Option<String>,
        #[arg(short, long, value_enum, default_value_t = PositionArg::Bottom)]
        position: PositionArg,
        /// Emit Typst markup instead of plain text
        #[arg(long)]
        report: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Specs => {
            print_specs();
            Ok(())
        }
        Commands::Gradation { aggregate, weights, washed, json } => {
            run_gradation(&aggregate, &weights, washed, json)
        }
        Commands::Submit { logbook, aggregate, date, weights, washed, user, plant } => {
            run_submit(&logbook, &plant, aggregate, date, &weights, washed, &user)
        }
        Commands::Compare { logbook, design, cast, position, report } => {
            run_compare(&logbook, design.as_deref(), cast.as_deref(), position.into(), report)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

fn parse_weights(csv: &str) -> Vec<RawWeight> {
    csv.split(',').map(|w| RawWeight::from(w.to_string())).collect()
}

fn print_specs() {
    for spec in &AggregateCatalog::builtin().specifications {
        println!("{} ({})", spec.name, spec.aggregate_class.display_name());
        for sieve in &spec.sieves {
            println!(
                "  {:<6} {:>7.3} mm  {}",
                sieve.name,
                sieve.aperture_mm.0,
                sieve.bounds.label()
            );
        }
        if let Some(max) = spec.max_decant {
            println!("  decant <= {}%", max);
        }
        if let (Some(min), Some(max)) = (spec.min_fineness_modulus, spec.max_fineness_modulus) {
            println!("  fineness modulus {} - {}", min, max);
        }
        println!();
    }
}

#[derive(Serialize)]
struct GradationOutput<'a> {
    gradation: &'a GradationResult,
    compliance: &'a ComplianceReport,
    limits: &'a [LimitCheck],
}

fn run_gradation(
    aggregate: &str,
    weights: &str,
    washed: Option<String>,
    json: bool,
) -> QaResult<()> {
    let spec = AggregateCatalog::builtin().find(aggregate)?;
    let washed = washed.map(RawWeight::from);
    let gradation = compute_gradation(spec, &parse_weights(weights), washed.as_ref())?;
    let compliance = check_compliance(&gradation.sieve_results, &spec.envelope())?;
    let limits = check_limits(spec, &gradation);

    if json {
        let output = GradationOutput {
            gradation: &gradation,
            compliance: &compliance,
            limits: &limits,
        };
        let text = serde_json::to_string_pretty(&output).map_err(|e| QaError::SerializationError {
            reason: e.to_string(),
        })?;
        println!("{}", text);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  GRADATION: {}", gradation.aggregate_name);
    println!("═══════════════════════════════════════");
    println!("  Total weight: {:.1} g", gradation.total_weight.0);
    println!();
    println!("  {:<6} {:>9} {:>9} {:>9} {:>9}", "Sieve", "Wt (g)", "% Ret", "Cum %", "% Pass");
    for r in &gradation.sieve_results {
        println!(
            "  {:<6} {:>9} {:>9} {:>9} {:>9}",
            r.name(),
            r.measurement
                .weight_retained
                .map(|g| format!("{:.1}", g.0))
                .unwrap_or_else(|| "-".into()),
            pct(r.percent_retained),
            pct(r.cumulative_retained),
            pct(r.percent_passing),
        );
    }
    println!();
    if let Some(fm) = gradation.fineness_modulus {
        println!("  Fineness modulus: {:.2}", fm);
    }
    if let Some(decant) = gradation.decant {
        println!("  Decant: {:.2}%", decant);
    }
    for check in &limits {
        println!(
            "  {}: {:.2} vs {:.2} {}",
            check.kind.display_name(),
            check.value,
            check.limit,
            status_icon(check.passes)
        );
    }
    if !compliance.evaluable {
        println!("  Total weight is zero - sample not evaluable");
    }
    for failure in &compliance.failed_sieves {
        println!(
            "  {} passing {:.1}% outside {} (off by {:.1})",
            failure.sieve,
            failure.percent_passing,
            failure.bounds.label(),
            failure.deviation
        );
    }
    println!("═══════════════════════════════════════");
    println!("  ENVELOPE: {}", if compliance.passes_envelope { "PASS" } else { "FAIL" });
    println!("═══════════════════════════════════════");
    Ok(())
}

fn run_submit(
    path: &Path,
    plant: &str,
    aggregate: String,
    date: NaiveDate,
    weights: &str,
    washed: Option<String>,
    user: &str,
) -> QaResult<()> {
    let _lock = FileLock::acquire(path, user)?;
    let mut logbook = if path.exists() {
        load_logbook(path)?
    } else {
        QaLogbook::new(plant, user)
    };

    let mut submission = TestSubmission::new(aggregate, date, parse_weights(weights));
    if let Some(w) = washed {
        submission = submission.with_washed_weight(w);
    }

    let id = logbook.submit_test(&submission)?;
    save_logbook(&logbook, path)?;
    info!(%id, path = %path.display(), "test recorded");

    if let Some(record) = logbook.get_test(&id) {
        println!("Recorded test {}", id);
        println!("  Envelope: {}", if record.passes_envelope { "PASS" } else { "FAIL" });
        for failure in &record.failed_sieves {
            println!(
                "  {} passing {:.1}% outside {}",
                failure.sieve,
                failure.percent_passing,
                failure.bounds.label()
            );
        }
    }
    Ok(())
}

fn run_compare(
    path: &Path,
    design: Option<&str>,
    cast: Option<&str>,
    position: StrandPosition,
    report: bool,
) -> QaResult<()> {
    let logbook = load_logbook(path)?;
    let result = logbook.compare_patterns(design, cast, position)?;
    if report {
        println!("{}", format_comparison_for_report(&result));
    } else {
        println!("{}", format_comparison_for_display(&result));
    }
    Ok(())
}

fn pct(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "n/a".to_string())
}

fn status_icon(pass: bool) -> &'static str {
    if pass { "[OK]" } else { "[FAIL]" }
}
