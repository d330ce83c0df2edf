use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

mod aggregate;
mod banding;
mod config;
mod eligibility;
mod error;
mod logging;
mod models;
mod normalize;
mod pipeline;
mod reconcile;
mod redistribute;
mod report;
mod tables;

use config::{AggregationStrategy, RunConfig};
use pipeline::GradeRun;
use reconcile::Reconciliation;

#[derive(Parser)]
#[command(name = "gradebook-reconcile")]
#[command(about = "Compute course marks from assignment scores and reconcile them with the gradebook export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Assignment scores export (CSV)
    #[arg(long)]
    assignments: PathBuf,
    /// Marking period to include; repeat for several (falls back to GRADEBOOK_TERMS)
    #[arg(long = "term")]
    terms: Vec<String>,
    #[arg(long, value_enum, default_value_t = AggregationStrategy::Redistributed)]
    strategy: AggregationStrategy,
}

#[derive(Args)]
struct GradebookArgs {
    /// Course/section crossover table (CSV)
    #[arg(long)]
    crossover: PathBuf,
    /// Gradebook export with hand-entered marks (CSV or XLSX)
    #[arg(long)]
    egg: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute final marks per student and course section
    Compute {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Output file; defaults to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge computed marks into the gradebook export
    Reconcile {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        gradebook: GradebookArgs,
        #[arg(long, default_value = "egg_output.csv")]
        out: PathBuf,
    },
    /// Generate a markdown summary of a reconciliation run
    Report {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        gradebook: GradebookArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn compute(run: &RunArgs) -> anyhow::Result<(RunConfig, GradeRun)> {
    let config = RunConfig::from_env(run.terms.clone(), run.strategy);
    let records = tables::load_assignments(&run.assignments)
        .with_context(|| format!("failed to load {}", run.assignments.display()))?;
    let result = pipeline::compute_grades(&records, &config).context("grading run aborted")?;
    Ok((config, result))
}

fn reconcile_with(
    result: &GradeRun,
    gradebook: &GradebookArgs,
) -> anyhow::Result<(Vec<String>, Reconciliation)> {
    let crossover = tables::load_crossover(&gradebook.crossover)
        .with_context(|| format!("failed to load {}", gradebook.crossover.display()))?;
    let book = tables::load_external_gradebook(&gradebook.egg)
        .with_context(|| format!("failed to load {}", gradebook.egg.display()))?;
    let reconciliation = reconcile::reconcile(&result.grades, &crossover, &book);
    Ok((book.headers, reconciliation))
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compute { run, format, out } => {
            let (_, result) = compute(&run)?;
            match (&out, format) {
                (Some(path), OutputFormat::Csv) => {
                    tables::write_grades_csv(create(path)?, &result.grades)?
                }
                (Some(path), OutputFormat::Json) => {
                    tables::write_grades_json(create(path)?, &result.grades)?
                }
                (None, OutputFormat::Csv) => {
                    tables::write_grades_csv(io::stdout().lock(), &result.grades)?
                }
                (None, OutputFormat::Json) => {
                    tables::write_grades_json(io::stdout().lock(), &result.grades)?
                }
            }
            if let Some(path) = out {
                eprintln!("Wrote {} marks to {}.", result.grades.len(), path.display());
            }
        }
        Commands::Reconcile {
            run,
            gradebook,
            out,
        } => {
            let (_, result) = compute(&run)?;
            let (headers, reconciliation) = reconcile_with(&result, &gradebook)?;
            tables::write_reconciled_csv(create(&out)?, &headers, &reconciliation)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Reconciled {} gradebook rows into {}.",
                reconciliation.records.len(),
                out.display()
            );
        }
        Commands::Report {
            run,
            gradebook,
            out,
        } => {
            let (config, result) = compute(&run)?;
            let (_, reconciliation) = reconcile_with(&result, &gradebook)?;
            let report =
                report::build_report(&config, &result, &reconciliation, chrono::Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
