use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use statdash::data::dataset::Dataset;
use statdash::processing::descriptive::ColumnSummary;
use statdash::state::session::Session;
use statdash::state::settings::{HeaderMode, Settings};
use statdash::{ColumnSelection, StatOperation, StatisticsEngine};

#[derive(Parser)]
#[command(
    name = "statdash",
    about = "Summary statistics and significance tests for spreadsheet columns",
    version,
    long_about = None
)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Header row handling
    #[arg(long, global = true, value_enum)]
    header: Option<HeaderMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show column types and the first rows of a file
    Preview {
        file: PathBuf,

        /// Rows to show
        #[arg(long)]
        rows: Option<usize>,
    },

    /// List the columns an operation accepts
    Columns {
        file: PathBuf,

        /// Operation, e.g. mean, chi-square, anova
        #[arg(long)]
        op: StatOperation,
    },

    /// Compute one statistic
    Compute {
        file: PathBuf,

        /// Operation, e.g. mean, std-dev, correlation, chi-square, anova
        #[arg(long)]
        op: StatOperation,

        /// Column to analyse (the response column for ANOVA)
        #[arg(long)]
        column: String,

        /// Second column for correlation, chi-square or ANOVA (the factor)
        #[arg(long)]
        with: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Count, range, mean, median and standard deviation of a numeric column
    Describe {
        file: PathBuf,

        #[arg(long)]
        column: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Interactive session reading commands from stdin
    Shell {
        /// File to load on start
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = build_settings(&cli)?;

    match cli.command {
        Commands::Preview { file, rows } => {
            let dataset = open(&file, &settings)?;
            print_preview(&dataset, rows.unwrap_or(settings.preview_rows));
        }
        Commands::Columns { file, op } => {
            let dataset = open(&file, &settings)?;
            for (slot, requirement) in op.requirements().iter().enumerate() {
                let names = dataset.eligible_columns(*requirement);
                println!("{} column {} ({}): {}", op.label(), slot + 1, requirement, names.join(", "));
            }
        }
        Commands::Compute { file, op, column, with, json } => {
            let dataset = open(&file, &settings)?;
            let selection = ColumnSelection { primary: column, secondary: with };
            let result = StatisticsEngine::new(&settings)
                .compute(&dataset, op, &selection)
                .with_context(|| format!("{} on {}", op.label(), selection))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.render(settings.precision));
            }
        }
        Commands::Describe { file, column, json } => {
            let dataset = open(&file, &settings)?;
            let col = dataset.column(&column)
                .with_context(|| format!("no column named '{column}'"))?;
            let summary = ColumnSummary::compute(col)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.report());
            }
        }
        Commands::Shell { file } => {
            let mut session = Session::new(settings);
            if let Some(file) = file {
                let dataset = session.load_file(&file)?;
                println!("Loaded {} rows, {} columns", dataset.row_count(), dataset.columns().len());
            }
            run_shell(&mut session, std::io::stdin().lock())?;
        }
    }

    Ok(())
}

fn build_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(header) = cli.header {
        settings.header = header;
    }
    Ok(settings)
}

fn open(path: &Path, settings: &Settings) -> Result<Dataset> {
    let loaded = statdash::data::loader::load_file(path, settings)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(Dataset::from_loaded(loaded, settings)?)
}

fn print_preview(dataset: &Dataset, rows: usize) {
    println!("{} rows, {} columns", dataset.row_count(), dataset.columns().len());
    println!("{:<24} | Type", "Column");
    println!("{:-<24}-|-{:-<12}", "", "");
    for col in dataset.columns() {
        println!("{:<24} | {}", col.name(), col.column_type());
    }
    println!();
    println!("{}", dataset.column_names().join(" | "));
    for row in dataset.preview(rows) {
        println!("{}", row.join(" | "));
    }
}

const SHELL_HELP: &str = "\
Commands:
  load <path>             load a spreadsheet, replacing the current one
  columns                 list columns and their types
  preview                 show the first rows
  <op> <column> [<with>]  compute: mean, median, mode, variance, std-dev,
                          correlation, chi-square, anova (response, factor)
  last                    show the last result again
  help                    this text
  quit                    leave";

fn run_shell(session: &mut Session, input: impl BufRead) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let args = split_args(&line);
        let Some((command, rest)) = args.split_first() else { continue };

        match command.as_str() {
            "quit" | "exit" => break,
            "help" => println!("{SHELL_HELP}"),
            "load" => match rest {
                [path] => match session.load_file(Path::new(path)) {
                    Ok(ds) => println!("Loaded {} rows, {} columns", ds.row_count(), ds.columns().len()),
                    Err(e) => println!("error: {e}"),
                },
                _ => println!("error: usage: load <path>"),
            },
            "columns" => match session.dataset() {
                Some(ds) => {
                    for col in ds.columns() {
                        println!("{} ({})", col.name(), col.column_type());
                    }
                }
                None => println!("error: no data loaded; load a file first"),
            },
            "preview" => match session.dataset() {
                Some(ds) => print_preview(ds, session.settings().preview_rows),
                None => println!("error: no data loaded; load a file first"),
            },
            "last" => match session.last_result() {
                Some(shown) => println!("{}", shown.result.render(session.settings().precision)),
                None => println!("no result yet"),
            },
            op => {
                let operation = match op.parse::<StatOperation>() {
                    Ok(operation) => operation,
                    Err(e) => {
                        println!("error: {e}");
                        continue;
                    }
                };
                let selection = match rest {
                    [a] => ColumnSelection::single(a.as_str()),
                    [a, b] => ColumnSelection::pair(a.as_str(), b.as_str()),
                    _ => {
                        println!("error: usage: {} <column> [<with>]", operation.key());
                        continue;
                    }
                };
                let precision = session.settings().precision;
                match session.run(operation, selection) {
                    Ok(result) => println!("{}", result.render(precision)),
                    Err(e) => println!("error: {e}"),
                }
            }
        }
    }
    Ok(())
}

/// Split a command line on whitespace, keeping double-quoted runs together.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_arguments_stay_together() {
        assert_eq!(split_args(r#"anova "Sale Price" Model"#), vec!["anova", "Sale Price", "Model"]);
        assert_eq!(split_args("  mean   x "), vec!["mean", "x"]);
        assert_eq!(split_args(r#"mode """#), vec!["mode", ""]);
        assert!(split_args("   ").is_empty());
    }
}
