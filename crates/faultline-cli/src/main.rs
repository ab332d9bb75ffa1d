//! The `faultline` binary: one subcommand per pipeline stage.
//!
//! Stages compose by pipelining files: `cfg`, `gsa`, `instrument` and
//! `parents` work on source text; `aggregate`, `preprocess`, `train` and
//! `rank` work on trace logs and CSV tables. Each stage takes one positional
//! input and an optional output; omitting the output derives it from the
//! input path by extension substitution.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faultline_core::aggregate::{parse_run_file, LogAggregator};
use faultline_core::causal::{parse_raw_csv, preprocess, rank, ranking_to_csv, train_models, ModelStore};
use faultline_core::pipeline;
use faultline_core::transform::parent_map_from_json;
use faultline_core::PipelineConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "faultline", version, about = "Causal fault localization toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the control-flow graph as Graphviz dot
    Cfg {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Rewrite a source file into gated single-assignment form
    Gsa {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Insert value tracing into a GSA source file
    Instrument {
        input: PathBuf,
        output: Option<PathBuf>,
        /// Fallback input value for `main` when no argument is given
        #[arg(long)]
        default_input: Option<i64>,
    },
    /// Emit the parent map of a GSA file as JSON
    Parents {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Aggregate per-test `*.trace` files into the raw execution table
    Aggregate {
        /// Directory of run files: first line test args, second line outcome,
        /// then trace lines
        traces_dir: PathBuf,
        /// Parent-map JSON produced by `parents`
        #[arg(long)]
        parents: PathBuf,
        output: Option<PathBuf>,
    },
    /// Preprocess the raw execution table into numeric columns
    Preprocess {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Train one outcome model per treatment variable
    Train {
        input: PathBuf,
        /// Directory for per-variable model artifacts
        #[arg(long, default_value = "models")]
        models: PathBuf,
    },
    /// Rank treatment variables by counterfactual suspiciousness
    Rank {
        input: PathBuf,
        output: Option<PathBuf>,
        #[arg(long, default_value = "models")]
        models: PathBuf,
        /// Train models before ranking instead of loading artifacts
        #[arg(long)]
        train: bool,
    },
    /// Parse and analyze a source file, printing graph statistics
    Analyze { input: PathBuf },
}

impl Command {
    fn stage_name(&self) -> &'static str {
        match self {
            Command::Cfg { .. } => "cfg",
            Command::Gsa { .. } => "gsa",
            Command::Instrument { .. } => "instrument",
            Command::Parents { .. } => "parents",
            Command::Aggregate { .. } => "aggregate",
            Command::Preprocess { .. } => "preprocess",
            Command::Train { .. } => "train",
            Command::Rank { .. } => "rank",
            Command::Analyze { .. } => "analyze",
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stage = cli.command.stage_name();
    if let Err(err) = run(cli.command) {
        eprintln!("{stage}: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Cfg { input, output } => {
            let source = read(&input)?;
            let dot = pipeline::cfg_dot(&source)?;
            write(&derive_output(&input, output, "dot"), &dot)
        }
        Command::Gsa { input, output } => {
            let source = read(&input)?;
            let gsa = pipeline::gsa_source(&source)?;
            write(&derive_output(&input, output, "gsa.java"), &gsa)
        }
        Command::Instrument {
            input,
            output,
            default_input,
        } => {
            let mut config = PipelineConfig::default();
            if let Some(value) = default_input {
                config.default_input = value;
            }
            let source = read(&input)?;
            let instrumented = pipeline::instrumented_source(&source, &config)?;
            write(&derive_output(&input, output, "inst.java"), &instrumented)
        }
        Command::Parents { input, output } => {
            let source = read(&input)?;
            let json = pipeline::parent_map_json(&source)?;
            write(&derive_output(&input, output, "json"), &json)
        }
        Command::Aggregate {
            traces_dir,
            parents,
            output,
        } => {
            let parent_map = parent_map_from_json(&read(&parents)?)?;
            let mut aggregator = LogAggregator::new(parent_map);

            let mut run_files: Vec<PathBuf> = std::fs::read_dir(&traces_dir)
                .with_context(|| format!("reading {}", traces_dir.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "trace"))
                .collect();
            run_files.sort();
            if run_files.is_empty() {
                anyhow::bail!("no .trace files in {}", traces_dir.display());
            }
            for path in run_files {
                let (args, lines, outcome) = parse_run_file(&read(&path)?)?;
                aggregator.add_test(&args, &lines, outcome);
            }

            let csv = aggregator.to_csv_string()?;
            let output = output.unwrap_or_else(|| traces_dir.join("table.csv"));
            write(&output, &csv)
        }
        Command::Preprocess { input, output } => {
            let table = preprocess(&parse_raw_csv(&read(&input)?)?);
            write(&derive_output(&input, output, "pre.csv"), &table.to_csv_string()?)
        }
        Command::Train { input, models } => {
            let table = preprocess(&parse_raw_csv(&read(&input)?)?);
            let store = ModelStore::new(&models);
            let trained = train_models(&table, &store, &PipelineConfig::default())?;
            println!("trained {} models into {}", trained.len(), models.display());
            Ok(())
        }
        Command::Rank {
            input,
            output,
            models,
            train,
        } => {
            let table = preprocess(&parse_raw_csv(&read(&input)?)?);
            let store = ModelStore::new(&models);
            if train {
                train_models(&table, &store, &PipelineConfig::default())?;
            }
            let scores = rank(&table, &store);
            let csv = ranking_to_csv(&scores)?;
            write(&derive_output(&input, output, "rank.csv"), &csv)
        }
        Command::Analyze { input } => {
            let summary = pipeline::analyze(&read(&input)?)?;
            println!(
                "{}: {} nodes, {} edges, {} controlling nodes, {} tracked definitions",
                input.display(),
                summary.nodes,
                summary.edges,
                summary.cdg_controllers,
                summary.defs_tracked
            );
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
}

/// `foo.java` -> `foo.<ext>` when no explicit output is given.
fn derive_output(input: &Path, output: Option<PathBuf>, ext: &str) -> PathBuf {
    output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        input.with_file_name(format!("{stem}.{ext}"))
    })
}
