//! Diagnosis pipeline CLI
//!
//! Command-line interface for running the workflow, exploring a dataset and
//! predicting with a saved pipeline.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::WorkflowConfig;
use crate::data::{synthetic, DataLoader, DataSaver, Dataset};
use crate::exploration::class_counts;
use crate::export::{load_pipeline, SerializationFormat};
use crate::report;
use crate::workflow::Workflow;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Print a multi-line block indented under the current section
fn block(text: &str) {
    for line in text.lines() {
        println!("  {}", line);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "diagnosis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Breast-cancer diagnosis workflow: explore, select, evaluate, export")]
#[command(long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full workflow and write the model artifact
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV dataset (overrides the configured path)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Artifact path (overrides the configured path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use generated data instead of reading a file
        #[arg(long)]
        synthetic: bool,

        /// Artifact format (binary, json)
        #[arg(long)]
        format: Option<String>,
    },

    /// Print class balance, descriptive statistics and mutual information
    Explore {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV dataset (overrides the configured path)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Use generated data instead of reading a file
        #[arg(long)]
        synthetic: bool,
    },

    /// Predict with a saved pipeline
    Predict {
        /// Artifact written by `run`
        #[arg(short, long)]
        model: PathBuf,

        /// CSV with the feature columns
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV with an added `prediction` column
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> anyhow::Result<WorkflowConfig> {
    Ok(match path {
        Some(path) => WorkflowConfig::from_file(path)?,
        None => WorkflowConfig::default(),
    })
}

fn parse_format(format: &str) -> anyhow::Result<SerializationFormat> {
    match format {
        "binary" | "bin" => Ok(SerializationFormat::Binary),
        "json" => Ok(SerializationFormat::Json),
        _ => anyhow::bail!("Unsupported artifact format: {}", format),
    }
}

/// Load the configured dataset, or generate one when `synthetic` is set
pub fn load_data(config: &WorkflowConfig, synthetic: bool) -> anyhow::Result<Dataset> {
    step_run("Loading data");
    let start = Instant::now();
    let dataset = if synthetic {
        synthetic::breast_cancer_like_default(config.split.random_state)?
    } else {
        DataLoader::new().load(&config.data)?
    };
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        dataset.n_samples(),
        dataset.n_features(),
        start.elapsed()
    ));
    Ok(dataset)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    config_path: Option<&Path>,
    data_path: Option<&Path>,
    output: Option<&Path>,
    synthetic: bool,
    format: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = data_path {
        config.data.path = path.to_path_buf();
    }
    if let Some(path) = output {
        config.export.path = path.to_path_buf();
    }
    if let Some(format) = format {
        config.export.format = parse_format(format)?;
    }
    config.validate()?;

    section("Run");
    let dataset = load_data(&config, synthetic)?;

    step_run("Running workflow");
    let start = Instant::now();
    let workflow = Workflow::new(config);
    let outcome = workflow.run(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    section("Exploration");
    block(&report::render_exploration(&outcome.exploration));

    section("Model selection");
    block(&report::render_search(&outcome.search));

    section("Evaluation");
    let names = &workflow.config().exploration.target_names;
    block(&report::render_evaluation(&outcome.evaluation, names));

    let best = outcome.search.best();
    println!();
    line_box_top();
    line_box_center(&"Selected model".white().bold().to_string());
    line_box_sep();
    line_box(&kv("Candidate", &best.candidate.to_string()));
    line_box(&kv(
        &format!("CV {}", outcome.search.scoring),
        &format!("{:.4} ± {:.4}", best.mean_score, best.std_score),
    ));
    line_box(&kv("Test accuracy", &format!("{:.4}", outcome.evaluation.accuracy)));
    line_box(&kv("Train / test", &format!("{} / {}", outcome.split.train, outcome.split.test)));
    line_box(&kv("Artifact", &outcome.artifact_path.display().to_string()));
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_explore(config_path: Option<&Path>, data_path: Option<&Path>, synthetic: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = data_path {
        config.data.path = path.to_path_buf();
    }

    section("Explore");
    let dataset = load_data(&config, synthetic)?;

    step_run("Computing diagnostics");
    let start = Instant::now();
    let exploration = Workflow::new(config).explore(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    block(&report::render_exploration(&exploration));
    println!();
    Ok(())
}

/// Predict every row of `data_path`; with `output`, also write the rows plus
/// a `prediction` column. Returns the predictions.
pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<Vec<f64>> {
    section("Predict");

    step_run("Loading model");
    let (pipeline, metadata) = load_pipeline(model_path)?;
    step_done(&format!("{} ({})", metadata.name, metadata.model_family));

    step_run("Loading data");
    let mut df = DataLoader::new().read_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Predicting");
    let start = Instant::now();
    let predictions = pipeline.predict(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for count in class_counts(&predictions) {
        let label = metadata
            .test_metrics
            .as_ref()
            .and_then(|m| m.class(count.label))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| count.label.to_string());
        println!("  {:<16} {}", muted(&label), count.count.to_string().white().bold());
    }

    if let Some(path) = output {
        step_run(&format!("Saving → {}", path.display()));
        df.with_column(Series::new("prediction".into(), predictions.to_vec()))?;
        DataSaver::save_csv(&mut df, path)?;
        step_done(&format!("{} rows", df.height()));
    }

    println!();
    Ok(predictions.to_vec())
}
