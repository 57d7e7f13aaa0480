//! Heart disease pipeline CLI
//!
//! Command-line interface for dataset download, cleaning, EDA, training,
//! and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data;
use crate::error::Result;
use crate::features::FeatureSpec;
use crate::training::{TrainConfig, TrainEngine};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn line_box_top() {
    println!("  {}", dim("┌─────────────────────────────────────────────────────────┐"));
}
fn line_box_bottom() {
    println!("  {}", dim("└─────────────────────────────────────────────────────────┘"));
}
fn line_box_sep() {
    println!("  {}", dim("├─────────────────────────────────────────────────────────┤"));
}

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).len();
    let pad = if visible_len < W { W - visible_len } else { 0 };
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).len();
    let total_pad = if visible_len < W { W - visible_len } else { 0 };
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() {
    line_box("");
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
            continue;
        }
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
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

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "heartml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart disease risk pipeline: ingest, train, serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the raw dataset CSV
    Download {
        /// Source URL
        #[arg(long, default_value = data::download::DEFAULT_URL)]
        url: String,

        /// Destination file
        #[arg(short, long, default_value = "data/heart.csv")]
        out: PathBuf,
    },

    /// Validate and clean a raw CSV
    Clean {
        /// Input CSV
        #[arg(short, long, default_value = "data/heart.csv")]
        input: PathBuf,

        /// Cleaned output CSV
        #[arg(short, long, default_value = "data/heart_clean.csv")]
        out: PathBuf,
    },

    /// Write a plain-text dataset summary
    Eda {
        /// Input CSV
        #[arg(short, long, default_value = "data/heart.csv")]
        input: PathBuf,

        /// Summary output file
        #[arg(short, long, default_value = "artifacts/eda_summary.txt")]
        out: PathBuf,
    },

    /// Train all candidates and persist the best pipeline
    Train {
        /// Input CSV
        #[arg(short, long, default_value = "data/heart.csv")]
        input: PathBuf,

        /// Output directory for model artifacts
        #[arg(short, long, default_value = "artifacts/model")]
        out_dir: PathBuf,

        /// Experiment records directory
        #[arg(long, default_value = "artifacts/experiments")]
        experiments_dir: PathBuf,

        /// Holdout fraction
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Number of cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Start the prediction server
    Serve {
        /// Server host (falls back to API_HOST, then 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Server port (falls back to PORT, then 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Pipeline artifact to serve (falls back to MODEL_PATH)
        #[arg(short, long)]
        model_path: Option<String>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_download(url: &str, out: &Path) -> Result<()> {
    section("Download");

    step_run(&format!("Fetching {}", accent(url)));
    let start = Instant::now();
    let path = data::download::fetch(url, out)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!("saved → {}", path.display()));
    println!();
    Ok(())
}

pub fn cmd_clean(input: &Path, out: &Path) -> Result<()> {
    section("Clean");

    step_run("Loading data");
    let df = data::load_and_validate(input)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let missing_before = data::count_missing(&df);

    step_run("Cleaning");
    let start = Instant::now();
    let cleaned = data::clean(&df, &FeatureSpec::default())?;
    step_done(&format!("{:?}", start.elapsed()));
    step_ok(&format!("{missing_before} missing values imputed"));

    step_run(&format!("Saving → {}", out.display()));
    data::write_csv(&cleaned, out)?;
    step_done(&format!("{} rows × {} cols", cleaned.height(), cleaned.width()));

    println!();
    Ok(())
}

pub fn cmd_eda(input: &Path, out: &Path) -> Result<()> {
    section("Data Summary");

    let df = data::load_and_validate(input)?;
    let summary = data::eda_summary(&df)?;

    for line in summary.lines() {
        println!("  {line}");
    }
    println!();

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(out, &summary)?;
    step_ok(&format!("summary → {}", out.display()));
    println!();
    Ok(())
}

pub fn cmd_train(
    input: &Path,
    out_dir: &Path,
    experiments_dir: &Path,
    test_size: f64,
    cv_folds: usize,
    seed: u64,
) -> Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let df = data::load_and_validate(input)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        df.height(),
        df.width(),
        start.elapsed()
    ));

    let config = TrainConfig {
        test_size,
        n_folds: cv_folds,
        seed,
        out_dir: out_dir.to_path_buf(),
        experiments_dir: experiments_dir.to_path_buf(),
    };
    let engine = TrainEngine::new(config);

    step_run("Training candidates");
    let start = Instant::now();
    let report = engine.run(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!(
        "  {:<10} {:>10} {:>12} {:>10} {:>9}",
        muted("Model"),
        muted("CV AUC"),
        muted("Holdout AUC"),
        muted("Accuracy"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(56)));
    for candidate in &report.candidates {
        println!(
            "  {:<10} {:>10.4} {:>12.4} {:>10.4} {:>8.2}s",
            candidate.name,
            candidate.cv.roc_auc,
            candidate.holdout.roc_auc,
            candidate.holdout.accuracy,
            candidate.training_time_secs
        );
    }
    println!("  {}", dim(&"─".repeat(56)));

    println!();
    println!(
        "  {} {} {} {:.4}",
        ok("best"),
        report.summary.best_model.white().bold(),
        muted("holdout ROC-AUC:"),
        report.summary.best_holdout.roc_auc
    );
    println!(
        "  {:<12} {}",
        muted("final model"),
        report.summary.final_model_path
    );
    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model_path: Option<String>,
) -> Result<()> {
    use crate::server::{run_server, ServerConfig};

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: host.unwrap_or(defaults.host),
        port: port.unwrap_or(defaults.port),
        model_path: model_path.unwrap_or(defaults.model_path),
    };

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "heartml".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict", &format!("http://{}:{}/predict", config.host, config.port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", config.host, config.port)));
    line_box(&kv("Metrics", &format!("http://{}:{}/metrics", config.host, config.port)));
    line_box(&kv("Model  ", &config.model_path));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}
