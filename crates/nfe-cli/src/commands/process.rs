//! Process command - extract data from a single invoice scan.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use nfe_core::DocumentPipeline;

use super::{load_config, recognizer, Engine};
use crate::output::{format_record, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (scanned PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Layout hint; defaults to the file name ("SP" or "RJ" token)
    #[arg(long)]
    hint: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write the raw block log (one block per line) to this file
    #[arg(long)]
    raw_log: Option<PathBuf>,

    /// Write the page with detected regions outlined to this file
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Keep region crops (roi_<n>.png) in this directory
    #[arg(long)]
    keep_regions: Option<PathBuf>,

    /// OCR engine
    #[arg(short, long, value_enum, default_value = "native")]
    engine: Engine,

    /// Model directory (overrides ocr.model_dir)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Print per-stage timings and warnings
    #[arg(long)]
    stats: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Processing {}", args.input.display()));

    let mut pipeline = DocumentPipeline::new(&config).with_annotation(args.annotate.is_some());
    if let Some(dir) = &args.keep_regions {
        pipeline = pipeline.with_regions_dir(dir);
    }
    let engine = recognizer(&config, args.engine, args.model_dir.clone());

    let outcome = pipeline.run_file(&args.input, args.hint.as_deref(), &config, &engine);
    pb.finish_and_clear();
    let outcome = outcome?;

    let output = format_record(&outcome.record, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if let Some(path) = &args.raw_log {
        fs::write(path, outcome.raw_log())?;
        debug!("Raw block log written to {}", path.display());
    }

    if let (Some(path), Some(annotated)) = (&args.annotate, &outcome.annotated) {
        annotated.save(path)?;
        debug!("Annotated page written to {}", path.display());
    }

    if args.stats {
        let t = outcome.timings;
        eprintln!(
            "{} {} regions, {} blocks, {} fields",
            style("ℹ").blue(),
            outcome.regions.len(),
            outcome.raw_blocks.len(),
            outcome.record.len()
        );
        eprintln!(
            "{} segmentation {}ms, OCR {}ms, extraction {}ms",
            style("ℹ").blue(),
            t.segmentation_ms,
            t.ocr_ms,
            t.extraction_ms
        );
        for warning in &outcome.warnings {
            eprintln!("{} {}", style("!").yellow(), warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}
