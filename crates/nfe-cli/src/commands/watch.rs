//! Watch command - polling job loop over an input directory.
//!
//! Each cycle lists the input directory, reserves a working directory per new
//! document, processes every reserved directory that is still empty, and
//! writes `<stem>.json` and `<stem>.txt` back into the input directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use console::style;
use tracing::{debug, error, info, warn};

use nfe_core::models::config::WatchConfig;
use nfe_core::{DocumentPipeline, NfeConfig, RegionRecognizer};

use super::batch::is_scan;
use super::{load_config, recognizer, Engine};

/// Arguments for the watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Input directory (overrides watch.input_dir)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Working directory root (overrides watch.processing_dir)
    #[arg(short, long)]
    processing_dir: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// OCR engine
    #[arg(short, long, value_enum, default_value = "native")]
    engine: Engine,
}

/// Counts for one polling cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub reserved: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Directory-based document queue.
pub struct JobLoop<'a> {
    watch: WatchConfig,
    config: &'a NfeConfig,
    pipeline: DocumentPipeline,
    recognizer: &'a dyn RegionRecognizer,
}

impl<'a> JobLoop<'a> {
    pub fn new(watch: WatchConfig, config: &'a NfeConfig, recognizer: &'a dyn RegionRecognizer) -> Self {
        Self {
            watch,
            config,
            pipeline: DocumentPipeline::new(config),
            recognizer,
        }
    }

    /// One pass over the input directory. Per-document failures are logged
    /// and counted; only directory access errors abort the cycle.
    pub fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        fs::create_dir_all(&self.watch.input_dir)?;
        fs::create_dir_all(&self.watch.processing_dir)?;

        let mut report = CycleReport::default();
        let mut sources = Vec::new();
        let mut stems = HashSet::new();

        let mut entries = fs::read_dir(&self.watch.input_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for path in entries {
            if !path.is_file() || !is_scan(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if self.watch.input_dir.join(format!("{stem}.json")).exists() {
                continue;
            }
            // results are keyed by stem, so only one file per stem is taken
            if !stems.insert(stem.clone()) {
                warn!("Skipping {}: another input already uses the name {}", path.display(), stem);
                continue;
            }

            let work_dir = self.watch.processing_dir.join(&stem);
            if !work_dir.exists() {
                fs::create_dir(&work_dir)?;
                report.reserved += 1;
            }
            sources.push((stem, path));
        }

        for (stem, path) in sources {
            let work_dir = self.watch.processing_dir.join(&stem);
            match fs::read_dir(&work_dir) {
                Ok(mut contents) => {
                    if contents.next().is_some() {
                        debug!("{} is already being processed", stem);
                        continue;
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: working directory unavailable: {}", stem, e);
                    continue;
                }
            }

            match self.process(&stem, &path, &work_dir) {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!("Error when running {} transcript: {:#}", path.display(), e);
                    report.failed += 1;
                    self.release(&work_dir);
                }
            }
        }

        Ok(report)
    }

    /// Empty a failed document's working directory so the next cycle retries it.
    fn release(&self, work_dir: &Path) {
        let cleared = fs::remove_dir_all(work_dir).and_then(|()| fs::create_dir(work_dir));
        if let Err(e) = cleared {
            warn!("Could not reset {}: {}", work_dir.display(), e);
        }
    }

    fn process(&self, stem: &str, path: &Path, work_dir: &Path) -> anyhow::Result<()> {
        info!("Processing {}", path.display());

        let pipeline = self
            .pipeline
            .clone()
            .with_regions_dir(work_dir)
            .with_annotation(self.watch.keep_working_dir);
        let outcome = pipeline.run_file(path, None, self.config, self.recognizer)?;

        fs::write(
            self.watch.input_dir.join(format!("{stem}.json")),
            outcome.record.to_json_pretty()?,
        )?;
        fs::write(self.watch.input_dir.join(format!("{stem}.txt")), outcome.raw_log())?;

        match &outcome.annotated {
            Some(annotated) => annotated.save(work_dir.join(format!("{stem}_annotated.png")))?,
            None => fs::remove_dir_all(work_dir)?,
        }

        info!(
            "Finished {}: {} fields in {}ms",
            stem,
            outcome.record.len(),
            outcome.timings.total_ms
        );
        Ok(())
    }
}

pub async fn run(args: WatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut watch = config.watch.clone();
    if let Some(dir) = args.input_dir {
        watch.input_dir = dir;
    }
    if let Some(dir) = args.processing_dir {
        watch.processing_dir = dir;
    }
    let interval = Duration::from_secs(watch.poll_interval_secs.max(1));

    let engine = recognizer(&config, args.engine, None);
    let job_loop = JobLoop::new(watch, &config, &engine);

    loop {
        info!("Cycle started - {}", chrono::Local::now().format("%d/%m/%Y %H:%M:%S"));
        let report = job_loop.run_cycle()?;
        if report.processed + report.failed > 0 {
            println!(
                "{} {} processed, {} failed",
                style("✓").green(),
                report.processed,
                report.failed
            );
        }

        if args.once {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}
