//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;
pub mod watch;

use std::path::{Path, PathBuf};

use tracing::debug;

use nfe_core::error::OcrError;
use nfe_core::models::config::NfeConfig;
use nfe_core::{LazyRecognizer, RegionRecognizer};

/// OCR engine used for region transcription.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum Engine {
    /// Pure Rust ONNX detection + recognition
    #[default]
    Native,
    /// Tesseract via leptess
    Tesseract,
}

/// Load the config named on the command line, else the user config, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<NfeConfig> {
    let config = match config_path {
        Some(path) => NfeConfig::from_file(Path::new(path))?,
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Using config at {}", default_path.display());
                NfeConfig::from_file(&default_path)?
            } else {
                NfeConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Recognizer that loads its models on the first region it sees.
pub fn recognizer(config: &NfeConfig, engine: Engine, model_dir: Option<PathBuf>) -> LazyRecognizer {
    let mut ocr = config.ocr.clone();
    if let Some(dir) = model_dir {
        ocr.model_dir = dir;
    }

    LazyRecognizer::new(move || match engine {
        #[cfg(feature = "native")]
        Engine::Native => Ok(Box::new(nfe_core::PureOcrRecognizer::from_config(ocr.clone())?) as Box<dyn RegionRecognizer>),
        #[cfg(feature = "tesseract")]
        Engine::Tesseract => Ok(Box::new(nfe_core::TesseractRecognizer::new(&ocr)?) as Box<dyn RegionRecognizer>),
        #[allow(unreachable_patterns)]
        other => Err(OcrError::ModelLoad(format!(
            "nfe was built without the {:?} engine",
            other
        ))),
    })
}
