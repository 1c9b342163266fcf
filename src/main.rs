//! HangulScribe - Handwritten Hangul recognition pad
//!
//! Draw a Korean character, classify it with a pre-trained network, build up
//! text one character at a time and send it off for translation.

mod app;
mod canvas;
mod config;
mod dashboard;
mod error;
mod shared;
mod storage;
mod translate;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::canvas::LogicalBitmap;
use crate::config::AppConfig;
use crate::vision::{load_model, rank_predictions, TensorExtractor};

/// HangulScribe - Handwritten Hangul recognition
#[derive(Parser, Debug)]
#[command(name = "hangul-scribe")]
#[command(about = "Draw a Hangul character, recognize it and translate the text")]
struct Args {
    /// Configuration file (default: platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classifier model file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Label file, one label per line
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Number of ranked labels to produce
    #[arg(long)]
    top_n: Option<usize>,

    /// Classify an image file and print the ranked labels instead of opening the window
    #[arg(long, value_name = "IMAGE")]
    classify: Option<PathBuf>,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::default_config_path()?,
    };

    if args.write_default_config {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config::save_config(&AppConfig::default(), &config_path)?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    let mut config = load_or_default_config(&config_path);
    apply_overrides(&mut config, &args);
    config.validate()?;

    if let Some(image_path) = &args.classify {
        return classify_file(&config, image_path);
    }

    info!("HangulScribe starting...");
    dashboard::app::run_dashboard(config)?;
    info!("HangulScribe shutdown complete");

    Ok(())
}

/// Load configuration from file, falling back to defaults
fn load_or_default_config(path: &Path) -> AppConfig {
    if path.exists() {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Ignoring invalid configuration {:?}: {:#}", path, e),
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(model) = &args.model {
        config.model.model_path = Some(model.clone());
    }
    if let Some(labels) = &args.labels {
        config.model.labels_path = Some(labels.clone());
    }
    if let Some(top_n) = args.top_n {
        config.ranking.top_n = top_n;
    }
}

/// Headless mode: run one image through the whole pipeline
fn classify_file(config: &AppConfig, image_path: &Path) -> Result<()> {
    let image = image::open(image_path)
        .with_context(|| format!("Failed to open image {:?}", image_path))?
        .to_luma8();
    let bitmap = LogicalBitmap::from_image(image, config.canvas.display_dim);
    let tensor = TensorExtractor::new(config.canvas.feed_dim).extract(&bitmap);

    let mut model = load_model(config)?;
    let scores = model.classifier.classify(&tensor)?;
    model.vocabulary.check_output_width(scores.len())?;

    let n = config.ranking.top_n.min(model.vocabulary.len());
    let ranked = rank_predictions(&scores, model.vocabulary.labels(), n)?;
    for (position, prediction) in ranked.iter().enumerate() {
        println!("{}. {}\t{:.4}", position + 1, prediction.label, prediction.score);
    }

    Ok(())
}
