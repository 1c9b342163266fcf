//! Storage Layer
//!
//! Resolves where settings and model assets live on disk.

use anyhow::Result;
use std::path::PathBuf;

/// Default model artifact file name
pub const MODEL_FILE: &str = "hangul.onnx";
/// Default label file name
pub const LABEL_FILE: &str = "2350-common-hangul.txt";

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "hangulscribe", "HangulScribe")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Get the default config file path
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Get the directory holding the model and its labels
pub fn get_models_dir() -> Result<PathBuf> {
    let models_dir = get_data_dir()?.join("models");
    std::fs::create_dir_all(&models_dir)?;

    Ok(models_dir)
}
