//! Whole-document persistence.
//!
//! The model is snapshotted as pretty-printed UTF-8 JSON; parent directories
//! are created on demand so phases can write to `output/` on a fresh checkout.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::DataModel;

pub fn save_model(model: &DataModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(model).context("failed to serialize model")?;
    fs::write(path, json).with_context(|| format!("failed to write model to {}", path.display()))
}

pub fn load_model(path: &Path) -> Result<DataModel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read model file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("model file {} is not valid JSON", path.display()))
}
