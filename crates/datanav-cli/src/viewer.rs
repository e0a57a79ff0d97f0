//! Static HTML viewer generation.
//!
//! The whole model is embedded as inline JSON inside a
//! `<script type="application/json">` block. `</` is escaped to `<\/` so no
//! payload content (attribute names, tags, notes) can terminate the script
//! tag early; everything else is left to `JSON.parse` on the client.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use datanav_model::DataModel;

pub fn build_viewer_html(model: &DataModel) -> Result<String> {
    let payload = serde_json::to_string(model)
        .context("failed to serialize model for the viewer")?
        .replace("</", "<\\/");

    let template = include_str!("../templates/viewer.html");
    Ok(template
        .replace("{{MODEL_JSON}}", &payload)
        .replace("{{ENTITY_COUNT}}", &model.entities.len().to_string())
        .replace("{{RELATIONSHIP_COUNT}}", &model.relationships.len().to_string()))
}

pub fn write_viewer(model: &DataModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, build_viewer_html(model)?)
        .with_context(|| format!("failed to write viewer to {}", path.display()))
}
