// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::Context;
use cellmap::catalog::{Catalog, CatalogConfig, CellConfig};
use serde::Deserialize;

/// Contents of a `cellmap.toml` file.
#[derive(Debug, Default, Deserialize)]
pub struct FlowConfig {
    /// Catalog cells; when empty the reference cells `c1` and `c2` are used.
    #[serde(default, rename = "cell")]
    pub cells: Vec<CellConfig>,

    #[serde(default)]
    pub synth: SynthConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SynthConfig {
    /// Path to the `yosys` binary; when absent it is looked up on `PATH`.
    pub yosys_path: Option<String>,

    /// Name given to generated Liberty libraries.
    pub library_name: Option<String>,
}

impl FlowConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parse cellmap config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read cellmap config {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

/// The explicit `--config` path, else `cellmap.toml` in the working
/// directory if there is one.
pub fn discover_config_path(flag: Option<&String>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(PathBuf::from(path));
    }
    let cwd_config = std::env::current_dir().ok()?.join("cellmap.toml");
    if cwd_config.exists() {
        log::info!(
            "Using cellmap.toml in current directory: {}",
            cwd_config.display()
        );
        Some(cwd_config)
    } else {
        None
    }
}

/// Builds the catalog named by the config, computing every orbit.
pub fn load_catalog(config: &Option<FlowConfig>) -> anyhow::Result<Catalog> {
    let cells = config.as_ref().map(|c| c.cells.as_slice()).unwrap_or(&[]);
    if cells.is_empty() {
        log::info!("No [[cell]] entries configured; using reference cells c1, c2");
        return Ok(Catalog::reference());
    }
    let catalog = Catalog::from_config(&CatalogConfig {
        cells: cells.to_vec(),
    })?;
    Ok(catalog)
}

pub fn synth_config(config: &Option<FlowConfig>) -> SynthConfig {
    config
        .as_ref()
        .map(|c| c.synth.clone())
        .unwrap_or_default()
}
