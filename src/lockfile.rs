//! `Chart.lock` persistence.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chart_resolver::Lock;

use crate::config::OutputFormat;

pub const LOCK_FILE: &str = "Chart.lock";

pub fn lock_path(chart_dir: &Path) -> PathBuf {
    chart_dir.join(LOCK_FILE)
}

pub fn render(lock: &Lock, format: OutputFormat) -> anyhow::Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(lock)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(lock)?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}

pub fn read(chart_dir: &Path) -> anyhow::Result<Lock> {
    let path = lock_path(chart_dir);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("invalid lock file {}", path.display()))
}

/// Write `Chart.lock` as YAML, replacing any previous lock.
pub fn write(chart_dir: &Path, lock: &Lock) -> anyhow::Result<PathBuf> {
    let path = lock_path(chart_dir);
    let content = render(lock, OutputFormat::Yaml)?;
    std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
