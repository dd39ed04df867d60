pub mod align;
pub mod config;
pub mod track;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use stabkit_core::{Resolution, TrackerConfig};

/// Tracker config from an optional TOML file, with `global` forcing a 2x2
/// motion field.
pub fn load_tracker_config(path: Option<&Path>, global: bool) -> Result<TrackerConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            TrackerConfig::from_toml_str(&contents).context("Invalid tracker config")?
        }
        None => TrackerConfig::default(),
    };

    if global {
        config.motion_resolution = Resolution::new(2, 2);
    }
    config.validate().context("Invalid tracker config")?;
    Ok(config)
}

pub fn progress_bar(len: usize, label: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!("{label} [{{bar:40}}] {{pos}}/{{len}}"))?
            .progress_chars("=> "),
    );
    Ok(pb)
}
