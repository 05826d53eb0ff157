mod layout;
mod types;

pub use layout::*;
pub use types::*;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Returns the config directory: `<platform config dir>/xrpanel/`
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("xrpanel");
    Ok(dir)
}

/// Returns the config file path: `<platform config dir>/xrpanel/config.toml`
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from disk, or return default if not found.
///
/// The panel section is normalized so a hand-edited file can never
/// break the distance/width limits or the aspect lock.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path()?;
    if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = parse_config(&contents)?;
        info!(?path, "Loaded config");
        Ok(config)
    } else {
        info!("No config found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Parse a TOML config document.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let mut config: AppConfig = toml::from_str(contents).context("parsing config TOML")?;
    config.panel = config.panel.normalized();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.panel, PanelConfig::default());
        assert_eq!(config.settle_frames, 2);
    }

    #[test]
    fn out_of_range_panel_is_normalized() {
        let config = parse_config(
            r#"
            [panel]
            distance = 9.0
            width = 0.2
            height = 40.0
            curved = true
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.distance, MAX_EXTENT);
        assert_eq!(config.panel.width, MIN_EXTENT);
        assert!((config.panel.height - MIN_EXTENT * ASPECT_RATIO).abs() < 1e-6);
        assert!(config.panel.curved);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_config("panel = 3").is_err());
    }
}
