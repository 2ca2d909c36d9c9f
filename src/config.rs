//! Layered configuration: per-section structs with their own `Default`,
//! loaded through the `config` crate, covering the renderer and output
//! surface this core actually has.

use serde::{Deserialize, Serialize};

use crate::renderer::{MarginsMm, PageFormat};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub binary_path: Option<String>,
    pub auto_detect: bool,
    pub timeout_secs: u64,
    pub page_format: PageFormat,
    pub margins_mm: MarginsMm,
    pub bleed_mm: f32,
    pub crop_marks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig { renderer: RendererConfig::default(), output: OutputConfig::default() }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            binary_path: None,
            auto_detect: true,
            timeout_secs: 60,
            page_format: PageFormat::A4,
            margins_mm: MarginsMm::default(),
            bleed_mm: 3.0,
            crop_marks: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { directory: "output".to_string() }
    }
}

impl AppConfig {
    /// Loads configuration from `path` (yaml/json/toml, resolved by
    /// extension via the `config` crate), falling back to built-in
    /// defaults when `path` is `None`.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let settings = ::config::Config::builder().add_source(::config::File::from(path)).build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_auto_detect_the_renderer_binary() {
        let config = AppConfig::default();
        assert!(config.renderer.auto_detect);
        assert_eq!(config.renderer.timeout_secs, 60);
        assert_eq!(config.output.directory, "output");
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.output.directory, AppConfig::default().output.directory);
    }
}
