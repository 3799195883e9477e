//! Application configuration
//!
//! [`AppConfig`] collects everything the host needs to build the window,
//! renderer and particle field. Defaults reproduce the standard scene; a few
//! values can be overridden from the environment:
//!
//! | Variable            | Field                    |
//! |---------------------|--------------------------|
//! | `DONUTS_ASSET_ROOT` | `asset_root`             |
//! | `DONUTS_COUNT`      | `field.count`            |
//! | `DONUTS_SEED`       | `field.seed`             |
//! | `DONUTS_VSYNC`      | `vsync`                  |

use std::env;
use std::path::PathBuf;

use crate::simulation::particle_field::FieldSettings;

/// Torus mesh parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusShape {
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusShape {
    fn default() -> Self {
        Self {
            radius: 0.3,
            tube: 0.2,
            radial_segments: 20,
            tubular_segments: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub window_title: String,
    /// Initial logical window size
    pub window_size: (u32, u32),
    /// Directory holding `textures/` and `fonts/`
    pub asset_root: PathBuf,
    /// Font resource, relative to `asset_root`
    pub font_path: PathBuf,
    /// Number of matcap images `textures/matcaps/1.png ..= N.png`
    pub variant_count: u32,
    /// Upper bound on the device pixel ratio used for the surface
    pub max_pixel_ratio: f64,
    pub vsync: bool,
    pub torus: TorusShape,
    pub field: FieldSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_title: "Donuts".to_string(),
            window_size: (1200, 800),
            asset_root: PathBuf::from("static"),
            font_path: PathBuf::from("fonts/helvetiker_regular.typeface.json"),
            variant_count: 8,
            max_pixel_ratio: 2.0,
            vsync: true,
            torus: TorusShape::default(),
            field: FieldSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DONUTS_ASSET_ROOT") {
            if !val.is_empty() {
                self.asset_root = PathBuf::from(val);
            }
        }
        if let Some(val) = lookup("DONUTS_COUNT") {
            match val.trim().parse() {
                Ok(count) => self.field.count = count,
                Err(_) => log::warn!("Ignoring DONUTS_COUNT={:?}", val),
            }
        }
        if let Some(val) = lookup("DONUTS_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.field.seed = Some(seed),
                Err(_) => log::warn!("Ignoring DONUTS_SEED={:?}", val),
            }
        }
        if let Some(val) = lookup("DONUTS_VSYNC") {
            self.vsync = parse_flag(&val).unwrap_or(self.vsync);
        }
    }

    /// Absolute (or root-relative) path of matcap `variant` (1-based)
    pub fn matcap_path(&self, variant: u32) -> PathBuf {
        self.asset_root
            .join("textures")
            .join("matcaps")
            .join(format!("{variant}.png"))
    }

    pub fn font_location(&self) -> PathBuf {
        self.asset_root.join(&self.font_path)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for [`AppConfig`]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn with_title(mut self, title: &str) -> Self {
        self.config.window_title = title.to_string();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width, height);
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.asset_root = root.into();
        self
    }

    pub fn with_variant_count(mut self, count: u32) -> Self {
        self.config.variant_count = count.max(1);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.config.vsync = vsync;
        self
    }

    pub fn with_torus(mut self, torus: TorusShape) -> Self {
        self.config.torus = torus;
        self
    }

    pub fn with_field(mut self, field: FieldSettings) -> Self {
        self.config.field = field;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.variant_count, 8);
        assert_eq!(config.field.count, 100);
        assert_eq!(config.max_pixel_ratio, 2.0);
        assert_eq!(config.torus, TorusShape::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("DONUTS_ASSET_ROOT", "/srv/assets"),
            ("DONUTS_COUNT", "250"),
            ("DONUTS_SEED", "42"),
            ("DONUTS_VSYNC", "off"),
        ]));

        assert_eq!(config.asset_root, PathBuf::from("/srv/assets"));
        assert_eq!(config.field.count, 250);
        assert_eq!(config.field.seed, Some(42));
        assert!(!config.vsync);
    }

    #[test]
    fn test_bad_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup(&[
            ("DONUTS_COUNT", "lots"),
            ("DONUTS_SEED", "-1"),
            ("DONUTS_VSYNC", "maybe"),
        ]));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_asset_paths() {
        let config = AppConfig::builder().with_asset_root("assets").build();
        assert_eq!(
            config.matcap_path(3),
            PathBuf::from("assets/textures/matcaps/3.png")
        );
        assert_eq!(
            config.font_location(),
            PathBuf::from("assets/fonts/helvetiker_regular.typeface.json")
        );
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::builder()
            .with_title("Test")
            .with_window_size(640, 480)
            .with_variant_count(0)
            .with_vsync(false)
            .build();
        assert_eq!(config.window_title, "Test");
        assert_eq!(config.window_size, (640, 480));
        assert_eq!(config.variant_count, 1);
        assert!(!config.vsync);
    }
}
