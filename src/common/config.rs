use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docking")
}
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".docking.toml")
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Config {
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Thickness of a splitter in pixels. When unset it is measured from the
    /// host's `dock-splitter horizontal` style.
    #[serde(default)]
    pub splitter_size: Option<f64>,
    /// Height of a panel header in pixels. When unset it is measured from the
    /// host's `dock-element-header` style.
    #[serde(default)]
    pub header_size: Option<f64>,
    /// Pointer travel (px) after which a header press becomes a drag.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f64,
    /// Fraction of the container near its edges that docks against the root.
    #[serde(default = "default_special_dock_size")]
    pub special_dock_size: f64,
    /// Smallest extent (percent of the container) a splitter drag may leave.
    #[serde(default = "default_min_resize_extent")]
    pub min_resize_extent: f64,
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,
    #[serde(default)]
    pub popout: PopoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PopoutSettings {
    #[serde(default = "default_popout_extent")]
    pub width: f64,
    #[serde(default = "default_popout_extent")]
    pub height: f64,
    /// Stylesheets referenced by a popped-out window's bootstrap document.
    #[serde(default)]
    pub stylesheets: Vec<String>,
    /// Scripts referenced by a popped-out window's bootstrap document.
    #[serde(default)]
    pub scripts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            splitter_size: None,
            header_size: None,
            drag_threshold: default_drag_threshold(),
            special_dock_size: default_special_dock_size(),
            min_resize_extent: default_min_resize_extent(),
            cache_key_prefix: default_cache_key_prefix(),
            popout: PopoutSettings::default(),
        }
    }
}

impl Default for PopoutSettings {
    fn default() -> Self {
        Self {
            width: default_popout_extent(),
            height: default_popout_extent(),
            stylesheets: Vec::new(),
            scripts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in [("splitter_size", self.splitter_size), ("header_size", self.header_size)]
        {
            if let Some(v) = value {
                if !(v >= 0.0) {
                    issues.push(format!("{name} must be non-negative, got {v}"));
                }
            }
        }

        if !(self.drag_threshold >= 0.0) {
            issues.push(format!(
                "drag_threshold must be non-negative, got {}",
                self.drag_threshold
            ));
        }

        if !(0.0..0.5).contains(&self.special_dock_size) {
            issues.push(format!(
                "special_dock_size must be in [0, 0.5), got {}",
                self.special_dock_size
            ));
        }

        if !(self.min_resize_extent >= 0.0 && self.min_resize_extent < 50.0) {
            issues.push(format!(
                "min_resize_extent must be in [0, 50), got {}",
                self.min_resize_extent
            ));
        }

        issues.extend(self.popout.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if matches!(self.splitter_size, Some(v) if !(v >= 0.0)) {
            self.splitter_size = None;
            fixes += 1;
        }
        if matches!(self.header_size, Some(v) if !(v >= 0.0)) {
            self.header_size = None;
            fixes += 1;
        }
        if !(self.drag_threshold >= 0.0) {
            self.drag_threshold = default_drag_threshold();
            fixes += 1;
        }
        if !(0.0..0.5).contains(&self.special_dock_size) {
            self.special_dock_size = default_special_dock_size();
            fixes += 1;
        }
        if !(self.min_resize_extent >= 0.0 && self.min_resize_extent < 50.0) {
            self.min_resize_extent = default_min_resize_extent();
            fixes += 1;
        }

        fixes += self.popout.auto_fix_values();

        fixes
    }
}

impl PopoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.width > 0.0) || !(self.height > 0.0) {
            issues.push(format!(
                "popout size must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        if !(self.width > 0.0) {
            self.width = default_popout_extent();
            fixes += 1;
        }
        if !(self.height > 0.0) {
            self.height = default_popout_extent();
            fixes += 1;
        }
        fixes
    }
}

fn default_drag_threshold() -> f64 { 10.0 }

fn default_special_dock_size() -> f64 { 0.05 }

fn default_min_resize_extent() -> f64 { 2.0 }

fn default_popout_extent() -> f64 { 400.0 }

fn default_cache_key_prefix() -> String { "docking-js-".to_string() }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../docking.default.toml"))
            .unwrap_or_else(|_| Config { settings: Settings::default() })
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_file = ConfigFile { settings: self.settings.clone() };
        let toml_string = toml::to_string_pretty(&config_file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config { settings: c.settings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = super::Config::parse(include_str!("../../docking.default.toml")).unwrap();
        assert_eq!(config.settings.drag_threshold, 10.0);
        assert_eq!(config.settings.special_dock_size, 0.05);
        assert_eq!(config.settings.popout.width, 400.0);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings, Settings::default());

        let config = Config::parse(
            r#"
            [settings]
            splitter_size = 6
            [settings.popout]
            width = 640
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.splitter_size, Some(6.0));
        assert_eq!(config.settings.popout.width, 640.0);
        assert_eq!(config.settings.popout.height, 400.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[settings]\nsplitter = 3").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.settings.drag_threshold = -1.0;
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("drag_threshold must be non-negative"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 1);
        assert_eq!(config.settings.drag_threshold, 10.0);

        config.settings.special_dock_size = 0.7;
        config.settings.popout.height = 0.0;
        assert_eq!(config.validate().len(), 2);
        assert_eq!(config.auto_fix_values(), 2);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("docking.toml");
        let mut config = Config::default();
        config.settings.header_size = Some(24.0);
        config.settings.popout.stylesheets = vec!["dock.css".into()];
        config.save(&path).unwrap();
        assert_eq!(Config::read(&path).unwrap(), config);
    }
}
