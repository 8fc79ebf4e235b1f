use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub sampling: SamplingConfig,
    /// `[weights.<question>]` tables overriding the built-in weights.
    pub weights: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    /// Attach to a Chrome started with `--remote-debugging-port` instead of
    /// launching one.
    pub debug_port: Option<u16>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            window_width: 1440,
            window_height: 900,
            debug_port: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub idle_timeout_ms: u64,
    pub quiet_window_ms: u64,
    pub checkbox_pause_ms: u64,
    pub matrix_row_pause_ms: u64,
    pub scroll_timeout_ms: u64,
    pub click_timeout_ms: u64,
    pub matrix_click_timeout_ms: u64,
    /// Extra delay before every click ("slowmo").
    pub action_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 8000,
            quiet_window_ms: 500,
            checkbox_pause_ms: 200,
            matrix_row_pause_ms: 120,
            scroll_timeout_ms: 5000,
            click_timeout_ms: 5000,
            matrix_click_timeout_ms: 15000,
            action_delay_ms: 0,
        }
    }
}

impl TimingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }
    pub fn checkbox_pause(&self) -> Duration {
        Duration::from_millis(self.checkbox_pause_ms)
    }
    pub fn matrix_row_pause(&self) -> Duration {
        Duration::from_millis(self.matrix_row_pause_ms)
    }
    pub fn scroll_timeout(&self) -> Duration {
        Duration::from_millis(self.scroll_timeout_ms)
    }
    pub fn click_timeout(&self) -> Duration {
        Duration::from_millis(self.click_timeout_ms)
    }
    pub fn matrix_click_timeout(&self) -> Duration {
        Duration::from_millis(self.matrix_click_timeout_ms)
    }
    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub screenshots: bool,
    pub screenshot_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshots: true,
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    #[default]
    Uniform,
    Weighted,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    pub strategy: SamplingMode,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config.toml at {:?}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config.toml")?;

        Ok(config)
    }

    /// Defaults when no config file exists; a present but broken file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
        if !path.exists() {
            log::info!("[Config] No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content).context("Failed to write config.toml")?;

        Ok(())
    }
}

pub fn get_exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn get_config_path() -> PathBuf {
    let exe_dir = get_exe_dir();
    let config_path = exe_dir.join("config").join("config.toml");

    if config_path.exists() {
        return config_path;
    }

    let cwd_config = PathBuf::from("config/config.toml");
    if cwd_config.exists() {
        return cwd_config;
    }

    config_path
}
