use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::indicator::IndicatorParams;

pub const SETTINGS_PATH_ENV: &str = "TW_RADAR_SETTINGS";
pub const THEME_TABLE_ENV: &str = "TW_RADAR_THEMES";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_theme_table_path")]
    pub theme_table_path: String,
    #[serde(default)]
    pub default_top_n: Option<usize>,
    #[serde(default = "default_fractal_window")]
    pub fractal_window: usize,
    #[serde(default)]
    pub indicator: IndicatorParams,
    /// 讯号计算所需的日线天数（两年，分形支撑压力用）
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 逐月请求之间的并发数，避免触发交易所频率限制
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_theme_table_path() -> String { "themes.json".to_string() }
fn default_fractal_window() -> usize { 2 }
fn default_history_days() -> i64 { 730 }
fn default_http_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_fetch_concurrency() -> usize { 2 }

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme_table_path: default_theme_table_path(),
            default_top_n: None,
            fractal_window: default_fractal_window(),
            indicator: IndicatorParams::default(),
            history_days: default_history_days(),
            http_timeout_secs: default_http_timeout(),
            max_retries: default_max_retries(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

impl AppSettings {
    /// 从 JSON 档读取设定，缺少的栏位用默认值
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取设定档失败: {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("设定档格式错误: {}", path.display()))?;
        Ok(settings)
    }

    /// 启动时载入：先看环境变量指定的设定档，读不到就用默认值；族群表路径可再由环境变量覆盖
    pub fn load() -> Self {
        let path = std::env::var(SETTINGS_PATH_ENV).unwrap_or_else(|_| "settings.json".to_string());
        let mut settings = if Path::new(&path).exists() {
            Self::from_file(&path).unwrap_or_else(|e| {
                log::warn!("设定档载入失败，改用默认值: {:#}", e);
                Self::default()
            })
        } else {
            log::info!("未找到设定档 {}，使用默认值", path);
            Self::default()
        };

        if let Ok(themes) = std::env::var(THEME_TABLE_ENV) {
            if !themes.trim().is_empty() {
                settings.theme_table_path = themes;
            }
        }
        settings
    }
}
