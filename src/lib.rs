pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use models::settings::AppSettings;
use services::theme_registry::{SharedThemeRegistry, ThemeRegistry};

pub struct AppState {
    pub settings: AppSettings,
    pub registry: SharedThemeRegistry,
}

impl AppState {
    pub fn new(settings: AppSettings, registry: ThemeRegistry) -> Self {
        Self {
            settings,
            registry: SharedThemeRegistry::new(registry),
        }
    }

    /// 启动时载入设定与族群表。族群表读不到时以空表启动，分析结果全部归为未分类
    pub fn load() -> Self {
        let settings = AppSettings::load();
        let registry = ThemeRegistry::from_file(&settings.theme_table_path).unwrap_or_else(|e| {
            log::warn!("族群表载入失败，以空表启动: {}", e);
            ThemeRegistry::default()
        });
        Self::new(settings, registry)
    }
}
