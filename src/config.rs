use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::store::DEFAULT_SECTION;

/// Минимальный интервал трекинга, чаще опрашивать утилиты бессмысленно
const MIN_REFRESH_RATE_SEC: f64 = 0.05;

/// Общие настройки процесса из секции DEFAULT
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Интервал трекинга, секунды
    #[serde(
        rename = "refreshrateinsec",
        alias = "RefreshRateInSec",
        default = "default_refresh_rate"
    )]
    pub refresh_rate_in_sec: f64,

    /// Интервал сохранения в файл, минуты
    #[serde(
        rename = "saverateinmin",
        alias = "SaveRateInMin",
        default = "default_save_rate"
    )]
    pub save_rate_in_min: f64,
}

fn default_refresh_rate() -> f64 {
    1.0
}

fn default_save_rate() -> f64 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_rate_in_sec: default_refresh_rate(),
            save_rate_in_min: default_save_rate(),
        }
    }
}

impl Settings {
    /// Загрузить настройки из секции DEFAULT файла и переменных окружения `RWP_*`
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .focus(DEFAULT_SECTION)
            .merge(Env::prefixed("RWP_"));

        Self::from_figment(figment)
            .with_context(|| format!("Не удалось загрузить настройки из {:?}", config_path))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.refresh_rate_in_sec.is_finite() || self.refresh_rate_in_sec < MIN_REFRESH_RATE_SEC {
            anyhow::bail!(
                "refreshrateinsec должно быть не меньше {}, получено {}",
                MIN_REFRESH_RATE_SEC,
                self.refresh_rate_in_sec
            );
        }

        if !self.save_rate_in_min.is_finite() || self.save_rate_in_min <= 0.0 {
            anyhow::bail!(
                "saverateinmin должно быть больше 0, получено {}",
                self.save_rate_in_min
            );
        }

        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_rate_in_sec)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs_f64(self.save_rate_in_min * 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(contents: &str) -> Result<Settings> {
        Settings::from_figment(
            Figment::new()
                .merge(Toml::string(contents))
                .focus(DEFAULT_SECTION),
        )
    }

    #[test]
    fn test_default_settings_validation() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.refresh_interval(), Duration::from_secs(1));
        assert_eq!(settings.save_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_settings_from_default_section() {
        let settings = from_toml(
            "[DEFAULT]\nrefreshrateinsec = 0.5\nsaverateinmin = 2\ncasesensitive = 0\n\n[tcmd]\nuseregex = 1\n",
        )
        .unwrap();
        assert_eq!(settings.refresh_interval(), Duration::from_millis(500));
        assert_eq!(settings.save_interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_settings_accept_legacy_key_case() {
        let settings = from_toml("[DEFAULT]\nRefreshRateInSec = 0.25\nSaveRateInMin = 0.5\n").unwrap();
        assert_eq!(settings.refresh_rate_in_sec, 0.25);
        assert_eq!(settings.save_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_default_section_uses_fallbacks() {
        let settings = from_toml("[notepad]\nontop = 1\n").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(from_toml("[DEFAULT]\nrefreshrateinsec = 0.001\n").is_err());
        assert!(from_toml("[DEFAULT]\nsaverateinmin = 0\n").is_err());
        assert!(from_toml("[DEFAULT]\nrefreshrateinsec = \"fast\"\n").is_err());
    }
}
