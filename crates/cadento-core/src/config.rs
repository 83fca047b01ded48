//! CoreConfig - TOML から読む設定
//!
//! ```toml
//! [pomodoro]
//! focus_minutes = 25
//! short_break_minutes = 5
//! long_break_minutes = 15
//! long_break_per_short_breaks = 4
//!
//! [focus_dividend]
//! focus_per_dividend_ratio = 5
//!
//! [soon_due]
//! min_delay_ms = 1000
//! wake_padding_ms = 100
//! fallback_horizon_hours = 24
//! ```
//!
//! どのキーも省略できる（省略時は上の値）。未知のキーはエラー。
//! `validate()` で検証済みの設定値に変換する。

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::SoonDueSettings;
use crate::domain::{FocusDividendTimerSettings, PomodoroTimerSettings, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub pomodoro: PomodoroConfig,
    pub focus_dividend: FocusDividendConfig,
    pub soon_due: SoonDueConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PomodoroConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_per_short_breaks: u32,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_per_short_breaks: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FocusDividendConfig {
    pub focus_per_dividend_ratio: u32,
}

impl Default for FocusDividendConfig {
    fn default() -> Self {
        Self {
            focus_per_dividend_ratio: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoonDueConfig {
    pub min_delay_ms: u32,
    pub wake_padding_ms: u32,
    pub fallback_horizon_hours: u32,
}

impl SoonDueConfig {
    const MAX_MIN_DELAY_MS: u32 = 60_000;
    const MAX_WAKE_PADDING_MS: u32 = 10_000;
    const MAX_FALLBACK_HORIZON_HOURS: u32 = 24 * 7;
}

impl Default for SoonDueConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            wake_padding_ms: 100,
            fallback_horizon_hours: 24,
        }
    }
}

/// 検証済みの設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreSettings {
    pub pomodoro: PomodoroTimerSettings,
    pub focus_dividend: FocusDividendTimerSettings,
    pub soon_due: SoonDueSettings,
}

impl CoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<CoreSettings, ConfigError> {
        let pomodoro = PomodoroTimerSettings::new(
            Duration::minutes(i64::from(self.pomodoro.focus_minutes)),
            Duration::minutes(i64::from(self.pomodoro.short_break_minutes)),
            Duration::minutes(i64::from(self.pomodoro.long_break_minutes)),
            self.pomodoro.long_break_per_short_breaks,
        )?;
        let focus_dividend =
            FocusDividendTimerSettings::new(self.focus_dividend.focus_per_dividend_ratio)?;

        let soon_due = &self.soon_due;
        check_range(
            "soon_due.min_delay_ms",
            soon_due.min_delay_ms,
            1,
            SoonDueConfig::MAX_MIN_DELAY_MS,
        )?;
        check_range(
            "soon_due.wake_padding_ms",
            soon_due.wake_padding_ms,
            0,
            SoonDueConfig::MAX_WAKE_PADDING_MS,
        )?;
        check_range(
            "soon_due.fallback_horizon_hours",
            soon_due.fallback_horizon_hours,
            1,
            SoonDueConfig::MAX_FALLBACK_HORIZON_HOURS,
        )?;

        Ok(CoreSettings {
            pomodoro,
            focus_dividend,
            soon_due: SoonDueSettings {
                min_delay: Duration::milliseconds(i64::from(soon_due.min_delay_ms)),
                wake_padding: Duration::milliseconds(i64::from(soon_due.wake_padding_ms)),
                fallback_horizon: Duration::hours(i64::from(soon_due.fallback_horizon_hours)),
            },
        })
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::out_of_range(
            field,
            format!("{value} is not within {min}..={max}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.validate().unwrap(), CoreSettings::default());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [pomodoro]
            focus_minutes = 50
            long_break_per_short_breaks = 3

            [soon_due]
            wake_padding_ms = 250
            "#,
        )
        .unwrap();

        let settings = config.validate().unwrap();
        assert_eq!(settings.pomodoro.focus(), Duration::minutes(50));
        assert_eq!(settings.pomodoro.short_break(), Duration::minutes(5));
        assert_eq!(settings.pomodoro.long_break_per_short_breaks(), 3);
        assert_eq!(settings.soon_due.wake_padding, Duration::milliseconds(250));
        assert_eq!(settings.soon_due.min_delay, Duration::seconds(1));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CoreConfig::from_toml_str("[pomodoro]\nfocus = 25\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[rstest]
    #[case::focus_too_short("[pomodoro]\nfocus_minutes = 5")]
    #[case::long_break_count("[pomodoro]\nlong_break_per_short_breaks = 1")]
    #[case::ratio("[focus_dividend]\nfocus_per_dividend_ratio = 0")]
    #[case::no_min_delay("[soon_due]\nmin_delay_ms = 0")]
    #[case::horizon("[soon_due]\nfallback_horizon_hours = 1000")]
    fn out_of_range_values_fail_validation(#[case] toml: &str) {
        let config = CoreConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CoreConfig::load("/nonexistent/cadento.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cadento.toml"));
    }
}
