use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::error::GhgError;
use crate::factors::{merge_with_custom, FactorLibrary, MergeReport};
use crate::logging;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = GhgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" | "" => Ok(Theme::System),
            other => Err(GhgError::InvalidData(format!("Unknown theme '{}'", other))),
        }
    }
}

/// User preferences, stored as JSON next to the project files.
///
/// `log_level` feeds [`Settings::init_logging`]; theme, language and
/// currency reach the HTML report through `ReportConfig::from_settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub language: String,
    /// ISO 4217 code used to label spend-based quantities.
    pub currency: String,
    /// `EnvFilter` directive, e.g. "info" or "_core=debug".
    pub log_level: String,
    /// JSON file holding the user's custom emission factors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factor_library_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            currency: "USD".to_string(),
            log_level: "info".to_string(),
            factor_library_path: None,
        }
    }
}

/// Fields set here replace the corresponding settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub currency: Option<String>,
    pub log_level: Option<String>,
    pub factor_library_path: Option<PathBuf>,
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, GhgError> {
        if !path.exists() {
            debug!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), GhgError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn merge(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(theme) = overrides.theme {
            self.theme = theme;
        }
        if let Some(language) = overrides.language {
            self.language = language;
        }
        if let Some(currency) = overrides.currency {
            self.currency = currency;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(path) = overrides.factor_library_path {
            self.factor_library_path = Some(path);
        }
        self
    }

    pub fn validate(&self) -> Result<(), GhgError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(GhgError::Validation(format!(
                "Currency '{}' is not a three-letter ISO code",
                self.currency
            )));
        }
        if self.language.trim().is_empty() {
            return Err(GhgError::Validation("Language must not be empty".into()));
        }
        EnvFilter::try_new(&self.log_level).map_err(|e| {
            GhgError::Validation(format!("Log level '{}' does not parse: {}", self.log_level, e))
        })?;
        Ok(())
    }

    /// Install the global subscriber at `log_level`. `RUST_LOG` still wins.
    pub fn init_logging(&self) -> Result<(), GhgError> {
        logging::init(Some(&self.log_level))
    }

    /// The built-in factors plus the custom factors saved at
    /// `factor_library_path`, if any.
    pub fn factor_library(&self) -> Result<(FactorLibrary, MergeReport), GhgError> {
        let base = FactorLibrary::defaults();
        match &self.factor_library_path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                let saved: FactorLibrary = serde_json::from_str(&content)?;
                Ok(merge_with_custom(&base, &saved))
            }
            _ => Ok((base, MergeReport::default())),
        }
    }

    /// Persist the custom factors of `library` to `factor_library_path`.
    pub fn save_custom_factors(&self, library: &FactorLibrary) -> Result<(), GhgError> {
        let path = self.factor_library_path.as_deref().ok_or_else(|| {
            GhgError::NotLoaded("No factor library path configured".into())
        })?;
        let mut custom = FactorLibrary::new();
        for (category, sub_table, factor) in library.custom_factors() {
            custom.add_custom(category, sub_table, factor.clone())?;
        }
        fs::write(path, serde_json::to_string_pretty(&custom)?)?;
        info!(path = %path.display(), "custom factors saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::EmissionCategory;
    use crate::factors::{EmissionFactor, SubTable};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "theme": "dark", "currency": "EUR" }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.language, "en");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings::default().merge(SettingsOverrides {
            theme: Some(Theme::Light),
            log_level: Some("debug".into()),
            ..SettingsOverrides::default()
        });
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let merged = Settings::default().merge(SettingsOverrides {
            currency: Some("GBP".into()),
            ..SettingsOverrides::default()
        });
        assert_eq!(merged.currency, "GBP");
        assert_eq!(merged.theme, Theme::System);
        assert_eq!(merged.log_level, "info");
    }

    #[test]
    fn invalid_currency_is_rejected() {
        let settings = Settings {
            currency: "euro".into(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_log_level_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "log_level": "ghg=verbose" }"#).unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, GhgError::Validation(ref m) if m.contains("ghg=verbose")));

        let debug = Settings {
            log_level: "_core=debug,warn".into(),
            ..Settings::default()
        };
        assert!(debug.validate().is_ok());
    }

    #[test]
    fn theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn custom_factors_survive_a_save() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            factor_library_path: Some(dir.path().join("factors.json")),
            ..Settings::default()
        };
        let (mut library, _) = settings.factor_library().unwrap();
        library
            .add_custom(
                EmissionCategory::StationaryCombustion,
                SubTable::Activity,
                EmissionFactor::new("Biogas", "cubic meters", 0.2),
            )
            .unwrap();
        settings.save_custom_factors(&library).unwrap();

        let (reloaded, report) = settings.factor_library().unwrap();
        assert_eq!(
            report.added,
            vec![(EmissionCategory::StationaryCombustion, "Biogas".to_string())]
        );
        assert_eq!(reloaded.custom_factors().count(), 1);
    }
}
