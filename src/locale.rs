//! Interface locale selection and persistence.
//!
//! The active locale is resolved once at startup: a persisted choice wins,
//! otherwise the process environment (`LC_ALL`, `LC_MESSAGES`, `LANG`) is
//! consulted, otherwise English. [`LocaleSettings::set_locale`] is the only way
//! to change it afterwards and writes the choice back to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{Error, Result};

/// Supported interface locale
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    /// English
    #[default]
    #[serde(rename = "en")]
    En,
    /// Simplified Chinese
    #[serde(rename = "zh")]
    Zh,
    /// Traditional Chinese
    #[serde(rename = "zh-TW")]
    ZhTw,
    /// Japanese
    #[serde(rename = "ja")]
    Ja,
    /// Korean
    #[serde(rename = "ko")]
    Ko,
    /// French
    #[serde(rename = "fr")]
    Fr,
    /// German
    #[serde(rename = "de")]
    De,
    /// Spanish
    #[serde(rename = "es")]
    Es,
    /// Russian
    #[serde(rename = "ru")]
    Ru,
    /// Italian
    #[serde(rename = "it")]
    It,
    /// Portuguese
    #[serde(rename = "pt")]
    Pt,
}

impl Locale {
    /// Every supported locale
    pub fn all() -> &'static [Locale] {
        &[
            Locale::En,
            Locale::Zh,
            Locale::ZhTw,
            Locale::Ja,
            Locale::Ko,
            Locale::Fr,
            Locale::De,
            Locale::Es,
            Locale::Ru,
            Locale::It,
            Locale::Pt,
        ]
    }

    /// Language tag
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
            Locale::ZhTw => "zh-TW",
            Locale::Ja => "ja",
            Locale::Ko => "ko",
            Locale::Fr => "fr",
            Locale::De => "de",
            Locale::Es => "es",
            Locale::Ru => "ru",
            Locale::It => "it",
            Locale::Pt => "pt",
        }
    }

    /// Best match for a system locale string such as `zh_TW.UTF-8` or `fr-CA`
    ///
    /// The Traditional script (`zh-Hant-*`) and Traditional Chinese regions
    /// (TW, HK, MO) map to `zh-TW`, other Chinese variants to `zh`, and everything else by its base language. Returns
    /// `None` for `C`/`POSIX` and unsupported languages.
    pub fn detect(tag: &str) -> Option<Locale> {
        // Drop ".UTF-8" and "@modifier" suffixes
        let tag = tag.split(['.', '@']).next().unwrap_or_default();
        let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
        if tag.is_empty() || tag == "c" || tag == "posix" {
            return None;
        }

        let mut subtags = tag.split('-');
        let base = subtags.next().unwrap_or_default();
        if base == "zh" {
            // Script subtag (zh-Hant-TW) decides before region (zh-TW)
            return match subtags.next() {
                Some("hant" | "tw" | "hk" | "mo") => Some(Locale::ZhTw),
                _ => Some(Locale::Zh),
            };
        }

        Locale::all()
            .iter()
            .copied()
            .find(|locale| locale.code() == base)
    }

    /// Detect from the process environment
    pub fn from_env() -> Option<Locale> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .and_then(|value| Locale::detect(&value))
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Locale {
    type Err = Error;

    /// Exact tag match, ignoring case and `_`/`-` differences
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.replace('_', "-");
        Locale::all()
            .iter()
            .copied()
            .find(|locale| locale.code().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::UnsupportedLocale(s.to_string()))
    }
}

/// On-disk form of the settings file
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSettings {
    locale: String,
}

/// Process-wide interface settings
#[derive(Debug)]
pub struct LocaleSettings {
    path: Option<PathBuf>,
    current: RwLock<Locale>,
}

impl LocaleSettings {
    /// Resolve the startup locale for a tracker configuration
    pub async fn from_config(config: &Config) -> Self {
        Self::load(config.settings_path.clone()).await
    }

    /// Resolve the startup locale: persisted value, then environment, then English
    ///
    /// An unreadable or invalid settings file is logged and ignored.
    pub async fn load(path: Option<PathBuf>) -> Self {
        Self::resolve(path, Locale::from_env()).await
    }

    pub(crate) async fn resolve(path: Option<PathBuf>, detected: Option<Locale>) -> Self {
        let persisted = match &path {
            Some(path) => read_persisted(path).await,
            None => None,
        };

        let locale = match (persisted, detected) {
            (Some(locale), _) => {
                tracing::debug!(locale = %locale, "using persisted locale");
                locale
            }
            (None, Some(locale)) => {
                tracing::debug!(locale = %locale, "using locale detected from environment");
                locale
            }
            (None, None) => Locale::default(),
        };

        Self {
            path,
            current: RwLock::new(locale),
        }
    }

    /// In-memory settings that are never persisted
    pub fn in_memory(locale: Locale) -> Self {
        Self {
            path: None,
            current: RwLock::new(locale),
        }
    }

    /// Active locale
    pub async fn locale(&self) -> Locale {
        *self.current.read().await
    }

    /// Where the settings are persisted, if anywhere
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Change the active locale and persist the choice
    ///
    /// The in-memory value only changes once the file has been written, so a
    /// failed write leaves the previous locale active.
    pub async fn set_locale(&self, locale: Locale) -> Result<()> {
        let mut current = self.current.write().await;

        if let Some(path) = &self.path {
            let json = serde_json::to_vec_pretty(&PersistedSettings {
                locale: locale.code().to_string(),
            })?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(path, json).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write '{}': {}", path.display(), e),
                ))
            })?;
        }

        tracing::info!(from = %*current, to = %locale, "locale changed");
        *current = locale;
        Ok(())
    }
}

async fn read_persisted(path: &Path) -> Option<Locale> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read settings file");
            return None;
        }
    };

    let persisted: PersistedSettings = match serde_json::from_slice(&bytes) {
        Ok(persisted) => persisted,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
            return None;
        }
    };

    match persisted.locale.parse() {
        Ok(locale) => Some(locale),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring persisted locale");
            None
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_system_tags() {
        assert_eq!(Locale::detect("en_US.UTF-8"), Some(Locale::En));
        assert_eq!(Locale::detect("fr-CA"), Some(Locale::Fr));
        assert_eq!(Locale::detect("zh_TW.UTF-8"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("zh-HK"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("zh_CN.GB2312"), Some(Locale::Zh));
        assert_eq!(Locale::detect("zh"), Some(Locale::Zh));
        assert_eq!(Locale::detect("zh-Hant"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("zh-Hant-TW"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("zh_Hant_HK.UTF-8"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("zh-Hans-CN"), Some(Locale::Zh));
        assert_eq!(Locale::detect("zh_MO"), Some(Locale::ZhTw));
        assert_eq!(Locale::detect("de_DE@euro"), Some(Locale::De));
        assert_eq!(Locale::detect("pt_BR"), Some(Locale::Pt));
        assert_eq!(Locale::detect("C"), None);
        assert_eq!(Locale::detect("POSIX"), None);
        assert_eq!(Locale::detect("nl_NL"), None);
        assert_eq!(Locale::detect(""), None);
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!("zh-TW".parse::<Locale>().unwrap(), Locale::ZhTw);
        assert_eq!("zh_tw".parse::<Locale>().unwrap(), Locale::ZhTw);
        assert_eq!("JA".parse::<Locale>().unwrap(), Locale::Ja);
        let err = "klingon".parse::<Locale>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedLocale(_)));
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Locale::ZhTw).unwrap(), "\"zh-TW\"");
        let locale: Locale = serde_json::from_str("\"ko\"").unwrap();
        assert_eq!(locale, Locale::Ko);
    }

    #[tokio::test]
    async fn test_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        // Nothing persisted, nothing detected
        let settings = LocaleSettings::resolve(Some(path.clone()), None).await;
        assert_eq!(settings.locale().await, Locale::En);

        // Detected
        let settings = LocaleSettings::resolve(Some(path.clone()), Some(Locale::Ja)).await;
        assert_eq!(settings.locale().await, Locale::Ja);

        // Persisted beats detected
        std::fs::write(&path, r#"{"locale":"zh-TW"}"#).unwrap();
        let settings = LocaleSettings::resolve(Some(path), Some(Locale::Ja)).await;
        assert_eq!(settings.locale().await, Locale::ZhTw);
    }

    #[tokio::test]
    async fn test_malformed_settings_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        std::fs::write(&path, "not json").unwrap();
        let settings = LocaleSettings::resolve(Some(path.clone()), Some(Locale::Fr)).await;
        assert_eq!(settings.locale().await, Locale::Fr);

        std::fs::write(&path, r#"{"locale":"xx"}"#).unwrap();
        let settings = LocaleSettings::resolve(Some(path), None).await;
        assert_eq!(settings.locale().await, Locale::En);
    }

    #[tokio::test]
    async fn test_set_locale_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = LocaleSettings::resolve(Some(path.clone()), None).await;
        settings.set_locale(Locale::De).await.unwrap();
        assert_eq!(settings.locale().await, Locale::De);

        let reloaded = LocaleSettings::resolve(Some(path), Some(Locale::Ja)).await;
        assert_eq!(reloaded.locale().await, Locale::De);
    }

    #[tokio::test]
    async fn test_in_memory_settings() {
        let settings = LocaleSettings::in_memory(Locale::Ko);
        assert!(settings.path().is_none());
        settings.set_locale(Locale::Ru).await.unwrap();
        assert_eq!(settings.locale().await, Locale::Ru);
    }

    #[tokio::test]
    async fn test_from_config_without_path_is_not_persisted() {
        let settings = LocaleSettings::from_config(&Config::default()).await;
        assert!(settings.path().is_none());
    }
}
