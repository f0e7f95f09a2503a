use celpaint_core::undo::UndoConfig;

const DOCUMENTATION: &str = r#"# Celpaint preferences. You may edit this file, but be aware that formatting and comments will not
# be preserved if it is ever rewritten.

# log_level is one of "off", "error", "warn", "info", "debug", "trace".
# [undo]
# enabled = true
# size_limit = 67108864 # Bytes. Remove to keep every step.

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}
impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub log_level: LogLevel,
    pub undo: UndoConfig,
    #[serde(skip)]
    failed_to_load: bool,
}
impl Preferences {
    const FILENAME: &'static str = "preferences.toml";
    /// Load the user's preferences, or defaults if unavailable for some reason.
    ///
    /// Called before logging is up, so check [`Self::did_fail_to_load`] to report problems.
    #[must_use]
    pub fn load() -> Self {
        match preferences_dir() {
            None => Self::no_path(),
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        }
    }
    #[must_use]
    fn no_path() -> Self {
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let preferences: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let preferences : Self = toml::from_str(&string)?;
            Ok(preferences)
        };
        preferences.unwrap_or_else(|_| Self::no_path())
    }
    /// Return true if loading user's settings failed. This can be useful for
    /// displaying a warning.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    /// Write these preferences out, unless the user already has a file.
    pub fn save_if_missing(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        if preferences.try_exists()? {
            return Ok(());
        }
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(preferences, string)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let preferences: Preferences = toml::from_str(
            r#"
            log_level = "trace"
            [undo]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(preferences.log_level, LogLevel::Trace);
        assert!(!preferences.undo.enabled);
        assert_eq!(preferences.undo.size_limit, UndoConfig::default().size_limit);
        assert!(!preferences.did_fail_to_load());
    }
    #[test]
    fn missing_file_defaults() {
        let preferences = Preferences::load_or_default(std::path::Path::new(
            "this/path/should/not/exist/preferences.toml",
        ));
        assert!(preferences.did_fail_to_load());
        assert_eq!(preferences.undo, UndoConfig::default());
        assert_eq!(
            log::LevelFilter::from(preferences.log_level),
            log::LevelFilter::Info
        );
    }
}
