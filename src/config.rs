use crate::theme::Theme;
use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub data_path: PathBuf,
    pub bcrypt_cost: u32,
    pub default_theme: Theme,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);
        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/health.json"));
        let bcrypt_cost = lookup("HEALTH_BCRYPT_COST")
            .and_then(|value| value.parse::<u32>().ok())
            .map_or(bcrypt::DEFAULT_COST, |cost| cost.clamp(4, 31));
        let default_theme = lookup("HEALTH_THEME")
            .and_then(|value| Theme::parse(&value))
            .unwrap_or_default();

        Self {
            port,
            data_path,
            bcrypt_cost,
            default_theme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.data_path, PathBuf::from("data/health.json"));
        assert_eq!(s.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(s.default_theme, Theme::Light);
    }

    #[test]
    fn reads_and_clamps_overrides() {
        let s = settings(&[
            ("PORT", "9000"),
            ("APP_DATA_PATH", "/tmp/h.json"),
            ("HEALTH_BCRYPT_COST", "1"),
            ("HEALTH_THEME", "dark"),
        ]);
        assert_eq!(s.port, 9000);
        assert_eq!(s.data_path, PathBuf::from("/tmp/h.json"));
        assert_eq!(s.bcrypt_cost, 4);
        assert_eq!(s.default_theme, Theme::Dark);
    }

    #[test]
    fn garbage_falls_back() {
        let s = settings(&[("PORT", "eighty"), ("HEALTH_THEME", "neon")]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.default_theme, Theme::Light);
    }
}
