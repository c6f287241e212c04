use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Uniform names the runtime drives itself; presets may not target them.
const RESERVED_UNIFORMS: [&str; 2] = ["iTime", "iResolution"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LiveConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformPreset>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSection::default(),
            runtime: RuntimeSection::default(),
            watch: WatchSection::default(),
            uniforms: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub small_width: u32,
    pub small_height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "shadelive".to_string(),
            width: 1280,
            height: 720,
            small_width: 480,
            small_height: 270,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectSetting {
    #[default]
    Auto,
    Gles,
    Desktop,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Frames a shader without `iTime` keeps drawing after its last change.
    pub idle_frames: u32,
    pub dialect: DialectSetting,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            idle_frames: 100,
            dialect: DialectSetting::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchSection {
    #[serde(default = "default_watch_enabled")]
    pub enabled: bool,
    #[serde(
        default = "default_debounce",
        deserialize_with = "deserialize_duration"
    )]
    pub debounce: Duration,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            enabled: default_watch_enabled(),
            debounce: default_debounce(),
        }
    }
}

/// Initial value(s) for a uniform the first time a shader declares it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UniformPreset {
    Scalar(f32),
    Components(Vec<f32>),
}

impl UniformPreset {
    pub fn values(&self) -> Vec<f32> {
        match self {
            UniformPreset::Scalar(value) => vec![*value],
            UniformPreset::Components(values) => values.clone(),
        }
    }
}

fn default_watch_enabled() -> bool {
    true
}

fn default_debounce() -> Duration {
    Duration::from_millis(150)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || !v.is_finite() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl LiveConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: LiveConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Presets flattened to plain component lists.
    pub fn uniform_defaults(&self) -> BTreeMap<String, Vec<f32>> {
        self.uniforms
            .iter()
            .map(|(name, preset)| (name.clone(), preset.values()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be greater than zero".into(),
            ));
        }
        if window.small_width == 0 || window.small_height == 0 {
            return Err(ConfigError::Invalid(
                "window small_width and small_height must be greater than zero".into(),
            ));
        }

        if self.runtime.idle_frames == 0 {
            return Err(ConfigError::Invalid(
                "runtime.idle_frames must be greater than zero".into(),
            ));
        }

        for (name, preset) in &self.uniforms {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "uniform preset names may not be empty".into(),
                ));
            }
            if RESERVED_UNIFORMS.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "uniform '{name}' is driven by the runtime and cannot be preset"
                )));
            }
            if preset.values().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "uniform '{name}' preset must contain at least one value"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
title = "sketch"
width = 1920
height = 1080

[runtime]
idle_frames = 240
dialect = "desktop"

[watch]
debounce = "250ms"

[uniforms]
speed = 1
tint = [1.0, 0.5, 0.2]
"#;

    #[test]
    fn parses_sample_config() {
        let config = LiveConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.title, "sketch");
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.small_width, 480);
        assert_eq!(config.runtime.idle_frames, 240);
        assert_eq!(config.runtime.dialect, DialectSetting::Desktop);
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce, Duration::from_millis(250));

        let defaults = config.uniform_defaults();
        assert_eq!(defaults["speed"], vec![1.0]);
        assert_eq!(defaults["tint"], vec![1.0, 0.5, 0.2]);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = LiveConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, LiveConfig::default());
        assert_eq!(config.watch.debounce, Duration::from_millis(150));
    }

    #[test]
    fn debounce_accepts_plain_seconds() {
        let config = LiveConfig::from_toml_str("version = 1\n[watch]\ndebounce = 0.5\n").unwrap();
        assert_eq!(config.watch.debounce, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = LiveConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_sizes_and_idle_frames() {
        for input in [
            "version = 1\n[window]\nwidth = 0\n",
            "version = 1\n[window]\nsmall_height = 0\n",
            "version = 1\n[runtime]\nidle_frames = 0\n",
        ] {
            let err = LiveConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{input}");
        }
    }

    #[test]
    fn rejects_reserved_and_empty_presets() {
        let err = LiveConfig::from_toml_str("version = 1\n[uniforms]\niTime = 3.0\n").unwrap_err();
        assert!(err.to_string().contains("iTime"));

        let err = LiveConfig::from_toml_str("version = 1\n[uniforms]\ntint = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reports_parse_errors() {
        let err = LiveConfig::from_toml_str("version = 1\n[runtime]\ndialect = \"metal\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
