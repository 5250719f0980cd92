//! Session configuration for the feedback viewer.
//!
//! Every key is optional; an empty file yields the defaults of a
//! 1000x1000, 30 FPS, 100-iteration session over `[-2, 2]²`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use scheduler::MAX_FRAME_INTERVAL;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_DIMENSION: u32 = 1000;
pub const DEFAULT_FPS: f32 = 30.0;
pub const DEFAULT_MAX_ITERATIONS: u32 = scheduler::DEFAULT_MAX_ITERATIONS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecenterSetting {
    #[default]
    PerAxis,
    SharedX,
}

impl RecenterSetting {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "per-axis" | "per_axis" | "peraxis" => Some(Self::PerAxis),
            "shared-x" | "shared_x" | "sharedx" => Some(Self::SharedX),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    /// Overrides `fps` when present.
    #[serde(
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_interval: Option<Duration>,
    pub max_iterations: u32,
    /// Compute program source; the built-in program is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader: Option<PathBuf>,
    pub domain: DomainConfig,
    pub zoom: ZoomConfig,
    pub gpu: GpuConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            fps: DEFAULT_FPS,
            frame_interval: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            shader: None,
            domain: DomainConfig::default(),
            zoom: ZoomConfig::default(),
            gpu: GpuConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DomainConfig {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            x: [-2.0, 2.0],
            y: [-2.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub in_factor: f64,
    pub out_factor: f64,
    pub recenter: RecenterSetting,
    pub restart_on_remap: bool,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            in_factor: 0.5,
            out_factor: 2.0,
            recenter: RecenterSetting::default(),
            restart_on_remap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GpuConfig {
    pub power: PowerSetting,
    pub vsync: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power: PowerSetting::default(),
            vsync: true,
        }
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be finite and non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => {
            serializer.serialize_str(&humantime::format_duration(*duration).to_string())
        }
        None => serializer.serialize_none(),
    }
}

impl SessionConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SessionConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Spacing between feedback steps; `frame_interval` wins over `fps`.
    /// Never longer than [`MAX_FRAME_INTERVAL`].
    pub fn min_frame_interval(&self) -> Duration {
        let interval = match self.frame_interval {
            Some(interval) => interval,
            None => Duration::try_from_secs_f64(1.0 / f64::from(self.fps))
                .unwrap_or(MAX_FRAME_INTERVAL),
        };
        interval.min(MAX_FRAME_INTERVAL)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        let slowest_fps = 1.0 / MAX_FRAME_INTERVAL.as_secs_f64();
        if !self.fps.is_finite() || f64::from(self.fps) < slowest_fps {
            return Err(ConfigError::Invalid(format!(
                "fps must be at least one frame per {}, got {}",
                humantime::format_duration(MAX_FRAME_INTERVAL),
                self.fps
            )));
        }

        if let Some(interval) = self.frame_interval {
            if interval.is_zero() || interval > MAX_FRAME_INTERVAL {
                return Err(ConfigError::Invalid(format!(
                    "frame_interval must lie in (0, {}], got {}",
                    humantime::format_duration(MAX_FRAME_INTERVAL),
                    humantime::format_duration(interval)
                )));
            }
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".into(),
            ));
        }

        for (axis, range) in [("x", self.domain.x), ("y", self.domain.y)] {
            let [min, max] = range;
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(ConfigError::Invalid(format!(
                    "domain.{axis} must be finite with min < max, got [{min}, {max}]"
                )));
            }
        }

        let zoom = &self.zoom;
        if !zoom.in_factor.is_finite() || zoom.in_factor <= 0.0 || zoom.in_factor >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "zoom.in_factor must lie in (0, 1), got {}",
                zoom.in_factor
            )));
        }
        if !zoom.out_factor.is_finite() || zoom.out_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "zoom.out_factor must be a finite number greater than 1, got {}",
                zoom.out_factor
            )));
        }

        if let Some(shader) = &self.shader {
            if shader.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("shader path may not be empty".into()));
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
width = 800
height = 600
frame_interval = "50ms"
max_iterations = 250
shader = "shaders/julia.frag"

[domain]
x = [-2.5, 1.0]
y = [-1.25, 1.25]

[zoom]
in_factor = 0.25
recenter = "shared-x"
restart_on_remap = false

[gpu]
power = "low"
vsync = false
"#;

    #[test]
    fn parses_sample_config() {
        let config = SessionConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.frame_interval, Some(Duration::from_millis(50)));
        assert_eq!(config.min_frame_interval(), Duration::from_millis(50));
        assert_eq!(config.max_iterations, 250);
        assert_eq!(config.shader, Some(PathBuf::from("shaders/julia.frag")));
        assert_eq!(config.domain.x, [-2.5, 1.0]);
        assert_eq!(config.zoom.in_factor, 0.25);
        assert_eq!(config.zoom.out_factor, 2.0);
        assert_eq!(config.zoom.recenter, RecenterSetting::SharedX);
        assert!(!config.zoom.restart_on_remap);
        assert_eq!(config.gpu.power, PowerSetting::Low);
        assert!(!config.gpu.vsync);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = SessionConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.min_frame_interval(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn integer_domain_bounds_are_accepted() {
        let config = SessionConfig::from_toml_str("[domain]\nx = [-1, 1]\n").unwrap();
        assert_eq!(config.domain.x, [-1.0, 1.0]);
        assert_eq!(config.domain.y, [-2.0, 2.0]);
    }

    #[test]
    fn numeric_interval_is_seconds() {
        let config = SessionConfig::from_toml_str("frame_interval = 2").unwrap();
        assert_eq!(config.min_frame_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = SessionConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_invalid_values() {
        for input in [
            "width = 0",
            "fps = 0",
            "fps = -10.0",
            "frame_interval = \"0s\"",
            "fps = 1e-40",
            "frame_interval = 9000000000000000000",
            "frame_interval = \"2h\"",
            "max_iterations = 0",
            "[domain]\nx = [1.0, 1.0]",
            "[domain]\ny = [2.0, -2.0]",
            "[zoom]\nin_factor = 1.0",
            "[zoom]\nin_factor = 0.0",
            "[zoom]\nout_factor = 1.0",
        ] {
            let err = SessionConfig::from_toml_str(input).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(_)),
                "expected {input:?} to be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn slowest_accepted_rate_maps_to_max_interval() {
        let config = SessionConfig::from_toml_str("frame_interval = \"1h\"").unwrap();
        assert_eq!(config.min_frame_interval(), MAX_FRAME_INTERVAL);

        let unvalidated = SessionConfig {
            fps: 1e-40,
            ..SessionConfig::default()
        };
        assert_eq!(unvalidated.min_frame_interval(), MAX_FRAME_INTERVAL);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = SessionConfig::from_toml_str("width = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = SessionConfig::from_toml_str("frame_interval = 1e30").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = SessionConfig::from_toml_str("frame_interval = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = SessionConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("frame_interval = \"50ms\""));
        assert!(rendered.contains("recenter = \"shared-x\""));
        let reparsed = SessionConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn recenter_setting_parses_aliases() {
        assert_eq!(RecenterSetting::parse("Per-Axis"), Some(RecenterSetting::PerAxis));
        assert_eq!(RecenterSetting::parse("shared_x"), Some(RecenterSetting::SharedX));
        assert_eq!(RecenterSetting::parse("diagonal"), None);
    }
}
