//! Plot configuration: JSON documents or the `KEY = VALUE` text format, both
//! deserialized into the same typed structs.

mod palette;
mod text;

pub use palette::{ColorScheme, PRESET_PALETTES, Palette, normalize_color};

use crate::kpath::{
    DEFAULT_COLLINEARITY_TOLERANCE, DEFAULT_DEDUP_TOLERANCE, DEFAULT_MAX_STEP_MULTIPLE,
    DEFAULT_STEP_TOLERANCE, DEFAULT_TICK_TOLERANCE, DEFAULT_WEIGHT_THRESHOLD, PathTolerances,
};
use crate::tensor::{OrbitalGroup, SpinLayout};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {message}")]
    Read { path: String, message: String },
    #[error("line {line}: expected KEY = VALUE, got '{text}'")]
    Syntax { line: usize, text: String },
    #[error("list value for {key} starting on line {line} is never closed")]
    UnterminatedList { key: String, line: usize },
    #[error("{key} is set twice (line {line})")]
    DuplicateKey { key: String, line: usize },
    #[error("invalid configuration: {message}")]
    Parse { message: String },
    #[error("missing required key {key}")]
    MissingKey { key: &'static str },
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("invalid colour '{value}'")]
    InvalidColor { value: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// A configuration document that checks its own values after parsing.
pub trait ConfigDocument: DeserializeOwned {
    fn validate(&self) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default, deny_unknown_fields)]
pub struct BandConfig {
    pub orbital_info: Vec<OrbitalGroup>,
    pub ispin: u8,
    #[serde(deserialize_with = "flexible_bool")]
    pub soc: bool,
    pub efermi: Option<f64>,
    pub scale: f64,
    pub transparency: f64,
    pub title: String,
    pub ymin: f64,
    pub ymax: f64,
    pub color_scheme: ColorScheme,
    pub labels: Option<Vec<String>>,
    pub weight_threshold: f64,
    pub dedup_tolerance: f64,
    pub step_tolerance: f64,
    pub max_step_multiple: u32,
    pub collinearity_tolerance: f64,
    pub tick_tolerance: f64,
    pub axis_width: Option<f64>,
    pub plot_option: u8,
    pub figsizex: f64,
    pub figsizey: f64,
    pub dpi: u32,
    pub linewidth: f64,
    pub saveas: String,
    pub legend_loc: Option<String>,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            orbital_info: Vec::new(),
            ispin: 1,
            soc: false,
            efermi: None,
            scale: 1.0,
            transparency: 70.0,
            title: "Orbital projected Band Structure".to_string(),
            ymin: -5.0,
            ymax: 5.0,
            color_scheme: ColorScheme::default(),
            labels: None,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
            step_tolerance: DEFAULT_STEP_TOLERANCE,
            max_step_multiple: DEFAULT_MAX_STEP_MULTIPLE,
            collinearity_tolerance: DEFAULT_COLLINEARITY_TOLERANCE,
            tick_tolerance: DEFAULT_TICK_TOLERANCE,
            axis_width: Some(3.0),
            plot_option: 0,
            figsizex: 10.0,
            figsizey: 6.0,
            dpi: 300,
            linewidth: 1.0,
            saveas: "orbband.jpg".to_string(),
            legend_loc: None,
        }
    }
}

impl BandConfig {
    pub fn tolerances(&self) -> PathTolerances {
        PathTolerances {
            weight_threshold: self.weight_threshold,
            dedup_tolerance: self.dedup_tolerance,
            step_tolerance: self.step_tolerance,
            max_step_multiple: self.max_step_multiple,
            collinearity_tolerance: self.collinearity_tolerance,
            tick_tolerance: self.tick_tolerance,
        }
    }

    pub fn spin_layout(&self) -> Result<SpinLayout, ConfigError> {
        SpinLayout::from_flags(self.ispin, self.soc).ok_or_else(|| {
            ConfigError::invalid("ISPIN", format!("must be 1 or 2, got {}", self.ispin))
        })
    }

    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Palette::resolve(&self.color_scheme, self.orbital_info.len())
    }
}

impl ConfigDocument for BandConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_common(&self.orbital_info, self.ymin, self.ymax, self.transparency)?;
        self.spin_layout()?;
        for (key, value) in [
            ("WEIGHT_THRESHOLD", self.weight_threshold),
            ("DEDUP_TOLERANCE", self.dedup_tolerance),
            ("STEP_TOLERANCE", self.step_tolerance),
            ("COLLINEARITY_TOLERANCE", self.collinearity_tolerance),
            ("TICK_TOLERANCE", self.tick_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    key,
                    format!("must be finite and >= 0, got {value}"),
                ));
            }
        }
        if self.max_step_multiple == 0 {
            return Err(ConfigError::invalid("MAX_STEP_MULTIPLE", "must be at least 1"));
        }
        if let Some(width) = self.axis_width.filter(|width| !width.is_finite() || *width <= 0.0) {
            return Err(ConfigError::invalid(
                "AXIS_WIDTH",
                format!("must be positive, got {width}"),
            ));
        }
        if self.plot_option > 1 {
            return Err(ConfigError::invalid(
                "PLOT_OPTION",
                format!("must be 0 (scatter) or 1 (parametric), got {}", self.plot_option),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default, deny_unknown_fields)]
pub struct DosConfig {
    pub orbital_info: Vec<OrbitalGroup>,
    pub ispin: u8,
    pub efermi: Option<f64>,
    pub sigma: f64,
    #[serde(deserialize_with = "flexible_bool")]
    pub show_tdos: bool,
    #[serde(deserialize_with = "flexible_bool")]
    pub normalize: bool,
    pub transparency: f64,
    pub title: String,
    pub ymin: f64,
    pub ymax: f64,
    pub xmin: Option<f64>,
    pub xmax: Option<f64>,
    pub bins: usize,
    pub color_scheme: ColorScheme,
    pub figsizex: f64,
    pub figsizey: f64,
    pub dpi: u32,
    pub tdos_linewidth: f64,
    pub pdos_linewidth: f64,
    pub saveas: String,
    pub legend_loc: Option<String>,
}

impl Default for DosConfig {
    fn default() -> Self {
        Self {
            orbital_info: Vec::new(),
            ispin: 1,
            efermi: None,
            sigma: 2.0,
            show_tdos: true,
            normalize: false,
            transparency: 90.0,
            title: "Orbital Projected Density of States".to_string(),
            ymin: -5.0,
            ymax: 5.0,
            xmin: None,
            xmax: None,
            bins: 400,
            color_scheme: ColorScheme::default(),
            figsizex: 10.0,
            figsizey: 6.0,
            dpi: 300,
            tdos_linewidth: 1.0,
            pdos_linewidth: 1.0,
            saveas: "pdos_output.png".to_string(),
            legend_loc: None,
        }
    }
}

impl DosConfig {
    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Palette::resolve(&self.color_scheme, self.orbital_info.len())
    }
}

impl ConfigDocument for DosConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_common(&self.orbital_info, self.ymin, self.ymax, self.transparency)?;
        if !matches!(self.ispin, 1 | 2) {
            return Err(ConfigError::invalid(
                "ISPIN",
                format!("must be 1 or 2, got {}", self.ispin),
            ));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(ConfigError::invalid("SIGMA", format!("must be >= 0, got {}", self.sigma)));
        }
        if let (Some(min), Some(max)) = (self.xmin, self.xmax) {
            if min >= max {
                return Err(ConfigError::invalid("XMIN", format!("{min} is not below XMAX {max}")));
            }
        }
        if self.bins == 0 {
            return Err(ConfigError::invalid("BINS", "must be at least 1"));
        }
        Ok(())
    }
}

fn validate_common(
    orbital_info: &[OrbitalGroup],
    ymin: f64,
    ymax: f64,
    transparency: f64,
) -> Result<(), ConfigError> {
    if orbital_info.is_empty() {
        return Err(ConfigError::MissingKey { key: "ORBITAL_INFO" });
    }
    if let Some(group) = orbital_info
        .iter()
        .find(|group| group.atoms.is_empty() || group.orbitals.is_empty())
    {
        return Err(ConfigError::invalid(
            "ORBITAL_INFO",
            format!("group '{}' needs at least one atom and one orbital", group.label),
        ));
    }
    if ymin >= ymax {
        return Err(ConfigError::invalid("YMIN", format!("{ymin} is not below YMAX {ymax}")));
    }
    if !(0.0..=100.0).contains(&transparency) {
        return Err(ConfigError::invalid(
            "TRANSPARENCY",
            format!("must be within 0..=100, got {transparency}"),
        ));
    }
    Ok(())
}

/// Accepts `true`/`false`, `1`/`0`, and the strings `on`/`off`/`true`/`false`.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) if number.as_i64() == Some(1) => Ok(true),
        Value::Number(number) if number.as_i64() == Some(0) => Ok(false),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | ".true." => Ok(true),
            "false" | "off" | "0" | ".false." => Ok(false),
            other => Err(de::Error::custom(format!("expected a boolean, got '{other}'"))),
        },
        other => Err(de::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Parses a JSON document (leading `{`) or the `KEY = VALUE` text format.
pub fn parse_config<T: ConfigDocument>(source: &str) -> Result<T, ConfigError> {
    let document = if source.trim_start().starts_with('{') {
        serde_json::from_str::<Value>(source).map_err(|source| ConfigError::Parse {
            message: source.to_string(),
        })?
    } else {
        Value::Object(text::parse_key_values(source)?)
    };

    let config: T = serde_json::from_value(document).map_err(|source| ConfigError::Parse {
        message: source.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_config<T: ConfigDocument>(path: &Path) -> Result<T, ConfigError> {
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        message: source.to_string(),
    })?;
    let config = parse_config(&source)?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{BandConfig, ColorScheme, ConfigError, DosConfig, load_config, parse_config};
    use crate::tensor::{OrbitalGroup, SpinLayout};
    use std::fs;
    use tempfile::TempDir;

    const BAND_TEXT: &str = "\
ORBITAL_INFO = [[[0], 'Fe', [4, 5, 6]], [[1, 2], 'O', [1, 2, 3]]]
ISPIN = 2
EFERMI = 4.5
COLOR_SCHEME = ['ff0000', '0000ff']
LABELS = ['\\u0393', 'X', 'M']
";

    #[test]
    fn text_and_json_documents_produce_the_same_config() {
        let from_text: BandConfig = parse_config(BAND_TEXT).expect("text config");
        let from_json: BandConfig = parse_config(
            r#"{
                "ORBITAL_INFO": [[[0], "Fe", [4, 5, 6]], [[1, 2], "O", [1, 2, 3]]],
                "ISPIN": 2,
                "EFERMI": 4.5,
                "COLOR_SCHEME": ["ff0000", "0000ff"],
                "LABELS": ["\u0393", "X", "M"]
            }"#,
        )
        .expect("json config");

        assert_eq!(from_text, from_json);
        assert_eq!(from_text.orbital_info[1], OrbitalGroup::new(vec![1, 2], "O", vec![1, 2, 3]));
        assert_eq!(from_text.spin_layout().expect("layout"), SpinLayout::Collinear);
        assert_eq!(
            from_text.color_scheme,
            ColorScheme::Explicit(vec!["ff0000".to_string(), "0000ff".to_string()])
        );
        assert_eq!(from_text.transparency, 70.0);
        assert_eq!(from_text.axis_width, Some(3.0));
    }

    #[test]
    fn unknown_keys_and_missing_orbitals_are_rejected() {
        let error = parse_config::<BandConfig>("ORBITAL_INFO = [[[0], 'Fe', [0]]]\nFOO = 1\n")
            .expect_err("unknown key");
        assert!(matches!(&error, ConfigError::Parse { message } if message.contains("FOO")));

        let error = parse_config::<BandConfig>("ISPIN = 1\n").expect_err("no orbitals");
        assert_eq!(error, ConfigError::MissingKey { key: "ORBITAL_INFO" });
    }

    #[test]
    fn soc_flag_accepts_on_off_spellings() {
        let config: BandConfig =
            parse_config("ORBITAL_INFO = [[[0], 'Fe', [0]]]\nSOC = on\n").expect("config");
        assert_eq!(config.spin_layout().expect("layout"), SpinLayout::SpinOrbit);

        let config: BandConfig =
            parse_config("ORBITAL_INFO = [[[0], 'Fe', [0]]]\nSOC = 0\n").expect("config");
        assert!(!config.soc);
    }

    #[test]
    fn out_of_range_values_are_reported_by_key() {
        let error = parse_config::<BandConfig>("ORBITAL_INFO = [[[0], 'Fe', [0]]]\nISPIN = 3\n")
            .expect_err("ispin 3");
        assert!(matches!(error, ConfigError::InvalidValue { ref key, .. } if key == "ISPIN"));

        let error =
            parse_config::<DosConfig>("ORBITAL_INFO = [[[0], 'Fe', [0]]]\nYMIN = 2\nYMAX = 1\n")
                .expect_err("inverted y range");
        assert!(matches!(error, ConfigError::InvalidValue { ref key, .. } if key == "YMIN"));
    }

    #[test]
    fn dos_defaults_follow_the_plotting_conventions() {
        let config: DosConfig =
            parse_config("ORBITAL_INFO = [[[0], 'Fe', [4]]]\nNORMALIZE = true\n").expect("config");
        assert_eq!(config.sigma, 2.0);
        assert!(config.show_tdos);
        assert!(config.normalize);
        assert_eq!(config.transparency, 90.0);
    }

    #[test]
    fn load_config_reports_missing_files_as_read_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = temp.path().join("absent.in");
        let error = load_config::<BandConfig>(&missing).expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));

        let path = temp.path().join("band.in");
        fs::write(&path, BAND_TEXT).expect("config should be written");
        let config: BandConfig = load_config(&path).expect("config should load");
        assert_eq!(config.labels.as_deref().map(<[String]>::len), Some(3));
    }
}
