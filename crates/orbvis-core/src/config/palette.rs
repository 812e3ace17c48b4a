use super::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PRESET_PALETTES: [&[&str]; 10] = [
    &["#ff0000", "#008000", "#0000ff", "#ffa500", "#ffff00", "#add8e6"],
    &["#8ecae6", "#219ebc", "#023047", "#ffb703", "#fb8500"],
    &["#264653", "#2a9d8f", "#e9c46a", "#f4a261", "#e76f51"],
    &["#ff595e", "#ffca3a", "#8ac926", "#1982c4", "#6a4c93"],
    &["#2b2d42", "#8d99ae", "#edf2f4", "#ef233c", "#d90429"],
    &["#0b3954", "#087e8b", "#bfd7ea", "#ff5a5f", "#c81d25"],
    &["#220901", "#621708", "#941b0c", "#bc3908", "#f6aa1c"],
    &["#355070", "#6d597a", "#b56576", "#e56b6f", "#eaac8b"],
    &["#003049", "#d62828", "#f77f00", "#fcbf49", "#eae2b7"],
    &["#eae2b7", "#fe7f2d", "#fcca46", "#a1c181", "#619b8a"],
];

const NAMED_COLORS: [(&str, &str); 12] = [
    ("r", "#ff0000"),
    ("g", "#008000"),
    ("b", "#0000ff"),
    ("k", "#000000"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("blue", "#0000ff"),
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("orange", "#ffa500"),
    ("yellow", "#ffff00"),
    ("lightblue", "#add8e6"),
];

/// `COLOR_SCHEME`: a preset index or an explicit colour list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ColorScheme {
    Preset(usize),
    Explicit(Vec<String>),
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::Preset(0)
    }
}

/// Colours for the orbital groups of one plot, one per group, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    /// Builds exactly `count` colours. Short lists are padded with generated
    /// colours, long lists are truncated.
    pub fn resolve(scheme: &ColorScheme, count: usize) -> Result<Self, ConfigError> {
        let mut colors = match scheme {
            ColorScheme::Preset(index) => PRESET_PALETTES
                .get(*index)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "COLOR_SCHEME".to_string(),
                    message: format!(
                        "preset {index} does not exist, choose 0..{}",
                        PRESET_PALETTES.len() - 1
                    ),
                })?
                .iter()
                .map(|color| (*color).to_string())
                .collect::<Vec<_>>(),
            ColorScheme::Explicit(colors) => colors
                .iter()
                .map(|color| normalize_color(color))
                .collect::<Result<Vec<_>, _>>()?,
        };

        if colors.len() < count {
            let missing = count - colors.len();
            if matches!(scheme, ColorScheme::Explicit(_)) {
                warn!(
                    provided = colors.len(),
                    needed = count,
                    "too few colours in COLOR_SCHEME, generating the rest"
                );
            }
            colors.extend((0..missing).map(generated_color));
        } else if colors.len() > count {
            debug!(provided = colors.len(), needed = count, "truncating colour list");
            colors.truncate(count);
        }

        Ok(Self { colors })
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.colors.get(index).map(String::as_str)
    }
}

/// Lower-case `#rrggbb`. The leading `#` may be omitted and `#rgb` is
/// expanded; a few single-letter and plain names are accepted.
pub fn normalize_color(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some((_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowered) {
        return Ok((*hex).to_string());
    }

    let digits = lowered.strip_prefix('#').unwrap_or(&lowered);
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidColor {
            value: trimmed.to_string(),
        });
    }
    match digits.len() {
        6 => Ok(format!("#{digits}")),
        3 => Ok(digits.chars().fold(String::from("#"), |mut hex, ch| {
            hex.push(ch);
            hex.push(ch);
            hex
        })),
        _ => Err(ConfigError::InvalidColor {
            value: trimmed.to_string(),
        }),
    }
}

/// Evenly spread hues by golden-angle steps, fixed saturation and value.
fn generated_color(index: usize) -> String {
    const GOLDEN_ANGLE: f64 = 137.507_764;
    let hue = (index as f64 * GOLDEN_ANGLE + 15.0) % 360.0;
    let (red, green, blue) = hsv_to_rgb(hue, 0.65, 0.85);
    format!("#{red:02x}{green:02x}{blue:02x}")
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (u8, u8, u8) {
    let chroma = value * saturation;
    let sector = hue / 60.0;
    let secondary = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, secondary, 0.0),
        1 => (secondary, chroma, 0.0),
        2 => (0.0, chroma, secondary),
        3 => (0.0, secondary, chroma),
        4 => (secondary, 0.0, chroma),
        _ => (chroma, 0.0, secondary),
    };
    let offset = value - chroma;
    let channel = |component: f64| ((component + offset) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}
