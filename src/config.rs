use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// KML colors are aabbggrr hex strings.
pub const COLOR_RED: &str = "ff0000ff";
pub const COLOR_WHITE: &str = "ffffffff";

/// Styling applied uniformly to every feature of a run. There are no
/// per-feature overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Color for lines and polygon outlines.
    pub line_color: String,
    pub line_width: f64,
    /// Whether polygons are filled. The fill color below only takes effect
    /// when this is set.
    pub poly_fill: bool,
    pub poly_color: Option<String>,
    pub label_color: String,
    pub label_scale: f64,
    /// Scale of point icons. 0 hides them.
    pub point_icon_scale: f64,
    pub point_icon_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            line_color: COLOR_RED.to_string(),
            line_width: 1.5,
            poly_fill: false,
            poly_color: None,
            label_color: COLOR_WHITE.to_string(),
            label_scale: 1.0,
            point_icon_scale: 1.0,
            point_icon_color: COLOR_RED.to_string(),
        }
    }
}

impl StyleConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read style file: {:?}", path))?;
        let config: StyleConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML style configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let style = StyleConfig::default();
        assert_eq!(style.line_color, COLOR_RED);
        assert_eq!(style.line_width, 1.5);
        assert!(!style.poly_fill);
        assert_eq!(style.poly_color, None);
        assert_eq!(style.label_color, COLOR_WHITE);
        assert_eq!(style.label_scale, 1.0);
        assert_eq!(style.point_icon_scale, 1.0);
        assert_eq!(style.point_icon_color, COLOR_RED);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let style: StyleConfig =
            toml::from_str("line_width = 3.0\npoly_fill = true\n").unwrap();
        assert_eq!(style.line_width, 3.0);
        assert!(style.poly_fill);
        assert_eq!(style.line_color, COLOR_RED);
        assert_eq!(style.label_scale, 1.0);
    }
}
