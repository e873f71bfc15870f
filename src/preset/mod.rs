//! Terrain presets loaded from JSON
//!
//! A preset bundles an equation set, a start position and optional
//! environment overrides:
//!
//! ```json
//! { "presets": [ {
//!     "name": "Rolling hills",
//!     "equations": [ { "formula": "sin(x*0.1)*cos(y*0.1)*8", "color": "#4a7c3a" } ],
//!     "startPosition": [0, 0, 20],
//!     "environment": { "fogDensity": 0.004, "skyColorTop": "#3366cc" }
//! } ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::core::{Error, Result};
use crate::terrain::equation::EquationSpec;

fn default_start_position() -> [f32; 3] {
    [0.0, 0.0, 5.0]
}

/// Partial environment overrides; absent fields keep the renderer's values
///
/// Colors are `#rrggbb` strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky_color_top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky_color_horizon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sun_intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog_density: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fog_start: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_pause: Option<bool>,
}

/// One named terrain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub equations: Vec<EquationSpec>,
    #[serde(default = "default_start_position")]
    pub start_position: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentSettings>,
}

impl Preset {
    pub fn start(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }
}

/// Read-only list of presets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetLibrary {
    pub presets: Vec<Preset>,
}

impl PresetLibrary {
    pub fn from_json(json: &str) -> Result<Self> {
        let library: Self = serde_json::from_str(json)?;
        for preset in &library.presets {
            if preset.name.trim().is_empty() {
                return Err(Error::Preset("preset with an empty name".into()));
            }
        }
        Ok(library)
    }

    /// Load a library from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Preset(format!("cannot read {}: {e}", path.display())))?;
        let library = Self::from_json(&json)?;
        log::info!("Loaded {} presets from {}", library.presets.len(), path.display());
        Ok(library)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Find a preset by name, ignoring ASCII case
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::equation::DEFAULT_EQUATION_COLOR;

    const SAMPLE: &str = r##"{
        "presets": [
            {
                "name": "Waves",
                "description": "Gentle sine waves",
                "equations": [
                    { "formula": "sin(x*0.2)*3", "color": "#2266aa" },
                    { "formula": "cos(y*0.2)*3" }
                ],
                "startPosition": [10, -5, 30],
                "environment": { "fogDensity": 0.01, "skyColorTop": "#112233", "timePause": true }
            },
            { "name": "Flat", "equations": [ { "formula": "0" } ] }
        ]
    }"##;

    #[test]
    fn test_parse_library() {
        let library = PresetLibrary::from_json(SAMPLE).unwrap();
        assert_eq!(library.len(), 2);

        let waves = library.get("waves").unwrap();
        assert_eq!(waves.equations.len(), 2);
        assert_eq!(waves.equations[0].color, "#2266aa");
        assert_eq!(waves.equations[1].color, DEFAULT_EQUATION_COLOR);
        assert_eq!(waves.start(), Vec3::new(10.0, -5.0, 30.0));

        let env = waves.environment.as_ref().unwrap();
        assert_eq!(env.fog_density, Some(0.01));
        assert_eq!(env.sky_color_top.as_deref(), Some("#112233"));
        assert_eq!(env.time_pause, Some(true));
        assert_eq!(env.gamma, None);

        let flat = library.get("Flat").unwrap();
        assert_eq!(flat.start_position, [0.0, 0.0, 5.0]);
        assert!(flat.environment.is_none());
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["Waves", "Flat"]);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(PresetLibrary::from_json("{ not json"), Err(Error::Json(_))));
        assert!(matches!(
            PresetLibrary::from_json(r#"{ "presets": [ { "name": " " } ] }"#),
            Err(Error::Preset(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let library = PresetLibrary::from_json(SAMPLE).unwrap();
        library.save(&path).unwrap();
        let loaded = PresetLibrary::load(&path).unwrap();
        assert_eq!(loaded, library);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PresetLibrary::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Preset(_))));
    }
}
