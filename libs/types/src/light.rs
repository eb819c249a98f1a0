//! Light fixtures and light-control commands
//!
//! `LightState` is what observers render; `LightControlCommand` is the batch
//! command shape pushed by external automation (a smart-home bridge), which
//! addresses lights by name and uses a 0-100 brightness scale.

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::home::Vector3;
use crate::ids::LightId;

/// Internal intensity corresponding to 100% brightness.
pub const MAX_INTENSITY: f64 = 5.0;

/// Renderable state of a single light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(default)]
    pub on: bool,
    /// Hex color, `#rrggbb`.
    #[serde(default = "default_light_color")]
    pub color: String,
    /// Intensity in the renderer's scale, 0.0 to `MAX_INTENSITY`.
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_light_color() -> String {
    "#ffffff".to_string()
}

fn default_intensity() -> f64 {
    1.0
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            on: false,
            color: default_light_color(),
            intensity: default_intensity(),
        }
    }
}

/// A light fixture placed on a floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    #[serde(default)]
    pub id: LightId,
    pub name: String,
    pub position: Vector3,
    #[serde(default)]
    pub state: LightState,
}

impl Light {
    pub fn new(name: impl Into<String>, position: Vector3) -> Self {
        Self {
            id: LightId::generate(),
            name: name.into(),
            position,
            state: LightState::default(),
        }
    }

    /// The public view of this light carried in `lights_changed` events.
    pub fn summary(&self) -> LightSummary {
        LightSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }
}

/// Light identity plus state, without geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSummary {
    pub id: LightId,
    pub name: String,
    pub state: LightState,
}

/// Batch command addressing every light with a given name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightControlCommand {
    pub name: String,
    #[serde(default)]
    pub on: Option<bool>,
    /// Brightness percentage, 0 to 100. Out-of-range values are clamped.
    #[serde(default)]
    pub brightness: Option<f64>,
    /// RGB triple. Anything other than exactly three components is ignored.
    #[serde(default)]
    pub color: Option<Vec<u8>>,
}

impl LightControlCommand {
    pub fn matches(&self, light: &Light) -> bool {
        light.name == self.name
    }

    /// Apply the fields present in this command to a light state.
    pub fn apply(&self, state: &mut LightState) {
        if let Some(on) = self.on {
            state.on = on;
        }

        if let Some(brightness) = self.brightness {
            state.intensity = brightness_to_intensity(brightness);
        }

        if let Some([r, g, b]) = self.color.as_deref().and_then(|c| <[u8; 3]>::try_from(c).ok()) {
            state.color = rgb_to_hex(r, g, b);
        }
    }
}

/// Map a 0-100 brightness percentage onto the renderer's intensity scale.
pub fn brightness_to_intensity(brightness: f64) -> f64 {
    let clamped = brightness.clamp(0.0, 100.0);
    (clamped / 100.0) * MAX_INTENSITY
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Validate a `#rrggbb` color string.
pub fn validate_hex_color(color: &str) -> Result<(), ModelError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidColor {
            color: color.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn origin() -> Vector3 {
        Vector3::new(0.0, 0.0, 0.0)
    }

    #[test]
    fn test_light_state_defaults_from_empty_json() {
        let state: LightState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, LightState::default());
        assert!(!state.on);
        assert_eq!(state.color, "#ffffff");
    }

    #[test]
    fn test_command_applies_only_present_fields() {
        let mut state = LightState::default();
        let cmd = LightControlCommand {
            name: "Kitchen".to_string(),
            on: Some(true),
            brightness: None,
            color: None,
        };
        cmd.apply(&mut state);

        assert!(state.on);
        assert_eq!(state.intensity, 1.0);
        assert_eq!(state.color, "#ffffff");
    }

    #[test]
    fn test_brightness_mapping() {
        assert_eq!(brightness_to_intensity(100.0), 5.0);
        assert_eq!(brightness_to_intensity(50.0), 2.5);
        assert_eq!(brightness_to_intensity(0.0), 0.0);
        assert_eq!(brightness_to_intensity(250.0), 5.0);
        assert_eq!(brightness_to_intensity(-10.0), 0.0);
    }

    #[test]
    fn test_color_command() {
        let mut state = LightState::default();
        let cmd = LightControlCommand {
            name: "Kitchen".to_string(),
            on: None,
            brightness: None,
            color: Some(vec![255, 0, 16]),
        };
        cmd.apply(&mut state);
        assert_eq!(state.color, "#ff0010");
    }

    #[test]
    fn test_malformed_color_is_ignored() {
        let mut state = LightState::default();
        let cmd = LightControlCommand {
            name: "Kitchen".to_string(),
            on: None,
            brightness: None,
            color: Some(vec![255, 0]),
        };
        cmd.apply(&mut state);
        assert_eq!(state.color, "#ffffff");
    }

    #[test]
    fn test_command_matches_by_name() {
        let light = Light::new("Hall", origin());
        let cmd: LightControlCommand = serde_json::from_str(r#"{"name":"Hall"}"#).unwrap();
        assert!(cmd.matches(&light));
    }

    #[test]
    fn test_summary_drops_geometry() {
        let light = Light::new("Hall", origin());
        let json = serde_json::to_value(light.summary()).unwrap();
        assert!(json.get("position").is_none());
        assert_eq!(json["name"], "Hall");
    }

    #[test]
    fn test_validate_hex_color() {
        assert!(validate_hex_color("#222222").is_ok());
        assert!(validate_hex_color("#A1b2C3").is_ok());
        assert!(validate_hex_color("222222").is_err());
        assert!(validate_hex_color("#22222g").is_err());
        assert!(validate_hex_color("#2222").is_err());
    }

    proptest! {
        #[test]
        fn prop_intensity_always_in_range(brightness in -1000.0f64..1000.0) {
            let intensity = brightness_to_intensity(brightness);
            prop_assert!((0.0..=MAX_INTENSITY).contains(&intensity));
        }

        #[test]
        fn prop_rgb_hex_is_valid_color(r: u8, g: u8, b: u8) {
            prop_assert!(validate_hex_color(&rgb_to_hex(r, g, b)).is_ok());
        }
    }
}
