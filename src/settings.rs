use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Controls the local Newton iteration of a return mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReturnMappingSettings {
    /// Converged when |r| < relative_tolerance * |r_ref|.
    pub relative_tolerance: f64,
    /// Converged when |r| < absolute_tolerance.
    pub absolute_tolerance: f64,
    /// Newton steps allowed before giving up.
    pub max_iterations: usize,
    /// After `max_iterations`, a residual within this multiple of the
    /// tolerances is still accepted. The default of 1 accepts nothing beyond
    /// the regular tolerances.
    pub acceptable_multiplier: f64,
    /// Halve Newton steps while they increase the residual.
    pub line_search: bool,
    /// Number of halvings per Newton step.
    pub max_line_search_steps: usize,
    /// Largest effective inelastic increment per step used for the time step limit.
    pub max_inelastic_increment: f64,
}

impl Default for ReturnMappingSettings {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-8,
            absolute_tolerance: 1e-11,
            max_iterations: 30,
            acceptable_multiplier: 1.0,
            line_search: true,
            max_line_search_steps: 10,
            max_inelastic_increment: 1e-4,
        }
    }
}

impl ReturnMappingSettings {
    /// Reads settings from a parameter map, keeping the defaults for missing keys.
    ///
    /// Recognized keys: `relative_tolerance` (alias `tolerance`),
    /// `absolute_tolerance`, `max_iterations`, `acceptable_multiplier`,
    /// `line_search` (non-zero enables it), `max_line_search_steps` and
    /// `max_inelastic_increment`.
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(v) = parameters.get("tolerance") {
            settings.relative_tolerance = *v;
        }
        if let Some(v) = parameters.get("relative_tolerance") {
            settings.relative_tolerance = *v;
        }
        if let Some(v) = parameters.get("absolute_tolerance") {
            settings.absolute_tolerance = *v;
        }
        if let Some(v) = parameters.get("max_iterations") {
            settings.max_iterations = count("max_iterations", *v)?;
        }
        if let Some(v) = parameters.get("acceptable_multiplier") {
            settings.acceptable_multiplier = *v;
        }
        if let Some(v) = parameters.get("line_search") {
            settings.line_search = *v != 0.0;
        }
        if let Some(v) = parameters.get("max_line_search_steps") {
            settings.max_line_search_steps = count("max_line_search_steps", *v)?;
        }
        if let Some(v) = parameters.get("max_inelastic_increment") {
            settings.max_inelastic_increment = *v;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.relative_tolerance > 0.0) || !self.relative_tolerance.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "relative_tolerance must be positive, got {}",
                self.relative_tolerance
            )));
        }
        if !(self.absolute_tolerance > 0.0) || !self.absolute_tolerance.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "absolute_tolerance must be positive, got {}",
                self.absolute_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter("max_iterations must be positive".to_string()));
        }
        if !(self.acceptable_multiplier >= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "acceptable_multiplier must be at least 1, got {}",
                self.acceptable_multiplier
            )));
        }
        if !(self.max_inelastic_increment > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "max_inelastic_increment must be positive, got {}",
                self.max_inelastic_increment
            )));
        }
        Ok(())
    }
}

fn count(name: &str, value: f64) -> Result<usize> {
    if value.fract() != 0.0 || value < 0.0 || !value.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "{name} must be a non-negative integer, got {value}"
        )));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ReturnMappingSettings::default().validate().is_ok());
    }

    #[test]
    fn parameters_override_defaults() {
        let parameters = HashMap::from([
            ("tolerance".to_string(), 1e-6),
            ("max_iterations".to_string(), 5.0),
            ("line_search".to_string(), 0.0),
        ]);
        let settings = ReturnMappingSettings::from_parameters(&parameters).unwrap();
        assert_eq!(settings.relative_tolerance, 1e-6);
        assert_eq!(settings.max_iterations, 5);
        assert!(!settings.line_search);
        assert_eq!(settings.absolute_tolerance, 1e-11);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("tolerance", 0.0),
            ("tolerance", -1.0),
            ("absolute_tolerance", f64::NAN),
            ("max_iterations", 0.0),
            ("max_iterations", 2.5),
            ("acceptable_multiplier", 0.5),
        ] {
            let parameters = HashMap::from([(key.to_string(), value)]);
            assert!(
                matches!(
                    ReturnMappingSettings::from_parameters(&parameters),
                    Err(Error::InvalidParameter(_))
                ),
                "{key} = {value} should be rejected"
            );
        }
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: ReturnMappingSettings =
            serde_json::from_str(r#"{ "relative_tolerance": 1e-10, "max_iterations": 50 }"#).unwrap();
        assert_eq!(settings.relative_tolerance, 1e-10);
        assert_eq!(settings.max_iterations, 50);
        assert_eq!(settings.acceptable_multiplier, 1.0);
        assert!(serde_json::from_str::<ReturnMappingSettings>(r#"{ "tol": 1.0 }"#).is_err());
    }
}
