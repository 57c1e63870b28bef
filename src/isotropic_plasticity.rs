use crate::error::{Error, Result};
use crate::interfaces::Q;
use crate::models::{ModelKind, Parameters};
use crate::return_mapping::{RadialReturnModel, RadialReturnPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// von Mises plasticity with isotropic hardening.
///
/// The flow stress depends on the equivalent plastic strain p as
///
/// ```text
/// σ_f(p) = σ_y + H p + Q (1 - exp(-b p))
/// ```
///
/// i.e. linear hardening with an optional Voce saturation term. The yield
/// condition is `q - σ_f(p) <= 0` with q the von Mises stress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsotropicPlasticity {
    /// Initial yield stress σ_y
    pub yield_stress: f64,
    /// Linear hardening modulus H
    #[serde(default)]
    pub hardening_modulus: f64,
    /// Voce saturation stress Q
    #[serde(default)]
    pub saturation_stress: f64,
    /// Voce saturation rate b
    #[serde(default)]
    pub saturation_rate: f64,
}

impl IsotropicPlasticity {
    /// Perfect plasticity with linear hardening modulus `hardening_modulus`.
    pub fn linear(yield_stress: f64, hardening_modulus: f64) -> Result<Self> {
        let model = Self {
            yield_stress,
            hardening_modulus,
            saturation_stress: 0.0,
            saturation_rate: 0.0,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn new(parameters: &HashMap<String, f64>) -> Result<Self> {
        let parameters = Parameters(parameters);
        let model = Self {
            yield_stress: parameters.required("yield_stress")?,
            hardening_modulus: parameters.optional("hardening_modulus", 0.0),
            saturation_stress: parameters.optional("saturation_stress", 0.0),
            saturation_rate: parameters.optional("saturation_rate", 0.0),
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.yield_stress > 0.0) || !self.yield_stress.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "yield_stress must be positive, got {}",
                self.yield_stress
            )));
        }
        for (name, value) in [
            ("hardening_modulus", self.hardening_modulus),
            ("saturation_stress", self.saturation_stress),
            ("saturation_rate", self.saturation_rate),
        ] {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// σ_f(p)
    pub fn flow_stress(&self, p: f64) -> f64 {
        self.yield_stress
            + self.hardening_modulus * p
            + self.saturation_stress * (1.0 - (-self.saturation_rate * p).exp())
    }

    /// dσ_f/dp
    pub fn hardening_slope(&self, p: f64) -> f64 {
        self.hardening_modulus
            + self.saturation_stress * self.saturation_rate * (-self.saturation_rate * p).exp()
    }
}

impl RadialReturnModel for IsotropicPlasticity {
    fn kind(&self) -> ModelKind {
        ModelKind::IsotropicPlasticity
    }

    fn scalar_quantity(&self) -> Q {
        Q::EquivalentPlasticStrain
    }

    fn tensor_quantity(&self) -> Q {
        Q::PlasticStrain
    }

    fn residual(&self, point: &RadialReturnPoint, delta_p: f64) -> f64 {
        let three_g = point.three_shear_modulus;
        (point.effective_trial_stress - three_g * delta_p - self.flow_stress(point.scalar_old + delta_p)) / three_g
    }

    fn derivative(&self, point: &RadialReturnPoint, delta_p: f64) -> f64 {
        -1.0 - self.hardening_slope(point.scalar_old + delta_p) / point.three_shear_modulus
    }

    fn trial_derivative(&self, point: &RadialReturnPoint, _delta_p: f64) -> f64 {
        1.0 / point.three_shear_modulus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_reads_parameters() {
        let parameters = HashMap::from([
            ("yield_stress".to_string(), 250e6),
            ("hardening_modulus".to_string(), 1e9),
        ]);
        let model = IsotropicPlasticity::new(&parameters).unwrap();
        assert_eq!(model.yield_stress, 250e6);
        assert_eq!(model.hardening_modulus, 1e9);
        assert_eq!(model.saturation_stress, 0.0);
    }

    #[test]
    fn missing_or_negative_parameters_are_rejected() {
        assert!(matches!(
            IsotropicPlasticity::new(&HashMap::new()),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            IsotropicPlasticity::linear(250e6, -1.0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            IsotropicPlasticity::linear(0.0, 0.0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn flow_stress_saturates() {
        let model = IsotropicPlasticity {
            yield_stress: 100.0,
            hardening_modulus: 0.0,
            saturation_stress: 50.0,
            saturation_rate: 20.0,
        };
        assert_eq!(model.flow_stress(0.0), 100.0);
        assert_relative_eq!(model.flow_stress(10.0), 150.0, max_relative = 1e-12);
        assert_relative_eq!(model.hardening_slope(0.0), 1000.0);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let model = IsotropicPlasticity {
            yield_stress: 100.0,
            hardening_modulus: 300.0,
            saturation_stress: 50.0,
            saturation_rate: 20.0,
        };
        let point = RadialReturnPoint {
            effective_trial_stress: 400.0,
            three_shear_modulus: 3000.0,
            scalar_old: 0.01,
            dt: 0.0,
        };
        let h = 1e-7;
        let x = 0.02;
        let numerical = (model.residual(&point, x + h) - model.residual(&point, x - h)) / (2.0 * h);
        assert_relative_eq!(model.derivative(&point, x), numerical, max_relative = 1e-6);
    }

    #[test]
    fn parameters_deserialize() {
        let model: IsotropicPlasticity = serde_json::from_str(r#"{ "yield_stress": 250e6 }"#).unwrap();
        assert_eq!(model, IsotropicPlasticity::linear(250e6, 0.0).unwrap());
    }
}
