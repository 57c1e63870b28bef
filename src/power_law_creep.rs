use crate::error::{Error, Result};
use crate::interfaces::Q;
use crate::models::{ModelKind, Parameters};
use crate::return_mapping::{RadialReturnModel, RadialReturnPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_gas_constant() -> f64 {
    8.3143
}

/// Isothermal power-law creep
///
/// ```text
/// dp/dt = A q^n exp(-Q / (R T))
/// ```
///
/// integrated with backward Euler over the step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawCreep {
    pub coefficient: f64,
    pub exponent: f64,
    #[serde(default)]
    pub activation_energy: f64,
    #[serde(default = "default_gas_constant")]
    pub gas_constant: f64,
    pub temperature: f64,
}

impl PowerLawCreep {
    pub fn new(parameters: &HashMap<String, f64>) -> Result<Self> {
        let parameters = Parameters(parameters);
        let model = Self {
            coefficient: parameters.required("coefficient")?,
            exponent: parameters.required("exponent")?,
            activation_energy: parameters.optional("activation_energy", 0.0),
            gas_constant: parameters.optional("gas_constant", default_gas_constant()),
            temperature: parameters.required("temperature")?,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("coefficient", self.coefficient, self.coefficient > 0.0),
            ("exponent", self.exponent, self.exponent >= 1.0),
            ("activation_energy", self.activation_energy, self.activation_energy >= 0.0),
            ("gas_constant", self.gas_constant, self.gas_constant > 0.0),
            ("temperature", self.temperature, self.temperature > 0.0),
        ];
        for (name, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(Error::InvalidParameter(format!("{name} is out of range: {value}")));
            }
        }
        Ok(())
    }

    /// A exp(-Q / (R T))
    pub fn rate_factor(&self) -> f64 {
        self.coefficient * (-self.activation_energy / (self.gas_constant * self.temperature)).exp()
    }

    fn stress(point: &RadialReturnPoint, delta_p: f64) -> f64 {
        (point.effective_trial_stress - point.three_shear_modulus * delta_p).max(0.0)
    }
}

impl RadialReturnModel for PowerLawCreep {
    fn kind(&self) -> ModelKind {
        ModelKind::PowerLawCreep
    }

    fn scalar_quantity(&self) -> Q {
        Q::EquivalentCreepStrain
    }

    fn tensor_quantity(&self) -> Q {
        Q::CreepStrain
    }

    fn residual(&self, point: &RadialReturnPoint, delta_p: f64) -> f64 {
        self.rate_factor() * Self::stress(point, delta_p).powf(self.exponent) * point.dt - delta_p
    }

    fn derivative(&self, point: &RadialReturnPoint, delta_p: f64) -> f64 {
        let slope = self.exponent
            * self.rate_factor()
            * Self::stress(point, delta_p).powf(self.exponent - 1.0)
            * point.dt;
        -point.three_shear_modulus * slope - 1.0
    }

    fn trial_derivative(&self, point: &RadialReturnPoint, delta_p: f64) -> f64 {
        self.exponent * self.rate_factor() * Self::stress(point, delta_p).powf(self.exponent - 1.0) * point.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> PowerLawCreep {
        PowerLawCreep {
            coefficient: 1e-15,
            exponent: 4.0,
            activation_energy: 3e5,
            gas_constant: 8.3143,
            temperature: 1000.0,
        }
    }

    #[test]
    fn new_uses_default_gas_constant() {
        let parameters = HashMap::from([
            ("coefficient".to_string(), 1e-15),
            ("exponent".to_string(), 4.0),
            ("temperature".to_string(), 1000.0),
        ]);
        let model = PowerLawCreep::new(&parameters).unwrap();
        assert_eq!(model.gas_constant, 8.3143);
        assert_eq!(model.activation_energy, 0.0);
        assert_eq!(model.rate_factor(), 1e-15);
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        for (key, value) in [("exponent", 0.5), ("temperature", 0.0), ("coefficient", -1.0)] {
            let mut parameters = HashMap::from([
                ("coefficient".to_string(), 1e-15),
                ("exponent".to_string(), 4.0),
                ("temperature".to_string(), 1000.0),
            ]);
            parameters.insert(key.to_string(), value);
            assert!(matches!(PowerLawCreep::new(&parameters), Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn zero_time_increment_gives_no_creep() {
        let point = RadialReturnPoint {
            effective_trial_stress: 100e6,
            three_shear_modulus: 3.0 * 80e9,
            scalar_old: 0.0,
            dt: 0.0,
        };
        assert_eq!(model().residual(&point, 0.0), 0.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let model = model();
        let point = RadialReturnPoint {
            effective_trial_stress: 100e6,
            three_shear_modulus: 3.0 * 80e9,
            scalar_old: 0.0,
            dt: 1e3,
        };
        let x = 1e-5;
        let h = 1e-10;
        let numerical = (model.residual(&point, x + h) - model.residual(&point, x - h)) / (2.0 * h);
        assert_relative_eq!(model.derivative(&point, x), numerical, max_relative = 1e-5);

        let dq = 1e2;
        let shifted = |q: f64| RadialReturnPoint {
            effective_trial_stress: q,
            ..point
        };
        let numerical = (model.residual(&shifted(100e6 + dq), x) - model.residual(&shifted(100e6 - dq), x)) / (2.0 * dq);
        assert_relative_eq!(model.trial_derivative(&point, x), numerical, max_relative = 1e-5);
    }
}
