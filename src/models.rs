use crate::error::{Error, Result};
use crate::interfaces::StressUpdate;
use crate::isotropic_plasticity::IsotropicPlasticity;
use crate::power_law_creep::PowerLawCreep;
use crate::return_mapping::RadialReturnStressUpdate;
use crate::settings::ReturnMappingSettings;
use std::collections::HashMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    IsotropicPlasticity,
    PowerLawCreep,
}

/// Typed access to a `name -> value` parameter map.
pub(crate) struct Parameters<'a>(pub &'a HashMap<String, f64>);

impl Parameters<'_> {
    pub fn required(&self, name: &str) -> Result<f64> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidParameter(format!("missing parameter {name}")))
    }

    pub fn optional(&self, name: &str, default: f64) -> f64 {
        self.0.get(name).copied().unwrap_or(default)
    }
}

/// Builds a model from its parameters. Return-mapping settings are read from
/// the same map (see [`ReturnMappingSettings::from_parameters`]).
pub fn create_stress_update(
    kind: ModelKind,
    parameters: &HashMap<String, f64>,
) -> Result<Box<dyn StressUpdate>> {
    let settings = ReturnMappingSettings::from_parameters(parameters)?;
    let model: Box<dyn StressUpdate> = match kind {
        ModelKind::IsotropicPlasticity => Box::new(RadialReturnStressUpdate::new(
            IsotropicPlasticity::new(parameters)?,
            settings,
        )?),
        ModelKind::PowerLawCreep => Box::new(RadialReturnStressUpdate::new(
            PowerLawCreep::new(parameters)?,
            settings,
        )?),
    };
    Ok(model)
}
