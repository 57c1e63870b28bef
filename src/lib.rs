//! Inelastic stress updates for small-strain solid mechanics.
//!
//! A [`StressUpdate`] takes a trial state at one integration point, returns it
//! to the admissible set and splits the strain increment into elastic and
//! inelastic parts. Two radial-return models are provided:
//! [`IsotropicPlasticity`] (J2 plasticity with linear and Voce hardening) and
//! [`PowerLawCreep`]. Per-point history lives outside the models in a
//! [`HistoryStorage`], so all points of a batch can be updated in parallel with
//! [`evaluate`].
pub mod elasticity;
pub mod error;
pub mod evaluate;
pub mod history;
pub mod interfaces;
pub mod isotropic_plasticity;
pub mod mandel;
pub mod models;
pub mod power_law_creep;
pub mod rank_four_tensor;
pub mod rank_two_tensor;
pub mod return_mapping;
pub mod settings;

pub use elasticity::{isotropic_elasticity, isotropic_elasticity_lame};
pub use error::{Error, Result};
pub use evaluate::{evaluate, evaluate_some};
pub use history::{HistoryLayout, HistoryStorage, QpHistory};
pub use interfaces::{QDim, ReturnMappingState, StressUpdate, UpdateOutcome, UpdateTransaction, Q};
pub use isotropic_plasticity::IsotropicPlasticity;
pub use models::{create_stress_update, ModelKind};
pub use power_law_creep::PowerLawCreep;
pub use rank_four_tensor::RankFourTensor;
pub use rank_two_tensor::RankTwoTensor;
pub use return_mapping::{RadialReturnModel, RadialReturnPoint, RadialReturnStressUpdate, ScalarReturnMapping};
pub use settings::ReturnMappingSettings;
