use crate::error::{Error, Result};
use crate::history::QpHistory;
use crate::models::ModelKind;
use crate::rank_four_tensor::RankFourTensor;
use crate::rank_two_tensor::RankTwoTensor;
use std::collections::HashMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Relative tolerance of the symmetry and rotation checks on entry.
const INPUT_TOLERANCE: f64 = 1e-8;

/// Quantities a model keeps as history at every integration point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Q {
    EquivalentPlasticStrain,
    PlasticStrain,
    EquivalentCreepStrain,
    CreepStrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QDim {
    Scalar,
    SquareTensor(usize),
}

impl QDim {
    pub const fn size(&self) -> usize {
        match self {
            QDim::Scalar => 1,
            QDim::SquareTensor(n) => *n * *n,
        }
    }
}

impl Q {
    pub const fn q_dim(&self) -> QDim {
        match self {
            Q::EquivalentPlasticStrain | Q::EquivalentCreepStrain => QDim::Scalar,
            Q::PlasticStrain | Q::CreepStrain => QDim::SquareTensor(3),
        }
    }
    pub const fn size(&self) -> usize {
        self.q_dim().size()
    }
}

/// Phases of a single return-mapping call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReturnMappingState {
    Trial,
    Iterating,
    Converged,
    Diverged,
}

/// Everything exchanged with a model in one update.
///
/// `strain_increment` and `stress_new` are overwritten in place: on return they
/// hold the elastic part of the increment and the admissible stress.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTransaction {
    /// In: total trial strain increment. Out: elastic strain increment.
    pub strain_increment: RankTwoTensor,
    pub inelastic_strain_increment: RankTwoTensor,
    /// Finite-strain rotation increment, identity for small strain.
    pub rotation_increment: RankTwoTensor,
    /// In: trial stress. Out: admissible stress.
    pub stress_new: RankTwoTensor,
    pub stress_old: RankTwoTensor,
    pub elasticity_tensor: RankFourTensor,
    pub elastic_strain_old: RankTwoTensor,
    pub compute_full_tangent_operator: bool,
    pub tangent_operator: RankFourTensor,
    /// Time increment of the step.
    pub dt: f64,
}

impl UpdateTransaction {
    /// Sets up a transaction whose trial stress applies the whole strain
    /// increment elastically: `σ_trial = σ_old + C : Δε`.
    pub fn trial(
        stress_old: RankTwoTensor,
        elastic_strain_old: RankTwoTensor,
        strain_increment: RankTwoTensor,
        elasticity_tensor: RankFourTensor,
    ) -> Self {
        Self {
            strain_increment,
            inelastic_strain_increment: RankTwoTensor::zeros(),
            rotation_increment: RankTwoTensor::identity(),
            stress_new: stress_old + elasticity_tensor * strain_increment,
            stress_old,
            elasticity_tensor,
            elastic_strain_old,
            compute_full_tangent_operator: true,
            tangent_operator: elasticity_tensor,
            dt: 0.0,
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_rotation(mut self, rotation_increment: RankTwoTensor) -> Self {
        self.rotation_increment = rotation_increment;
        self
    }

    pub fn with_full_tangent(mut self, compute_full_tangent_operator: bool) -> Self {
        self.compute_full_tangent_operator = compute_full_tangent_operator;
        self
    }

    /// Checks the preconditions of an update.
    pub fn check_admissible(&self) -> Result<()> {
        let tensors = [
            ("strain increment", &self.strain_increment),
            ("rotation increment", &self.rotation_increment),
            ("trial stress", &self.stress_new),
            ("old stress", &self.stress_old),
            ("old elastic strain", &self.elastic_strain_old),
        ];
        for (name, tensor) in tensors {
            if !tensor.is_finite() {
                return Err(Error::InadmissibleInput(format!("{name} is not finite")));
            }
        }
        for (name, tensor) in [
            ("strain increment", &self.strain_increment),
            ("trial stress", &self.stress_new),
            ("old stress", &self.stress_old),
        ] {
            if !tensor.is_symmetric(INPUT_TOLERANCE) {
                return Err(Error::InadmissibleInput(format!("{name} is not symmetric")));
            }
        }
        if !self.dt.is_finite() || self.dt < 0.0 {
            return Err(Error::InadmissibleInput(format!("time increment {} is invalid", self.dt)));
        }
        if !self.rotation_increment.is_rotation(INPUT_TOLERANCE) {
            return Err(Error::InadmissibleInput(
                "rotation increment is not a proper rotation".to_string(),
            ));
        }
        if !self.elasticity_tensor.is_finite() || !self.elasticity_tensor.is_minor_symmetric(INPUT_TOLERANCE) {
            return Err(Error::InadmissibleInput(
                "elasticity tensor lacks minor symmetry".to_string(),
            ));
        }
        if !self.elasticity_tensor.is_positive_definite() {
            return Err(Error::InadmissibleInput(
                "elasticity tensor is not positive definite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOutcome {
    pub state: ReturnMappingState,
    pub iterations: usize,
    /// Scalar inelastic increment Δp found by the return mapping.
    pub effective_inelastic_strain_increment: f64,
    /// Largest time increment keeping Δp below the model's increment limit.
    pub time_step_limit: f64,
}

impl UpdateOutcome {
    pub fn elastic() -> Self {
        Self {
            state: ReturnMappingState::Converged,
            iterations: 0,
            effective_inelastic_strain_increment: 0.0,
            time_step_limit: f64::INFINITY,
        }
    }

    pub fn is_elastic(&self) -> bool {
        self.effective_inelastic_strain_increment == 0.0
    }
}

/// An inelastic material model updated one integration point at a time.
///
/// Implementations produce an admissible stress from a trial state, split the
/// strain increment into elastic and inelastic parts and supply a tangent
/// operator. Models hold no per-point state of their own; the history of point
/// `qp` is passed in, which makes concurrent updates of distinct points safe.
pub trait StressUpdate: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Returns the history quantities required at every integration point
    /// together with their dimensions.
    fn define_history(&self) -> HashMap<Q, QDim>;

    /// Performs the return mapping for integration point `qp`.
    ///
    /// On success `strain_increment + inelastic_strain_increment` equals the
    /// incoming strain increment, `stress_new` is admissible and the new history
    /// of the point has been written. On failure the committed history is left
    /// as it was.
    fn update_state(
        &self,
        qp: usize,
        history: &mut QpHistory,
        transaction: &mut UpdateTransaction,
    ) -> Result<UpdateOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elasticity::isotropic_elasticity;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn transaction() -> UpdateTransaction {
        UpdateTransaction::trial(
            RankTwoTensor::zeros(),
            RankTwoTensor::zeros(),
            RankTwoTensor::symmetric([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]),
            isotropic_elasticity(200e9, 0.3),
        )
    }

    #[test]
    fn quantity_names_round_trip() {
        for q in Q::iter() {
            assert_eq!(Q::from_str(q.as_ref()).unwrap(), q);
        }
        assert_eq!(Q::PlasticStrain.to_string(), "plastic_strain");
        assert_eq!(Q::PlasticStrain.size(), 9);
        assert_eq!(Q::EquivalentCreepStrain.size(), 1);
    }

    #[test]
    fn sizes_are_known_at_compile_time() {
        const TENSOR: usize = QDim::SquareTensor(3).size();
        const PLASTIC: usize = Q::PlasticStrain.size();
        assert_eq!(TENSOR, 9);
        assert_eq!(PLASTIC, 9);
        assert_eq!(QDim::SquareTensor(2).size(), 4);
    }

    #[test]
    fn trial_applies_increment_elastically() {
        let t = transaction();
        assert_eq!(t.stress_new, t.elasticity_tensor * t.strain_increment);
        assert_eq!(t.rotation_increment, RankTwoTensor::identity());
        assert!(t.check_admissible().is_ok());
    }

    #[test]
    fn inadmissible_inputs_are_rejected() {
        let mut t = transaction();
        t.elasticity_tensor = RankFourTensor::isotropic(1.0, -1.0);
        assert!(matches!(t.check_admissible(), Err(Error::InadmissibleInput(_))));

        let mut t = transaction();
        t.rotation_increment = RankTwoTensor::identity() * 2.0;
        assert!(matches!(t.check_admissible(), Err(Error::InadmissibleInput(_))));

        let mut t = transaction();
        t.stress_new[(0, 1)] = f64::NAN;
        assert!(matches!(t.check_admissible(), Err(Error::InadmissibleInput(_))));

        let t = transaction().with_dt(-1.0);
        assert!(matches!(t.check_admissible(), Err(Error::InadmissibleInput(_))));

        let mut t = transaction();
        t.strain_increment[(0, 1)] = 1e-3;
        assert!(matches!(t.check_admissible(), Err(Error::InadmissibleInput(_))));
    }
}
