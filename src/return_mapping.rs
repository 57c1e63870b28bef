//! Radial return mapping for isotropic inelastic models.
//!
//! The trial stress is projected back along its deviatoric direction. The
//! magnitude of the return, the effective inelastic strain increment Δp, solves
//! a scalar equation r(Δp) = 0 supplied by the model. This is done with a
//! Newton iteration that keeps a bracket around the root, bisects when a step
//! leaves it and halves steps that increase the residual.
use crate::elasticity::{bulk_modulus, is_isotropic, shear_modulus};
use crate::error::{Error, Result};
use crate::history::QpHistory;
use crate::interfaces::{QDim, ReturnMappingState, StressUpdate, UpdateOutcome, UpdateTransaction, Q};
use crate::models::ModelKind;
use crate::rank_four_tensor::RankFourTensor;
use crate::rank_two_tensor::RankTwoTensor;
use crate::settings::ReturnMappingSettings;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Relative tolerance of the isotropy check on the elasticity tensor.
const ISOTROPY_TOLERANCE: f64 = 1e-8;

/// Per-call constants of a radial return at one integration point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialReturnPoint {
    /// Von Mises stress of the trial state, q_tr.
    pub effective_trial_stress: f64,
    /// 3G
    pub three_shear_modulus: f64,
    /// Committed value of the scalar history quantity.
    pub scalar_old: f64,
    pub dt: f64,
}

/// The scalar equation of a radial-return model.
///
/// The residual must decrease with Δp and is expected to be positive at Δp = 0
/// whenever an inelastic increment is required.
pub trait RadialReturnModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Accumulated scalar history (for instance the equivalent plastic strain).
    fn scalar_quantity(&self) -> Q;

    /// Accumulated inelastic strain tensor.
    fn tensor_quantity(&self) -> Q;

    /// r(Δp)
    fn residual(&self, point: &RadialReturnPoint, delta_p: f64) -> f64;

    /// ∂r/∂Δp
    fn derivative(&self, point: &RadialReturnPoint, delta_p: f64) -> f64;

    /// ∂r/∂q_tr, used by the consistent tangent.
    fn trial_derivative(&self, point: &RadialReturnPoint, delta_p: f64) -> f64;

    /// Scale of the residual for the relative convergence test.
    fn reference_residual(&self, point: &RadialReturnPoint, _delta_p: f64) -> f64 {
        point.effective_trial_stress / point.three_shear_modulus
    }

    /// Largest Δp that does not reverse the deviatoric stress.
    fn maximum_permissible_value(&self, point: &RadialReturnPoint) -> f64 {
        point.effective_trial_stress / point.three_shear_modulus
    }
}

/// Scalar Newton solver with bracketing and line search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarReturnMapping {
    settings: ReturnMappingSettings,
}

impl ScalarReturnMapping {
    pub fn new(settings: ReturnMappingSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ReturnMappingSettings {
        &self.settings
    }

    fn converged(&self, residual: f64, reference: f64, multiplier: f64) -> bool {
        let r = residual.abs();
        r < multiplier * self.settings.absolute_tolerance
            || r < multiplier * self.settings.relative_tolerance * reference.abs()
    }

    /// Solves r(Δp) = 0 and returns Δp and the number of Newton steps taken.
    pub fn solve<M: RadialReturnModel + ?Sized>(
        &self,
        qp: usize,
        model: &M,
        point: &RadialReturnPoint,
    ) -> Result<(f64, usize)> {
        let mut state = ReturnMappingState::Trial;
        let upper = model.maximum_permissible_value(point);
        let mut x = 0.0;
        let mut r = model.residual(point, x);
        let reference = model.reference_residual(point, x);
        if r <= 0.0 || self.converged(r, reference, 1.0) {
            trace!(qp, %state, residual = r, "trial state is admissible");
            return Ok((0.0, 0));
        }

        state = ReturnMappingState::Iterating;
        debug!(qp, %state, q_trial = point.effective_trial_stress, residual = r, "starting return mapping");
        let (mut lower_bound, mut upper_bound) = (0.0, upper);
        let mut iterations = 0;
        while iterations < self.settings.max_iterations {
            iterations += 1;
            let derivative = model.derivative(point, x);
            let mut x_new = x - r / derivative;
            if !(x_new > lower_bound && x_new < upper_bound) {
                x_new = 0.5 * (lower_bound + upper_bound);
            }
            let mut r_new = model.residual(point, x_new);
            if self.settings.line_search {
                let mut halvings = 0;
                while r_new.abs() > r.abs() && halvings < self.settings.max_line_search_steps {
                    x_new = 0.5 * (x + x_new);
                    r_new = model.residual(point, x_new);
                    halvings += 1;
                }
            }
            if r_new > 0.0 {
                lower_bound = lower_bound.max(x_new);
            } else {
                upper_bound = upper_bound.min(x_new);
            }
            x = x_new;
            r = r_new;
            trace!(qp, iterations, delta_p = x, residual = r, "newton step");
            if self.converged(r, model.reference_residual(point, x), 1.0) {
                state = ReturnMappingState::Converged;
                debug!(qp, %state, iterations, delta_p = x, "return mapping converged");
                return Ok((x, iterations));
            }
        }

        if self.converged(
            r,
            model.reference_residual(point, x),
            self.settings.acceptable_multiplier,
        ) {
            state = ReturnMappingState::Converged;
            warn!(qp, %state, iterations, residual = r, "return mapping accepted with relaxed tolerance");
            return Ok((x, iterations));
        }
        state = ReturnMappingState::Diverged;
        debug!(qp, %state, iterations, residual = r, "return mapping failed");
        Err(Error::ConvergenceFailure {
            qp,
            iterations,
            residual: r,
        })
    }
}

/// Implements the stress update contract for any [`RadialReturnModel`].
///
/// Requires an isotropic elasticity tensor.
pub struct RadialReturnStressUpdate<M: RadialReturnModel> {
    model: M,
    solver: ScalarReturnMapping,
}

impl<M: RadialReturnModel> RadialReturnStressUpdate<M> {
    pub fn new(model: M, settings: ReturnMappingSettings) -> Result<Self> {
        Ok(Self {
            model,
            solver: ScalarReturnMapping::new(settings)?,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn settings(&self) -> &ReturnMappingSettings {
        self.solver.settings()
    }

    fn time_step_limit(&self, delta_p: f64, dt: f64) -> f64 {
        if delta_p > 0.0 && dt > 0.0 {
            dt * self.solver.settings().max_inelastic_increment / delta_p
        } else {
            f64::INFINITY
        }
    }

    /// `K I⊗I + 2Gθ P_dev + 2G((1 - θ) - 3G dΔp/dq_tr) n⊗n`
    fn consistent_tangent(
        &self,
        point: &RadialReturnPoint,
        delta_p: f64,
        bulk: f64,
        deviatoric_trial: &RankTwoTensor,
    ) -> RankFourTensor {
        let three_g = point.three_shear_modulus;
        let two_g = 2.0 * three_g / 3.0;
        let theta = 1.0 - three_g * delta_p / point.effective_trial_stress;
        let d_delta_p = -self.model.trial_derivative(point, delta_p) / self.model.derivative(point, delta_p);
        let n = *deviatoric_trial * (1.0 / deviatoric_trial.norm());
        RankFourTensor::identity_outer_identity() * bulk
            + RankFourTensor::deviatoric_projection() * (two_g * theta)
            + n.outer_product(&n) * (two_g * ((1.0 - theta) - three_g * d_delta_p))
    }
}

impl<M: RadialReturnModel> StressUpdate for RadialReturnStressUpdate<M> {
    fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    fn define_history(&self) -> HashMap<Q, QDim> {
        HashMap::from([
            (self.model.scalar_quantity(), QDim::Scalar),
            (self.model.tensor_quantity(), QDim::SquareTensor(3)),
        ])
    }

    fn update_state(
        &self,
        qp: usize,
        history: &mut QpHistory,
        tx: &mut UpdateTransaction,
    ) -> Result<UpdateOutcome> {
        tx.check_admissible()?;
        if !is_isotropic(&tx.elasticity_tensor, ISOTROPY_TOLERANCE) {
            return Err(Error::InadmissibleInput(format!(
                "{} requires an isotropic elasticity tensor",
                self.model.kind()
            )));
        }
        let scalar_q = self.model.scalar_quantity();
        let tensor_q = self.model.tensor_quantity();
        let scalar_old = history.get_scalar(scalar_q)?;
        let inelastic_old = history.get_tensor(tensor_q)?.rotate(&tx.rotation_increment);

        let deviatoric_trial = tx.stress_new.deviatoric();
        let point = RadialReturnPoint {
            effective_trial_stress: (1.5 * deviatoric_trial.double_contraction(&deviatoric_trial)).sqrt(),
            three_shear_modulus: 3.0 * shear_modulus(&tx.elasticity_tensor),
            scalar_old,
            dt: tx.dt,
        };

        let no_increment = tx.strain_increment == RankTwoTensor::zeros();
        let (delta_p, iterations) = if no_increment || point.effective_trial_stress == 0.0 {
            (0.0, 0)
        } else {
            self.solver.solve(qp, &self.model, &point)?
        };

        if delta_p == 0.0 {
            tx.inelastic_strain_increment = RankTwoTensor::zeros();
            tx.tangent_operator = tx.elasticity_tensor;
            history.set_scalar(scalar_q, scalar_old)?;
            history.set_tensor(tensor_q, &inelastic_old)?;
            return Ok(UpdateOutcome::elastic());
        }

        let inelastic = deviatoric_trial * (1.5 * delta_p / point.effective_trial_stress);
        tx.inelastic_strain_increment = inelastic;
        tx.strain_increment -= inelastic;
        tx.stress_new -= tx.elasticity_tensor * inelastic;
        tx.tangent_operator = if tx.compute_full_tangent_operator {
            self.consistent_tangent(&point, delta_p, bulk_modulus(&tx.elasticity_tensor), &deviatoric_trial)
        } else {
            tx.elasticity_tensor
        };

        history.set_scalar(scalar_q, scalar_old + delta_p)?;
        history.set_tensor(tensor_q, &(inelastic_old + inelastic))?;

        Ok(UpdateOutcome {
            state: ReturnMappingState::Converged,
            iterations,
            effective_inelastic_strain_increment: delta_p,
            time_step_limit: self.time_step_limit(delta_p, tx.dt),
        })
    }
}
