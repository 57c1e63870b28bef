use crate::error::{Error, Result};
use crate::history::HistoryStorage;
use crate::interfaces::{StressUpdate, UpdateOutcome, UpdateTransaction};
use rayon::prelude::*;
use tracing::debug;

/// Updates every integration point in parallel.
///
/// `transactions[qp]` belongs to point `qp`. The first failing point aborts the
/// batch; the committed history is unchanged in that case and the caller can
/// `restore()` the storage before retrying with a smaller step.
pub fn evaluate(
    model: &dyn StressUpdate,
    storage: &mut HistoryStorage,
    transactions: &mut [UpdateTransaction],
) -> Result<Vec<UpdateOutcome>> {
    let n = storage.n_quadrature_points();
    if transactions.len() != n {
        return Err(Error::InadmissibleInput(format!(
            "{} transactions for {} integration points",
            transactions.len(),
            n
        )));
    }
    debug!(kind = %model.kind(), n_qp = n, "evaluating all integration points");
    storage
        .par_points_mut()
        .zip(transactions.par_iter_mut())
        .enumerate()
        .map(|(qp, (mut history, transaction))| model.update_state(qp, &mut history, transaction))
        .collect()
}

/// Updates the points listed in `ips`, one after another.
///
/// `transactions` is indexed by integration point like in [`evaluate`]; entries
/// of points not in `ips` are not touched.
pub fn evaluate_some(
    model: &dyn StressUpdate,
    storage: &mut HistoryStorage,
    transactions: &mut [UpdateTransaction],
    ips: &[usize],
) -> Result<Vec<UpdateOutcome>> {
    let n = storage.n_quadrature_points();
    if transactions.len() != n {
        return Err(Error::InadmissibleInput(format!(
            "{} transactions for {} integration points",
            transactions.len(),
            n
        )));
    }
    let mut outcomes = Vec::with_capacity(ips.len());
    for ip in ips {
        let mut history = storage.point(*ip)?;
        outcomes.push(model.update_state(*ip, &mut history, &mut transactions[*ip])?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elasticity::isotropic_elasticity;
    use crate::interfaces::Q;
    use crate::models::{create_stress_update, ModelKind};
    use crate::rank_two_tensor::RankTwoTensor;
    use std::collections::HashMap;

    fn model() -> Box<dyn StressUpdate> {
        let parameters = HashMap::from([("yield_stress".to_string(), 250e6)]);
        create_stress_update(ModelKind::IsotropicPlasticity, &parameters).unwrap()
    }

    fn uniaxial(strain: f64) -> UpdateTransaction {
        UpdateTransaction::trial(
            RankTwoTensor::zeros(),
            RankTwoTensor::zeros(),
            RankTwoTensor::symmetric([strain, -0.3 * strain, -0.3 * strain, 0.0, 0.0, 0.0]),
            isotropic_elasticity(200e9, 0.3),
        )
    }

    #[test]
    fn evaluate_updates_every_point() {
        let model = model();
        let mut storage = HistoryStorage::new(model.as_ref(), 3);
        let mut transactions = vec![uniaxial(1e-4), uniaxial(5e-3), uniaxial(-5e-3)];
        let outcomes = evaluate(model.as_ref(), &mut storage, &mut transactions).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_elastic());
        assert!(!outcomes[1].is_elastic());
        assert!(!outcomes[2].is_elastic());
        assert_eq!(storage.new_scalar(0, Q::EquivalentPlasticStrain).unwrap(), 0.0);
        assert!(storage.new_scalar(1, Q::EquivalentPlasticStrain).unwrap() > 0.0);
        assert_eq!(storage.old_scalar(1, Q::EquivalentPlasticStrain).unwrap(), 0.0);
    }

    #[test]
    fn evaluate_some_leaves_other_points() {
        let model = model();
        let mut storage = HistoryStorage::new(model.as_ref(), 2);
        let mut transactions = vec![uniaxial(5e-3), uniaxial(5e-3)];
        let outcomes = evaluate_some(model.as_ref(), &mut storage, &mut transactions, &[1]).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(transactions[0], uniaxial(5e-3));
        assert_ne!(transactions[1], uniaxial(5e-3));
        assert_eq!(storage.new_scalar(0, Q::EquivalentPlasticStrain).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let model = model();
        let mut storage = HistoryStorage::new(model.as_ref(), 2);
        let mut transactions = vec![uniaxial(1e-4)];
        assert!(matches!(
            evaluate(model.as_ref(), &mut storage, &mut transactions),
            Err(Error::InadmissibleInput(_))
        ));
        let mut transactions = vec![uniaxial(1e-4), uniaxial(1e-4)];
        assert!(matches!(
            evaluate_some(model.as_ref(), &mut storage, &mut transactions, &[2]),
            Err(Error::InadmissibleInput(_))
        ));
    }
}
