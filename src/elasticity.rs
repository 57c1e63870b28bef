use crate::rank_four_tensor::RankFourTensor;

/// Isotropic elasticity tensor from Young's modulus and Poisson's ratio.
#[allow(non_snake_case)]
pub fn isotropic_elasticity(E: f64, nu: f64) -> RankFourTensor {
    let mu = E / (2.0 * (1.0 + nu));
    let lambda = E * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
    RankFourTensor::isotropic(lambda, mu)
}

/// Isotropic elasticity tensor from the Lamé parameters.
pub fn isotropic_elasticity_lame(lambda: f64, mu: f64) -> RankFourTensor {
    RankFourTensor::isotropic(lambda, mu)
}

/// Shear modulus of an isotropic elasticity tensor, `C_0101`.
pub fn shear_modulus(elasticity: &RankFourTensor) -> f64 {
    elasticity.get(0, 1, 0, 1)
}

/// Bulk modulus of an isotropic elasticity tensor, `(C_0000 + 2 C_0011) / 3`.
pub fn bulk_modulus(elasticity: &RankFourTensor) -> f64 {
    (elasticity.get(0, 0, 0, 0) + 2.0 * elasticity.get(0, 0, 1, 1)) / 3.0
}

/// Checks that the tensor equals the isotropic tensor built from its own
/// shear and bulk moduli.
pub fn is_isotropic(elasticity: &RankFourTensor, tol: f64) -> bool {
    let mu = shear_modulus(elasticity);
    let lambda = bulk_modulus(elasticity) - 2.0 * mu / 3.0;
    let reference = RankFourTensor::isotropic(lambda, mu);
    let scale = elasticity.0.amax().max(f64::MIN_POSITIVE);
    (elasticity.0 - reference.0).amax() <= tol * scale
}
