use crate::error::{Error, Result};
use crate::mandel::{mandel_to_rank_four, rank_four_to_mandel};
use crate::rank_two_tensor::RankTwoTensor;
use nalgebra::{SMatrix, SVector};
use std::ops::{Add, Mul, Sub};

/// A fourth order tensor in three dimensions (elasticity, tangent operators).
///
/// Components are stored in a 9x9 matrix with row `3i+j` and column `3k+l`, so
/// the double contraction with a rank two tensor is a matrix-vector product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankFourTensor(pub SMatrix<f64, 9, 9>);

#[inline]
fn kronecker(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn flatten(t: &RankTwoTensor) -> SVector<f64, 9> {
    SVector::<f64, 9>::from_fn(|a, _| t[(a / 3, a % 3)])
}

impl Default for RankFourTensor {
    fn default() -> Self {
        Self::zeros()
    }
}

impl RankFourTensor {
    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    pub fn from_fn<F: Fn(usize, usize, usize, usize) -> f64>(f: F) -> Self {
        Self(SMatrix::from_fn(|a, b| f(a / 3, a % 3, b / 3, b % 3)))
    }

    /// `δik δjl`, maps every rank two tensor onto itself.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// `1/2 (δik δjl + δil δjk)`, maps a rank two tensor onto its symmetric part.
    pub fn identity_symmetric() -> Self {
        Self::from_fn(|i, j, k, l| 0.5 * (kronecker(i, k) * kronecker(j, l) + kronecker(i, l) * kronecker(j, k)))
    }

    /// `δij δkl`
    pub fn identity_outer_identity() -> Self {
        Self::from_fn(|i, j, k, l| kronecker(i, j) * kronecker(k, l))
    }

    /// Maps a rank two tensor onto the deviatoric part of its symmetric part.
    pub fn deviatoric_projection() -> Self {
        Self(Self::identity_symmetric().0 - Self::identity_outer_identity().0 / 3.0)
    }

    /// `λ δij δkl + μ (δik δjl + δil δjk)`
    pub fn isotropic(lambda: f64, mu: f64) -> Self {
        Self(Self::identity_outer_identity().0 * lambda + Self::identity_symmetric().0 * (2.0 * mu))
    }

    pub fn from_mandel(mandel: &SMatrix<f64, 6, 6>) -> Self {
        Self(mandel_to_rank_four(mandel))
    }

    /// 6x6 Mandel matrix of the minor-symmetric part.
    pub fn to_mandel(&self) -> SMatrix<f64, 6, 6> {
        rank_four_to_mandel(&self.0)
    }

    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.0[(3 * i + j, 3 * k + l)]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, l: usize, value: f64) {
        self.0[(3 * i + j, 3 * k + l)] = value;
    }

    /// `C_ijkl E_kl`
    pub fn double_contraction(&self, t: &RankTwoTensor) -> RankTwoTensor {
        let v = self.0 * flatten(t);
        RankTwoTensor(SMatrix::from_fn(|i, j| v[3 * i + j]))
    }

    /// `C_ijmn D_mnkl`
    pub fn double_contraction_four(&self, other: &Self) -> Self {
        Self(self.0 * other.0)
    }

    /// `C_klij`
    pub fn transpose_major(&self) -> Self {
        Self(self.0.transpose())
    }

    /// `R_ip R_jq R_kr R_ls C_pqrs`
    pub fn rotate(&self, rotation: &RankTwoTensor) -> Self {
        let q = SMatrix::<f64, 9, 9>::from_fn(|a, b| rotation[(a / 3, b / 3)] * rotation[(a % 3, b % 3)]);
        Self(q * self.0 * q.transpose())
    }

    /// Inverse of the full 9x9 operator.
    ///
    /// Operators with minor symmetry annihilate skew tensors and are singular in this
    /// sense; use [`RankFourTensor::inverse_symmetric`] for those.
    pub fn inverse(&self) -> Result<Self> {
        self.0
            .try_inverse()
            .map(Self)
            .ok_or_else(|| Error::SingularTensor("rank four tensor cannot be inverted".to_string()))
    }

    /// Inverse on the space of symmetric rank two tensors.
    pub fn inverse_symmetric(&self) -> Result<Self> {
        self.to_mandel()
            .try_inverse()
            .map(|inv| Self::from_mandel(&inv))
            .ok_or_else(|| {
                Error::SingularTensor("rank four tensor cannot be inverted on symmetric tensors".to_string())
            })
    }

    /// `C_ijkl = C_jikl = C_ijlk`
    pub fn is_minor_symmetric(&self, tol: f64) -> bool {
        let scale = self.0.amax().max(f64::MIN_POSITIVE);
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        let c = self.get(i, j, k, l);
                        if (c - self.get(j, i, k, l)).abs() > tol * scale
                            || (c - self.get(i, j, l, k)).abs() > tol * scale
                        {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// `C_ijkl = C_klij`
    pub fn is_major_symmetric(&self, tol: f64) -> bool {
        let scale = self.0.amax().max(f64::MIN_POSITIVE);
        (self.0 - self.0.transpose()).amax() <= tol * scale
    }

    /// Positive definiteness on symmetric rank two tensors.
    pub fn is_positive_definite(&self) -> bool {
        let m = self.to_mandel();
        (0.5 * (m + m.transpose())).cholesky().is_some()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Add for RankFourTensor {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for RankFourTensor {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for RankFourTensor {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Mul<RankFourTensor> for f64 {
    type Output = RankFourTensor;
    fn mul(self, rhs: RankFourTensor) -> RankFourTensor {
        RankFourTensor(rhs.0 * self)
    }
}

impl Mul<RankTwoTensor> for RankFourTensor {
    type Output = RankTwoTensor;
    fn mul(self, rhs: RankTwoTensor) -> RankTwoTensor {
        self.double_contraction(&rhs)
    }
}
