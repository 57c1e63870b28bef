use crate::error::{Error, Result};
use crate::mandel::{mandel_to_tensor, tensor_to_mandel};
use crate::rank_four_tensor::RankFourTensor;
use nalgebra::{SMatrix, SVector};
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// Determinants below `SINGULAR_RATIO * |A|^3` are treated as zero.
const SINGULAR_RATIO: f64 = 1e-14;

/// A second order tensor in three dimensions (stress, strain, rotation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankTwoTensor(pub SMatrix<f64, 3, 3>);

impl Default for RankTwoTensor {
    fn default() -> Self {
        Self::zeros()
    }
}

impl RankTwoTensor {
    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Builds a tensor from its rows.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(SMatrix::from_fn(|i, j| rows[i][j]))
    }

    /// Builds a symmetric tensor from `[11, 22, 33, 23, 13, 12]`.
    pub fn symmetric(components: [f64; 6]) -> Self {
        let [xx, yy, zz, yz, xz, xy] = components;
        Self::from_rows([[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]])
    }

    pub fn from_mandel(mandel: &SVector<f64, 6>) -> Self {
        Self(mandel_to_tensor(mandel))
    }

    pub fn to_mandel(&self) -> SVector<f64, 6> {
        tensor_to_mandel(&self.0)
    }

    pub fn matrix(&self) -> &SMatrix<f64, 3, 3> {
        &self.0
    }

    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    pub fn sym(&self) -> Self {
        Self(0.5 * (self.0 + self.0.transpose()))
    }

    pub fn skew(&self) -> Self {
        Self(0.5 * (self.0 - self.0.transpose()))
    }

    pub fn trace(&self) -> f64 {
        self.0.trace()
    }

    /// `A - tr(A)/3 I`
    pub fn deviatoric(&self) -> Self {
        let p = self.trace() / 3.0;
        Self(self.0 - SMatrix::identity() * p)
    }

    /// `A : B = A_ij B_ij`
    pub fn double_contraction(&self, other: &Self) -> f64 {
        self.0.component_mul(&other.0).sum()
    }

    /// Frobenius norm `sqrt(A : A)`.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Second invariant of the deviatoric part, `J2 = 1/2 s : s`.
    pub fn second_invariant(&self) -> f64 {
        let s = self.deviatoric();
        0.5 * s.double_contraction(&s)
    }

    /// Von Mises equivalent value `sqrt(3 J2)`.
    pub fn von_mises(&self) -> f64 {
        (3.0 * self.second_invariant()).sqrt()
    }

    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Inverse of the tensor.
    ///
    /// Fails with [`Error::SingularTensor`] if the determinant is negligible
    /// compared to the magnitude of the entries.
    pub fn inverse(&self) -> Result<Self> {
        let scale = self.norm();
        let det = self.determinant();
        if scale == 0.0 || !det.is_finite() || det.abs() <= SINGULAR_RATIO * scale.powi(3) {
            return Err(Error::SingularTensor(format!(
                "rank two tensor with determinant {det:e} cannot be inverted"
            )));
        }
        self.0
            .try_inverse()
            .map(Self)
            .ok_or_else(|| Error::SingularTensor("rank two tensor cannot be inverted".to_string()))
    }

    /// `R · A · Rᵀ`
    pub fn rotate(&self, rotation: &Self) -> Self {
        Self(rotation.0 * self.0 * rotation.0.transpose())
    }

    /// `(A ⊗ B)_ijkl = A_ij B_kl`
    pub fn outer_product(&self, other: &Self) -> RankFourTensor {
        RankFourTensor::from_fn(|i, j, k, l| self.0[(i, j)] * other.0[(k, l)])
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        (self.0 - self.0.transpose()).amax() <= tol * self.0.amax().max(1.0)
    }

    /// True for an orthogonal tensor with determinant +1.
    pub fn is_rotation(&self, tol: f64) -> bool {
        let orthogonality = (self.0.transpose() * self.0 - SMatrix::<f64, 3, 3>::identity()).amax();
        orthogonality <= tol && (self.determinant() - 1.0).abs() <= tol
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Index<(usize, usize)> for RankTwoTensor {
    type Output = f64;
    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<(usize, usize)> for RankTwoTensor {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.0[index]
    }
}

impl Add for RankTwoTensor {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for RankTwoTensor {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for RankTwoTensor {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for RankTwoTensor {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for RankTwoTensor {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<f64> for RankTwoTensor {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Mul<RankTwoTensor> for f64 {
    type Output = RankTwoTensor;
    fn mul(self, rhs: RankTwoTensor) -> RankTwoTensor {
        RankTwoTensor(rhs.0 * self)
    }
}

impl MulAssign<f64> for RankTwoTensor {
    fn mul_assign(&mut self, rhs: f64) {
        self.0 *= rhs;
    }
}

/// Single contraction (matrix product).
impl Mul for RankTwoTensor {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}
