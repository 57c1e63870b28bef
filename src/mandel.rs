//! Mandel notation for symmetric tensors.
//!
//! Component order is `[11, 22, 33, 23, 13, 12]` and shear components carry a
//! factor of sqrt(2), so the Euclidean dot product of two Mandel vectors equals
//! the double contraction of the underlying tensors.
use nalgebra::{SMatrix, SVector};

//TODO: This is a hack. Replace once https://github.com/rust-lang/rust/issues/57241 is solved
const SQRT: f64 = 1.4142135623730951;
const FACTOR: f64 = 0.7071067811865475; // 1/sqrt(2)

/// Tensor indices of each Mandel component.
pub const MANDEL_INDICES: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

#[inline]
fn weight(index: usize) -> f64 {
    if index < 3 {
        1.0
    } else {
        SQRT
    }
}

/// Converts the symmetric part of a 3x3 matrix to a Mandel vector.
pub fn tensor_to_mandel(tensor: &SMatrix<f64, 3, 3>) -> SVector<f64, 6> {
    SVector::<f64, 6>::new(
        tensor.m11,
        tensor.m22,
        tensor.m33,
        FACTOR * (tensor.m23 + tensor.m32),
        FACTOR * (tensor.m13 + tensor.m31),
        FACTOR * (tensor.m12 + tensor.m21),
    )
}

pub fn mandel_to_tensor(mandel: &SVector<f64, 6>) -> SMatrix<f64, 3, 3> {
    SMatrix::<f64, 3, 3>::new(
        mandel.x,
        FACTOR * mandel.b,
        FACTOR * mandel.a,
        FACTOR * mandel.b,
        mandel.y,
        FACTOR * mandel.w,
        FACTOR * mandel.a,
        FACTOR * mandel.w,
        mandel.z,
    )
}

/// Converts a fourth order tensor stored as a 9x9 matrix (row `3i+j`, column `3k+l`)
/// to its 6x6 Mandel matrix. Only the minor-symmetric part survives.
pub fn rank_four_to_mandel(full: &SMatrix<f64, 9, 9>) -> SMatrix<f64, 6, 6> {
    SMatrix::<f64, 6, 6>::from_fn(|a, b| {
        let (i, j) = MANDEL_INDICES[a];
        let (k, l) = MANDEL_INDICES[b];
        let sym = 0.25
            * (full[(3 * i + j, 3 * k + l)]
                + full[(3 * j + i, 3 * k + l)]
                + full[(3 * i + j, 3 * l + k)]
                + full[(3 * j + i, 3 * l + k)]);
        weight(a) * weight(b) * sym
    })
}

/// Expands a 6x6 Mandel matrix to a minor-symmetric 9x9 storage.
pub fn mandel_to_rank_four(mandel: &SMatrix<f64, 6, 6>) -> SMatrix<f64, 9, 9> {
    let mut full = SMatrix::<f64, 9, 9>::zeros();
    for a in 0..6 {
        let (i, j) = MANDEL_INDICES[a];
        for b in 0..6 {
            let (k, l) = MANDEL_INDICES[b];
            let value = mandel[(a, b)] / (weight(a) * weight(b));
            full[(3 * i + j, 3 * k + l)] = value;
            full[(3 * j + i, 3 * k + l)] = value;
            full[(3 * i + j, 3 * l + k)] = value;
            full[(3 * j + i, 3 * l + k)] = value;
        }
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dot_product_is_double_contraction() {
        let a = SMatrix::<f64, 3, 3>::new(1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0);
        let b = SMatrix::<f64, 3, 3>::new(-1.0, 0.5, 0.0, 0.5, 2.0, 1.5, 0.0, 1.5, 3.0);
        let expected = a.component_mul(&b).sum();
        let dot = tensor_to_mandel(&a).dot(&tensor_to_mandel(&b));
        assert_relative_eq!(dot, expected, epsilon = 1e-12);
    }

    #[test]
    fn tensor_survives_mandel_conversion() {
        let a = SMatrix::<f64, 3, 3>::new(1.0, 2.0, 3.0, 2.0, 4.0, 5.0, 3.0, 5.0, 6.0);
        assert_relative_eq!(mandel_to_tensor(&tensor_to_mandel(&a)), a, epsilon = 1e-12);
    }

    #[test]
    fn rank_four_mandel_keeps_minor_symmetric_part() {
        let m = SMatrix::<f64, 6, 6>::from_fn(|a, b| 1.0 + (a * 6 + b) as f64);
        let sym = 0.5 * (m + m.transpose());
        let back = rank_four_to_mandel(&mandel_to_rank_four(&sym));
        assert_relative_eq!(back, sym, epsilon = 1e-10);
    }
}
