//! Point-indexed storage for the internal history of a model.
//!
//! Every integration point owns a contiguous slice of the `old` (last committed)
//! and `new` (being computed) buffers. A model reads `old` and writes `new`; the
//! caller commits once the whole step is accepted or restores to retry it.
use crate::error::{Error, Result};
use crate::interfaces::{QDim, StressUpdate, Q};
use crate::rank_two_tensor::RankTwoTensor;
use nalgebra::SMatrix;
use rayon::prelude::*;
use std::collections::HashMap;

/// Offsets of the history quantities inside one point's slice.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLayout {
    entries: Vec<(Q, QDim, usize)>,
    size: usize,
}

impl HistoryLayout {
    pub fn new(quantities: &HashMap<Q, QDim>) -> Self {
        let mut sorted: Vec<(Q, QDim)> = quantities.iter().map(|(q, dim)| (*q, *dim)).collect();
        sorted.sort_by_key(|(q, _)| *q);
        let mut offset = 0;
        let mut entries = Vec::with_capacity(sorted.len());
        for (q, dim) in sorted {
            entries.push((q, dim, offset));
            offset += dim.size();
        }
        Self { entries, size: offset }
    }

    /// Number of values per integration point.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_some(&self, q: Q) -> bool {
        self.entries.iter().any(|(e, _, _)| *e == q)
    }

    fn range(&self, q: Q, dim: QDim) -> Result<std::ops::Range<usize>> {
        match self.entries.iter().find(|(e, _, _)| *e == q) {
            Some((_, d, offset)) if *d == dim => Ok(*offset..*offset + dim.size()),
            Some((_, d, _)) => Err(Error::InvalidParameter(format!(
                "history quantity {q} has dimension {d:?}, not {dim:?}"
            ))),
            None => Err(Error::InvalidParameter(format!("history quantity {q} is not stored"))),
        }
    }
}

/// History of a single integration point.
#[derive(Debug)]
pub struct QpHistory<'a> {
    layout: &'a HistoryLayout,
    old: &'a [f64],
    new: &'a mut [f64],
}

impl<'a> QpHistory<'a> {
    pub fn new(layout: &'a HistoryLayout, old: &'a [f64], new: &'a mut [f64]) -> Self {
        assert_eq!(old.len(), layout.size());
        assert_eq!(new.len(), layout.size());
        Self { layout, old, new }
    }

    pub fn is_some(&self, q: Q) -> bool {
        self.layout.is_some(q)
    }

    /// Last committed value of a scalar quantity.
    pub fn get_scalar(&self, q: Q) -> Result<f64> {
        let range = self.layout.range(q, QDim::Scalar)?;
        Ok(self.old[range.start])
    }

    pub fn set_scalar(&mut self, q: Q, value: f64) -> Result<()> {
        let range = self.layout.range(q, QDim::Scalar)?;
        self.new[range.start] = value;
        Ok(())
    }

    /// Last committed value of a tensor quantity, stored row by row.
    pub fn get_tensor(&self, q: Q) -> Result<RankTwoTensor> {
        let range = self.layout.range(q, QDim::SquareTensor(3))?;
        Ok(RankTwoTensor(SMatrix::<f64, 3, 3>::from_row_slice(&self.old[range])))
    }

    pub fn set_tensor(&mut self, q: Q, value: &RankTwoTensor) -> Result<()> {
        let range = self.layout.range(q, QDim::SquareTensor(3))?;
        let slot = &mut self.new[range];
        for i in 0..3 {
            for j in 0..3 {
                slot[3 * i + j] = value[(i, j)];
            }
        }
        Ok(())
    }
}

/// History of all integration points handled by one model.
#[derive(Debug, Clone)]
pub struct HistoryStorage {
    layout: HistoryLayout,
    n_qp: usize,
    old: Vec<f64>,
    new: Vec<f64>,
}

impl HistoryStorage {
    /// Allocates zeroed history for `n_qp` points with the model's layout.
    pub fn new(model: &dyn StressUpdate, n_qp: usize) -> Self {
        let layout = HistoryLayout::new(&model.define_history());
        let len = layout.size() * n_qp;
        Self {
            layout,
            n_qp,
            old: vec![0.0; len],
            new: vec![0.0; len],
        }
    }

    pub fn n_quadrature_points(&self) -> usize {
        self.n_qp
    }

    pub fn layout(&self) -> &HistoryLayout {
        &self.layout
    }

    /// History of integration point `qp`.
    pub fn point(&mut self, qp: usize) -> Result<QpHistory<'_>> {
        if qp >= self.n_qp {
            return Err(Error::InadmissibleInput(format!(
                "integration point {qp} out of range ({})",
                self.n_qp
            )));
        }
        let size = self.layout.size();
        let range = qp * size..(qp + 1) * size;
        Ok(QpHistory::new(&self.layout, &self.old[range.clone()], &mut self.new[range]))
    }

    /// Histories of all points, in point order, for parallel iteration.
    pub fn par_points_mut(&mut self) -> impl IndexedParallelIterator<Item = QpHistory<'_>> {
        let size = self.layout.size();
        let layout = &self.layout;
        let old = &self.old;
        let new = &mut self.new;
        (0..self.n_qp)
            .into_par_iter()
            .zip(split_points(new, size, self.n_qp).into_par_iter())
            .map(move |(qp, new)| QpHistory::new(layout, &old[qp * size..(qp + 1) * size], new))
    }

    /// Committed value of a scalar quantity at `qp`.
    pub fn old_scalar(&self, qp: usize, q: Q) -> Result<f64> {
        let range = self.layout.range(q, QDim::Scalar)?;
        Ok(self.old[qp * self.layout.size() + range.start])
    }

    /// Value of a scalar quantity at `qp` computed in the current step.
    pub fn new_scalar(&self, qp: usize, q: Q) -> Result<f64> {
        let range = self.layout.range(q, QDim::Scalar)?;
        Ok(self.new[qp * self.layout.size() + range.start])
    }

    /// Value of a tensor quantity at `qp` computed in the current step.
    pub fn new_tensor(&self, qp: usize, q: Q) -> Result<RankTwoTensor> {
        let range = self.layout.range(q, QDim::SquareTensor(3))?;
        let start = qp * self.layout.size();
        let slice = &self.new[start + range.start..start + range.end];
        Ok(RankTwoTensor(SMatrix::<f64, 3, 3>::from_row_slice(slice)))
    }

    /// Accepts the current step: `old := new`.
    pub fn commit(&mut self) {
        self.old.copy_from_slice(&self.new);
    }

    /// Discards the current step: `new := old`.
    pub fn restore(&mut self) {
        self.new.copy_from_slice(&self.old);
    }
}

fn split_points(buffer: &mut [f64], size: usize, n_qp: usize) -> Vec<&mut [f64]> {
    let mut points = Vec::with_capacity(n_qp);
    let mut rest = buffer;
    for _ in 0..n_qp {
        let (head, tail) = rest.split_at_mut(size);
        points.push(head);
        rest = tail;
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> HistoryLayout {
        HistoryLayout::new(&HashMap::from([
            (Q::PlasticStrain, QDim::SquareTensor(3)),
            (Q::EquivalentPlasticStrain, QDim::Scalar),
        ]))
    }

    #[test]
    fn layout_is_ordered_by_quantity() {
        let layout = layout();
        assert_eq!(layout.size(), 10);
        assert_eq!(layout.range(Q::EquivalentPlasticStrain, QDim::Scalar).unwrap(), 0..1);
        assert_eq!(layout.range(Q::PlasticStrain, QDim::SquareTensor(3)).unwrap(), 1..10);
        assert!(layout.is_some(Q::PlasticStrain));
        assert!(!layout.is_some(Q::CreepStrain));
    }

    #[test]
    fn point_reads_old_and_writes_new() {
        let layout = layout();
        let old = vec![0.5; 10];
        let mut new = vec![0.0; 10];
        let mut point = QpHistory::new(&layout, &old, &mut new);
        assert_eq!(point.get_scalar(Q::EquivalentPlasticStrain).unwrap(), 0.5);
        point.set_scalar(Q::EquivalentPlasticStrain, 0.75).unwrap();
        let eps = RankTwoTensor::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        point.set_tensor(Q::PlasticStrain, &eps).unwrap();
        assert_eq!(point.get_scalar(Q::EquivalentPlasticStrain).unwrap(), 0.5);
        assert_eq!(new[0], 0.75);
        assert_eq!(&new[1..4], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn wrong_quantity_is_an_error() {
        let layout = layout();
        let old = vec![0.0; 10];
        let mut new = vec![0.0; 10];
        let point = QpHistory::new(&layout, &old, &mut new);
        assert!(matches!(point.get_scalar(Q::CreepStrain), Err(Error::InvalidParameter(_))));
        assert!(matches!(point.get_scalar(Q::PlasticStrain), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn point_out_of_range_is_an_error() {
        let mut storage = HistoryStorage {
            layout: layout(),
            n_qp: 2,
            old: vec![0.0; 20],
            new: vec![0.0; 20],
        };
        assert!(storage.point(1).is_ok());
        assert!(matches!(storage.point(2), Err(Error::InadmissibleInput(_))));
    }

    #[test]
    fn split_points_covers_buffer() {
        let mut buffer: Vec<f64> = (0..6).map(|v| v as f64).collect();
        let points = split_points(&mut buffer, 2, 3);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], &[4.0, 5.0]);
        let mut empty: Vec<f64> = Vec::new();
        assert_eq!(split_points(&mut empty, 0, 4).len(), 4);
    }
}
