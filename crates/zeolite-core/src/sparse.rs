//! Sparse matrices in COO (triplet) format.
//!
//! The incidence, adjacency and node-graph matrices are all stored as explicit
//! (row, column, value) triplet lists with a declared shape. This keeps the
//! on-disk layout and the transpose/reorder step in tensor materialization
//! fully specified, instead of leaning on an opaque sparse type.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A sparse matrix as parallel (rows, cols, data) triplet vectors.
///
/// Duplicate coordinates are allowed and are interpreted additively, as in
/// scipy's COO format; [`CooMatrix::canonicalized`] collapses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooMatrix {
    shape: (usize, usize),
    rows: Vec<usize>,
    cols: Vec<usize>,
    data: Vec<f32>,
}

impl CooMatrix {
    /// Build a COO matrix from triplets, checking index bounds and that the
    /// three vectors agree in length.
    pub fn new(
        shape: (usize, usize),
        rows: Vec<usize>,
        cols: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self> {
        if rows.len() != cols.len() || rows.len() != data.len() {
            return Err(Error::Validation(format!(
                "triplet lengths disagree: {} rows, {} cols, {} values",
                rows.len(),
                cols.len(),
                data.len()
            )));
        }
        for (&r, &c) in rows.iter().zip(&cols) {
            if r >= shape.0 || c >= shape.1 {
                return Err(Error::Validation(format!(
                    "entry ({r}, {c}) outside shape {:?}",
                    shape
                )));
            }
        }
        Ok(Self { shape, rows, cols, data })
    }

    /// The 0x0 matrix, used where the original keeps a degenerate placeholder
    /// (node-graph matrix of non-graph problems).
    pub fn empty() -> Self {
        Self { shape: (0, 0), rows: Vec::new(), cols: Vec::new(), data: Vec::new() }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of stored entries (duplicates counted separately).
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// True for a matrix with a zero dimension.
    pub fn is_degenerate(&self) -> bool {
        self.shape.0 == 0 || self.shape.1 == 0
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Iterate stored entries as (row, col, value).
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.data)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    /// The transposed matrix: shape and coordinates swapped, entry order kept.
    pub fn transposed(&self) -> Self {
        Self {
            shape: (self.shape.1, self.shape.0),
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            data: self.data.clone(),
        }
    }

    /// Canonical form: entries sorted row-major, duplicate coordinates summed.
    pub fn canonicalized(&self) -> Self {
        let mut order: Vec<usize> = (0..self.nnz()).collect();
        order.sort_by_key(|&i| (self.rows[i], self.cols[i]));

        let mut rows = Vec::with_capacity(self.nnz());
        let mut cols = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for i in order {
            let (r, c, v) = (self.rows[i], self.cols[i], self.data[i]);
            if rows.last() == Some(&r) && cols.last() == Some(&c) {
                *data.last_mut().expect("non-empty by construction") += v;
            } else {
                rows.push(r);
                cols.push(c);
                data.push(v);
            }
        }
        Self { shape: self.shape, rows, cols, data }
    }

    /// Block-diagonal composition: each input occupies its own row/column
    /// band, in input order. Degenerate inputs contribute nothing but are
    /// legal, so a mixed list of empty node-graph matrices composes to the
    /// empty matrix.
    pub fn block_diag(blocks: &[&CooMatrix]) -> Self {
        let mut out = Self::empty();
        for block in blocks {
            let (row_off, col_off) = out.shape;
            out.shape = (row_off + block.shape.0, col_off + block.shape.1);
            out.rows.extend(block.rows.iter().map(|&r| r + row_off));
            out.cols.extend(block.cols.iter().map(|&c| c + col_off));
            out.data.extend_from_slice(&block.data);
        }
        out
    }

    /// Densify, summing duplicates. Intended for tests and small readouts.
    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros(self.shape);
        for (r, c, v) in self.entries() {
            dense[(r, c)] += v;
        }
        dense
    }

    /// Per-column sums over stored entries.
    pub fn col_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.shape.1];
        for (_, c, v) in self.entries() {
            sums[c] += v;
        }
        sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CooMatrix {
        CooMatrix::new((2, 3), vec![1, 0, 1], vec![2, 0, 2], vec![1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn new_rejects_out_of_bounds() {
        let err = CooMatrix::new((2, 2), vec![2], vec![0], vec![1.0]);
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn new_rejects_ragged_triplets() {
        let err = CooMatrix::new((2, 2), vec![0, 1], vec![0], vec![1.0, 1.0]);
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[test]
    fn transpose_swaps_coordinates() {
        let t = sample().transposed();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.rows(), &[2, 0, 2]);
        assert_eq!(t.cols(), &[1, 0, 1]);
    }

    #[test]
    fn canonicalize_sorts_and_sums() {
        let c = sample().canonicalized();
        assert_eq!(c.rows(), &[0, 1]);
        assert_eq!(c.cols(), &[0, 2]);
        assert_eq!(c.data(), &[2.0, 4.0]);
    }

    #[test]
    fn block_diag_offsets_bands() {
        let a = CooMatrix::new((2, 1), vec![0, 1], vec![0, 0], vec![0.5, 0.5]).unwrap();
        let b = CooMatrix::new((3, 1), vec![0, 1, 2], vec![0, 0, 0], vec![1.0; 3]).unwrap();
        let d = CooMatrix::block_diag(&[&a, &b]);
        assert_eq!(d.shape(), (5, 2));
        assert_eq!(d.rows(), &[0, 1, 2, 3, 4]);
        assert_eq!(d.cols(), &[0, 0, 1, 1, 1]);
    }

    #[test]
    fn block_diag_of_empties_is_empty() {
        let d = CooMatrix::block_diag(&[&CooMatrix::empty(), &CooMatrix::empty()]);
        assert!(d.is_degenerate());
        assert_eq!(d.nnz(), 0);
    }

    #[test]
    fn dense_sums_duplicates() {
        let dense = sample().to_dense();
        assert_eq!(dense[(1, 2)], 4.0);
        assert_eq!(dense[(0, 0)], 2.0);
        assert_eq!(dense[(0, 1)], 0.0);
    }
}
