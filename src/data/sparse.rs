//! Compressed sparse storage and the row/column transpose
//!
//! Solvers never touch [`SparseVector`](crate::core::SparseVector) lists
//! directly: a validated [`Problem`] is packed once into a [`SparseMatrix`]
//! (compressed rows, 0-based column indices, bias column appended), and the
//! coordinate-descent solvers that sweep over features work on its
//! transpose.

use crate::core::Problem;

/// Row-compressed sparse matrix with 0-based column indices
///
/// Within every row the column indices are strictly ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Pack the instances of a validated problem, one row per instance
    ///
    /// When the bias is enabled every row gets an extra entry in column
    /// `problem.n` holding the bias value.
    pub fn from_problem(problem: &Problem) -> Self {
        let bias = problem.has_bias();
        let nnz: usize =
            problem.x.iter().map(|x| x.nnz()).sum::<usize>() + if bias { problem.len() } else { 0 };

        let mut row_ptr = Vec::with_capacity(problem.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);

        for x in &problem.x {
            for (index, value) in x.iter() {
                col_idx.push(index - 1);
                values.push(value);
            }
            if bias {
                col_idx.push(problem.n);
                values.push(problem.bias);
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            n_rows: problem.len(),
            n_cols: problem.feature_dim(),
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Build a matrix from rows of `(column, value)` pairs
    #[cfg(test)]
    pub(crate) fn from_rows(n_cols: usize, rows: &[Vec<(usize, f64)>]) -> Self {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for row in rows {
            for (k, &(col, value)) in row.iter().enumerate() {
                assert!(col < n_cols, "column {col} out of range");
                assert!(
                    k == 0 || row[k - 1].0 < col,
                    "row columns must be strictly ascending"
                );
                col_idx.push(col);
                values.push(value);
            }
            row_ptr.push(col_idx.len());
        }
        Self {
            n_rows: rows.len(),
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Row `i` as `(column, value)` pairs
    pub fn row_pairs(&self, i: usize) -> Vec<(usize, f64)> {
        let (cols, vals) = self.row(i);
        cols.iter().copied().zip(vals.iter().copied()).collect()
    }

    /// Squared Euclidean norm of every row
    pub fn row_norms_squared(&self) -> Vec<f64> {
        (0..self.n_rows)
            .map(|i| self.row(i).1.iter().map(|v| v * v).sum())
            .collect()
    }

    /// Swap the roles of rows and columns
    ///
    /// One counting pass sizes every output row, one scatter pass fills
    /// them. Input rows are visited in order, so every output row lists its
    /// entries by ascending input-row index. Columns without entries become
    /// empty rows.
    pub fn transpose(&self) -> SparseMatrix {
        let mut row_ptr = vec![0usize; self.n_cols + 1];
        for &col in &self.col_idx {
            row_ptr[col + 1] += 1;
        }
        for j in 0..self.n_cols {
            row_ptr[j + 1] += row_ptr[j];
        }

        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![0.0; self.nnz()];
        for i in 0..self.n_rows {
            let (cols, vals) = self.row(i);
            for (&col, &value) in cols.iter().zip(vals.iter()) {
                let slot = next[col];
                col_idx[slot] = i;
                values[slot] = value;
                next[col] += 1;
            }
        }

        SparseMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;

    fn problem(rows: &[&[(usize, f64)]], n: usize) -> Problem {
        let x = rows.iter().map(|r| SparseVector::from_pairs(r)).collect();
        let y = vec![0; rows.len()];
        Problem::new(x, y).unwrap().with_dimension(n)
    }

    #[test]
    fn test_from_problem_appends_bias_column() {
        let p = problem(&[&[(1, 1.0), (3, 2.0)], &[(2, 5.0)]], 3).with_bias(0.5);
        let m = SparseMatrix::from_problem(&p);

        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 4);
        assert_eq!(m.row_pairs(0), vec![(0, 1.0), (2, 2.0), (3, 0.5)]);
        assert_eq!(m.row_pairs(1), vec![(1, 5.0), (3, 0.5)]);
        assert_eq!(m.row_norms_squared(), vec![5.25, 25.25]);
    }

    #[test]
    fn test_transpose_small() {
        // 0: (2,1) (4,1)
        // 1: (1,1)
        // 2: (3,1)
        // 3: (2,2) (3,1) (4,1)
        let p = problem(
            &[
                &[(2, 1.0), (4, 1.0)],
                &[(1, 1.0)],
                &[(3, 1.0)],
                &[(2, 2.0), (3, 1.0), (4, 1.0)],
            ],
            4,
        );
        let t = SparseMatrix::from_problem(&p).transpose();

        assert_eq!(t.n_rows(), 4);
        assert_eq!(t.n_cols(), 4);
        assert_eq!(t.row_pairs(0), vec![(1, 1.0)]);
        assert_eq!(t.row_pairs(1), vec![(0, 1.0), (3, 2.0)]);
        assert_eq!(t.row_pairs(2), vec![(2, 1.0), (3, 1.0)]);
        assert_eq!(t.row_pairs(3), vec![(0, 1.0), (3, 1.0)]);
    }

    #[test]
    fn test_transpose_with_empty_column() {
        let p = problem(
            &[
                &[(1, 7.0), (3, 3.0), (5, 2.0)],
                &[(2, 1.0), (4, 5.0), (5, 3.0), (7, 4.0), (8, 2.0)],
                &[(1, 9.0), (3, 1.0), (5, 1.0), (10, 7.0)],
                &[
                    (1, 2.0),
                    (2, 2.0),
                    (3, 9.0),
                    (4, 7.0),
                    (5, 8.0),
                    (6, 1.0),
                    (7, 5.0),
                    (8, 4.0),
                ],
                &[(3, 1.0), (10, 3.0)],
            ],
            10,
        );
        let t = SparseMatrix::from_problem(&p).transpose();

        let sizes: Vec<usize> = (0..t.n_rows()).map(|j| t.row(j).0.len()).collect();
        assert_eq!(sizes, vec![3, 2, 4, 2, 4, 1, 2, 2, 0, 2]);
        assert_eq!(t.row_pairs(0), vec![(0, 7.0), (2, 9.0), (3, 2.0)]);
        assert_eq!(t.row_pairs(2), vec![(0, 3.0), (2, 1.0), (3, 9.0), (4, 1.0)]);
        assert_eq!(t.row_pairs(4), vec![(0, 2.0), (1, 3.0), (2, 1.0), (3, 8.0)]);
        assert_eq!(t.row_pairs(9), vec![(2, 7.0), (4, 3.0)]);
    }

    #[test]
    fn test_double_transpose_restores_rows() {
        let m = SparseMatrix::from_rows(
            6,
            &[
                vec![(0, 2.0), (3, 1.0), (5, 4.0)],
                vec![],
                vec![(1, 9.0), (2, 7.0), (3, 3.0)],
                vec![(5, -1.0)],
            ],
        );
        let back = m.transpose().transpose();
        assert_eq!(back, m);
    }
}
