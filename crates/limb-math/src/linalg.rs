//! Dynamically sized vectors and matrices, with the factorizations forward
//! dynamics needs. Generic over the scalar so mass matrices factor under
//! dual numbers too.

use crate::scalar::Scalar;
use std::ops::{Index, IndexMut};

/// A dynamically sized column vector.
#[derive(Clone, Debug)]
pub struct DVec<T> {
    data: Vec<T>,
}

impl<T: Scalar> DVec<T> {
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![T::ZERO; n],
        }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn from_fn(n: usize, mut f: impl FnMut(usize) -> T) -> Self {
        Self {
            data: (0..n).map(&mut f).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn copy_from_slice(&mut self, src: &[T]) {
        self.data.copy_from_slice(src);
    }

    pub fn dot(&self, other: &DVec<T>) -> T {
        debug_assert_eq!(self.len(), other.len());
        let mut acc = T::ZERO;
        for i in 0..self.len() {
            acc += self.data[i] * other.data[i];
        }
        acc
    }

    pub fn norm(&self) -> T {
        self.dot(self).sqrt()
    }
}

impl<T: Scalar> Index<usize> for DVec<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T: Scalar> IndexMut<usize> for DVec<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

/// A dynamically sized matrix, stored row-major.
#[derive(Clone, Debug)]
pub struct DMat<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Scalar> DMat<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::ZERO; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::ONE;
        }
        m
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                m[(i, j)] = f(i, j);
            }
        }
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Overwrite from a same-shape matrix.
    pub fn copy_from(&mut self, other: &DMat<T>) {
        debug_assert_eq!(self.rows, other.rows);
        debug_assert_eq!(self.cols, other.cols);
        self.data.copy_from_slice(&other.data);
    }

    pub fn mul_vec(&self, v: &DVec<T>) -> DVec<T> {
        let mut out = DVec::zeros(self.rows);
        self.mul_vec_into(v, &mut out);
        out
    }

    pub fn mul_vec_into(&self, v: &DVec<T>, out: &mut DVec<T>) {
        debug_assert_eq!(v.len(), self.cols);
        debug_assert_eq!(out.len(), self.rows);
        for i in 0..self.rows {
            let mut acc = T::ZERO;
            for j in 0..self.cols {
                acc += self[(i, j)] * v[j];
            }
            out[i] = acc;
        }
    }

    pub fn mul_mat(&self, other: &DMat<T>) -> DMat<T> {
        debug_assert_eq!(self.cols, other.rows);
        let mut out = DMat::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                for j in 0..other.cols {
                    out[(i, j)] += a * other[(k, j)];
                }
            }
        }
        out
    }

    pub fn transpose(&self) -> DMat<T> {
        DMat::from_fn(self.cols, self.rows, |i, j| self[(j, i)])
    }
}

impl<T: Scalar> Index<(usize, usize)> for DMat<T> {
    type Output = T;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i * self.cols + j]
    }
}

impl<T: Scalar> IndexMut<(usize, usize)> for DMat<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i * self.cols + j]
    }
}

/// In-place Cholesky factorization of a symmetric matrix.
///
/// On success the lower triangle of `a` holds `L` with `A = L L^T`; the
/// strict upper triangle is left untouched. Returns `false` on a
/// non-positive pivot (the matrix is not positive definite).
pub fn cholesky_in_place<T: Scalar>(a: &mut DMat<T>) -> bool {
    let n = a.rows();
    debug_assert_eq!(n, a.cols());
    for j in 0..n {
        let mut d = a[(j, j)];
        for k in 0..j {
            d -= a[(j, k)] * a[(j, k)];
        }
        if !(d > T::ZERO) {
            return false;
        }
        let d = d.sqrt();
        a[(j, j)] = d;
        let inv = d.recip();
        for i in (j + 1)..n {
            let mut s = a[(i, j)];
            for k in 0..j {
                s -= a[(i, k)] * a[(j, k)];
            }
            a[(i, j)] = s * inv;
        }
    }
    true
}

/// Solve `L L^T x = b` in place given the factor from [`cholesky_in_place`].
pub fn cholesky_solve_in_place<T: Scalar>(l: &DMat<T>, x: &mut DVec<T>) {
    let n = l.rows();
    debug_assert_eq!(x.len(), n);
    // Forward: L y = b.
    for i in 0..n {
        let mut s = x[i];
        for k in 0..i {
            s -= l[(i, k)] * x[k];
        }
        x[i] = s / l[(i, i)];
    }
    // Backward: L^T x = y.
    for i in (0..n).rev() {
        let mut s = x[i];
        for k in (i + 1)..n {
            s -= l[(k, i)] * x[k];
        }
        x[i] = s / l[(i, i)];
    }
}

/// In-place LDL^T factorization (no pivoting), the fallback for symmetric
/// matrices that are indefinite or barely positive.
///
/// On success the strict lower triangle of `a` holds the unit-lower factor
/// and `d` the diagonal. Returns `false` when a pivot's magnitude falls
/// below `tol`.
pub fn ldlt_in_place<T: Scalar>(a: &mut DMat<T>, d: &mut DVec<T>, tol: f64) -> bool {
    let n = a.rows();
    debug_assert_eq!(n, a.cols());
    debug_assert_eq!(d.len(), n);
    for j in 0..n {
        let mut dj = a[(j, j)];
        for k in 0..j {
            dj -= a[(j, k)] * a[(j, k)] * d[k];
        }
        if dj.abs().value() < tol {
            return false;
        }
        d[j] = dj;
        let inv = dj.recip();
        for i in (j + 1)..n {
            let mut s = a[(i, j)];
            for k in 0..j {
                s -= a[(i, k)] * a[(j, k)] * d[k];
            }
            a[(i, j)] = s * inv;
        }
    }
    true
}

/// Solve `L D L^T x = b` in place given the factors from [`ldlt_in_place`].
pub fn ldlt_solve_in_place<T: Scalar>(l: &DMat<T>, d: &DVec<T>, x: &mut DVec<T>) {
    let n = l.rows();
    debug_assert_eq!(x.len(), n);
    for i in 0..n {
        let mut s = x[i];
        for k in 0..i {
            s -= l[(i, k)] * x[k];
        }
        x[i] = s;
    }
    for i in 0..n {
        x[i] /= d[i];
    }
    for i in (0..n).rev() {
        let mut s = x[i];
        for k in (i + 1)..n {
            s -= l[(k, i)] * x[k];
        }
        x[i] = s;
    }
}
