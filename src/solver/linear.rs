//! Dense LU factorization for the Newton update.

/// Row-major dense system `A x = b` solved by LU with partial pivoting.
#[derive(Debug, Clone)]
pub struct DenseLu {
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A (row-major, L below the diagonal, unit diagonal implied)
    lu: Vec<f64>,
    /// Row permutation applied during factorization
    pivots: Vec<usize>,
}

impl DenseLu {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            lu: vec![0.0; size * size],
            pivots: vec![0; size],
        }
    }

    /// Factor `a` in place of the previous factorization.
    ///
    /// Returns the column of the first zero (or non-finite) pivot on failure.
    pub fn factor(&mut self, a: &[f64]) -> Result<(), usize> {
        let n = self.size;
        self.lu.copy_from_slice(a);

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val == 0.0 || !max_val.is_finite() {
                return Err(k);
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        Ok(())
    }

    /// Solve with the current factorization. `b` is overwritten with `x`.
    pub fn solve(&self, b: &mut [f64]) {
        let n = self.size;

        // Apply pivot permutation
        let rhs = b.to_vec();
        for i in 0..n {
            b[i] = rhs[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                b[i] -= self.lu[i * n + j] * b[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                b[i] -= self.lu[i * n + j] * b[j];
            }
            b[i] /= self.lu[i * n + i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_with_pivoting() {
        // [0 1; 2 1] x = [3; 5] -> x = [1, 3]
        let mut lu = DenseLu::new(2);
        lu.factor(&[0.0, 1.0, 2.0, 1.0]).unwrap();
        let mut b = [3.0, 5.0];
        lu.solve(&mut b);
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(b[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_reports_column() {
        let mut lu = DenseLu::new(2);
        assert_eq!(lu.factor(&[1.0, 2.0, 2.0, 4.0]), Err(1));
    }

    #[test]
    fn test_three_by_three() {
        // 2x + y - z = 8, -3x - y + 2z = -11, -2x + y + 2z = -3 -> (2, 3, -1)
        let a = [2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0];
        let mut lu = DenseLu::new(3);
        lu.factor(&a).unwrap();
        let mut b = [8.0, -11.0, -3.0];
        lu.solve(&mut b);
        assert_relative_eq!(b[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(b[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(b[2], -1.0, epsilon = 1e-12);
    }
}
