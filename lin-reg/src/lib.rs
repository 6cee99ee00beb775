#[macro_use]
extern crate log;

use nalgebra::{Cholesky, DMatrix, DMatrixView, DVector, DVectorView};
use thiserror::Error;

mod ordinary_least_squares;
mod tikhonov_regularization;

pub use ordinary_least_squares::OrdinaryLeastSquares;
pub use tikhonov_regularization::TikhonovRegularization;

/// Multiple of `EPSILON * dim` below which the scaled gram matrix counts as rank deficient
const RCOND_FACTOR: f64 = 8.0;

/// Errors raised while solving a linear regression problem
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinRegError {
    /// The design has no rows or no columns
    #[error("design matrix is empty ({nrows}x{ncols})")]
    Empty { nrows: usize, ncols: usize },

    /// Number of design rows and targets disagree
    #[error("design has {design_rows} rows but there are {targets} targets")]
    DimensionMismatch { design_rows: usize, targets: usize },

    /// The (possibly regularized) normal equations have no unique solution
    #[error("normal equations of dimension {dim} are singular")]
    Singular { dim: usize },
}

/// Generic way of performing linear regression and fitting the weight vector
pub trait LinReg: Clone {
    /// Fit a weight vector, mapping the design rows onto the targets
    ///
    /// # Parameters
    /// design: One row per observation. If an offset is wanted, the first column should be just 1s
    /// targets: One value per design row
    fn fit_readout<'a>(
        &self,
        design: &DMatrixView<'a, f64>,
        targets: &DVectorView<'a, f64>,
    ) -> Result<DVector<f64>, LinRegError>;
}

/// Solves `(X^T X + diag(ridge)) w = X^T y` through a Cholesky factorization
/// of the unit diagonal scaled gram matrix. The gram matrix is never inverted explicitly.
pub(crate) fn solve_normal_equations(
    design: &DMatrixView<f64>,
    targets: &DVectorView<f64>,
    ridge: Option<&DVector<f64>>,
) -> Result<DVector<f64>, LinRegError> {
    if design.nrows() == 0 || design.ncols() == 0 {
        return Err(LinRegError::Empty {
            nrows: design.nrows(),
            ncols: design.ncols(),
        });
    }
    if design.nrows() != targets.nrows() {
        return Err(LinRegError::DimensionMismatch {
            design_rows: design.nrows(),
            targets: targets.nrows(),
        });
    }

    let dim = design.ncols();
    let mut gram: DMatrix<f64> = design.tr_mul(design);
    if let Some(ridge) = ridge {
        for (i, r) in ridge.iter().enumerate() {
            gram[(i, i)] += *r;
        }
    }
    let moments: DVector<f64> = design.tr_mul(targets);

    // Scale to unit diagonal. A zero diagonal entry is a zero column.
    let diag = gram.diagonal();
    if diag.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(LinRegError::Singular { dim });
    }
    let inv_sqrt: DVector<f64> = diag.map(|d| 1.0 / d.sqrt());
    let scaled = DMatrix::from_fn(dim, dim, |i, j| gram[(i, j)] * inv_sqrt[i] * inv_sqrt[j]);

    let chol = Cholesky::new(scaled).ok_or(LinRegError::Singular { dim })?;

    // A positive pivot that is tiny relative to the largest one means the
    // gram matrix is rank deficient up to rounding.
    let l = chol.l_dirty();
    let (min_pivot, max_pivot) = (0..dim).fold((f64::MAX, 0.0_f64), |(lo, hi), i| {
        let p = l[(i, i)].abs();
        (lo.min(p), hi.max(p))
    });
    let rcond = (min_pivot / max_pivot).powi(2);
    debug!("cholesky pivots: min {}, max {}, rcond {:e}", min_pivot, max_pivot, rcond);
    if !rcond.is_finite() || rcond < RCOND_FACTOR * f64::EPSILON * dim as f64 {
        return Err(LinRegError::Singular { dim });
    }

    let z = chol.solve(&moments.component_mul(&inv_sqrt));

    Ok(z.component_mul(&inv_sqrt))
}
