use nalgebra::{DMatrixView, DVector, DVectorView};

use super::{solve_normal_equations, LinReg, LinRegError};

/// Ordinary least squares, the maximum likelihood weights under gaussian noise.
/// Applied to a lagged stimulus design this yields the whitened spike-triggered average.
#[derive(Debug, Clone, Default)]
pub struct OrdinaryLeastSquares;

impl LinReg for OrdinaryLeastSquares {
    fn fit_readout<'a>(
        &self,
        design: &DMatrixView<'a, f64>,
        targets: &DVectorView<'a, f64>,
    ) -> Result<DVector<f64>, LinRegError> {
        solve_normal_equations(design, targets, None)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, Dim, Matrix};
    use nanorand::{Rng, WyRand};
    use round::round;

    use super::*;

    /// Least squares through a thin QR decomposition of the design itself
    fn qr_reference(design: &DMatrix<f64>, targets: &DVector<f64>) -> DVector<f64> {
        let qr = design.clone().qr();
        let qty = qr.q().transpose() * targets;
        qr.r().solve_upper_triangular(&qty).unwrap()
    }

    #[test]
    fn ordinary_least_squares_exact_fit() {
        if let Err(_) = pretty_env_logger::try_init() {}

        // Note the first column being just ones
        let design: DMatrix<f64> = Matrix::from_vec_generic(
            Dim::from_usize(4),
            Dim::from_usize(2),
            vec![1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 2.0, 3.0],
        );
        let targets = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);

        let mut weights = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, design.ncols()), &targets.rows(0, targets.nrows()))
            .unwrap();
        info!("weights: {}", weights);
        weights.iter_mut().for_each(|v| *v = round(*v, 9));

        assert_eq!(weights, DVector::from_vec(vec![1.0, 2.0]));
    }

    /// Offset column followed by uniform noise regressors scaled by `amplitude`
    fn noise_design(seed: u64, nrows: usize, ncols: usize, amplitude: f64) -> DMatrix<f64> {
        let mut rng = WyRand::new_seed(seed);
        DMatrix::from_fn(nrows, ncols, |_, j| {
            if j == 0 {
                1.0
            } else {
                amplitude * rng.generate::<f64>()
            }
        })
    }

    #[test]
    fn ordinary_least_squares_matches_qr() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let n = 200;
        let design = noise_design(0, n, 4, 1.0);
        let targets = DVector::from_fn(n, |i, _| ((i as f64) * 0.11).cos() * 3.0 + 0.5);

        let weights = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, design.ncols()), &targets.rows(0, n))
            .unwrap();
        let reference = qr_reference(&design, &targets);
        info!("weights: {}, reference: {}", weights, reference);

        for (w, r) in weights.iter().zip(reference.iter()) {
            assert!((w - r).abs() <= 1e-9 * r.abs().max(1.0), "{} vs {}", w, r);
        }
    }

    #[test]
    fn ordinary_least_squares_tiny_regressors_with_offset() {
        if let Err(_) = pretty_env_logger::try_init() {}

        // full rank, only the amplitude of the regressors is small
        let n = 2000;
        let design = noise_design(1, n, 5, 1e-8);
        let goal = DVector::from_vec(vec![0.5, 3e7, -1e7, 2e7, 4e6]);
        let mut rng = WyRand::new_seed(2);
        let targets = &design * &goal + DVector::from_fn(n, |_, _| 0.01 * (rng.generate::<f64>() - 0.5));

        let weights = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, design.ncols()), &targets.rows(0, n))
            .unwrap();
        let reference = qr_reference(&design, &targets);
        info!("weights: {}, reference: {}", weights, reference);

        for (w, r) in weights.iter().zip(reference.iter()) {
            assert!((w - r).abs() <= 1e-6 * r.abs().max(1.0), "{} vs {}", w, r);
        }
    }

    #[test]
    fn ordinary_least_squares_singular() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let design: DMatrix<f64> = DMatrix::from_element(10, 3, 0.0);
        let targets = DVector::from_element(10, 1.0);

        let res = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, 3), &targets.rows(0, 10));
        assert_eq!(res, Err(LinRegError::Singular { dim: 3 }));
    }

    #[test]
    fn ordinary_least_squares_collinear_columns() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let design = DMatrix::from_fn(10, 2, |i, _| i as f64 + 1.0);
        let targets = DVector::from_fn(10, |i, _| i as f64);

        let res = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, 2), &targets.rows(0, 10));
        assert_eq!(res, Err(LinRegError::Singular { dim: 2 }));
    }

    #[test]
    fn ordinary_least_squares_dimension_mismatch() {
        let design: DMatrix<f64> = DMatrix::from_element(4, 2, 1.0);
        let targets = DVector::from_element(3, 1.0);

        let res = OrdinaryLeastSquares
            .fit_readout(&design.columns(0, 2), &targets.rows(0, 3));
        assert_eq!(
            res,
            Err(LinRegError::DimensionMismatch {
                design_rows: 4,
                targets: 3
            })
        );
    }
}
