use nalgebra::{DMatrixView, DVector, DVectorView};

use super::{solve_normal_equations, LinReg, LinRegError};

/// Tikhonov regularization aka ridge regression
/// It is particularly useful to mitigate the problem of multicollinearity in
/// linear regression
#[derive(Debug, Clone)]
pub struct TikhonovRegularization {
    /// Ridge parameter
    pub regularization_coeff: f64,
    /// The first design column holds the offset and is left unpenalized
    pub unpenalized_offset: bool,
}

impl LinReg for TikhonovRegularization {
    fn fit_readout<'a>(
        &self,
        design: &DMatrixView<'a, f64>,
        targets: &DVectorView<'a, f64>,
    ) -> Result<DVector<f64>, LinRegError> {
        let mut ridge = DVector::from_element(design.ncols(), self.regularization_coeff);
        if self.unpenalized_offset && design.ncols() > 0 {
            ridge[0] = 0.0;
        }

        solve_normal_equations(design, targets, Some(&ridge))
    }
}
