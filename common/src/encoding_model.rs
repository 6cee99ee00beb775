use nalgebra::{DMatrixView, DVector};

use crate::{Error, Link, Result};

/// The EncodingModel trait, implemented by every fitted model mapping a
/// lagged stimulus history onto an expected spike count per bin
pub trait EncodingModel {
    /// The constant added to the linear predictor
    fn constant(&self) -> f64;

    /// The temporal filter, one weight per lag, oldest lag first
    fn filter(&self) -> &DVector<f64>;

    /// The inverse link applied to the linear predictor
    fn link(&self) -> Link;

    /// Number of free parameters, used for information criteria
    fn num_params(&self) -> usize;

    /// Predict the expected spike count of every bin
    ///
    /// # Arguments:
    /// lags: The lagged stimulus columns of the design matrix, without any offset column
    fn predict<'a>(&self, lags: &DMatrixView<'a, f64>) -> Result<DVector<f64>> {
        if lags.ncols() != self.filter().len() {
            return Err(Error::InvalidInput(format!(
                "design has {} lag columns but the filter has {} taps",
                lags.ncols(),
                self.filter().len()
            )));
        }

        let mut pred = lags * self.filter();
        pred.add_scalar_mut(self.constant());
        self.link().activate(pred.as_mut_slice());

        Ok(pred)
    }
}

/// A linear filter, as produced by the spike-triggered average or least squares.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFilter {
    /// Filter weights, oldest lag first
    pub filter: DVector<f64>,
    /// Constant offset, if the model was fit with one
    pub offset: Option<f64>,
}

impl EncodingModel for LinearFilter {
    #[inline(always)]
    fn constant(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }

    #[inline(always)]
    fn filter(&self) -> &DVector<f64> {
        &self.filter
    }

    #[inline(always)]
    fn link(&self) -> Link {
        Link::Identity
    }

    #[inline(always)]
    fn num_params(&self) -> usize {
        self.filter.len() + usize::from(self.offset.is_some())
    }
}

/// One candidate of a regularization path
#[derive(Debug, Clone, PartialEq)]
pub struct PathPoint {
    /// The penalty strength of this candidate
    pub penalty_strength: f64,
    /// Training set pseudo-R² of the candidate
    pub pseudo_r2: f64,
    /// Iterations the solver used
    pub iterations: usize,
    /// Whether the solver met its tolerance
    pub converged: bool,
}

/// A fitted poisson generalized linear model with exponential link
#[derive(Debug, Clone, PartialEq)]
pub struct GlmFit {
    /// The unpenalized constant of the linear predictor
    pub constant: f64,
    /// Filter coefficients, oldest lag first
    pub filter: DVector<f64>,
    /// Penalty strength of the selected candidate
    pub penalty_strength: f64,
    /// Every evaluated candidate, in the order they were fit
    pub path: Vec<PathPoint>,
    /// Iterations spent on the selected candidate
    pub iterations: usize,
    /// Whether the selected candidate met the solver tolerance
    pub converged: bool,
}

impl EncodingModel for GlmFit {
    #[inline(always)]
    fn constant(&self) -> f64 {
        self.constant
    }

    #[inline(always)]
    fn filter(&self) -> &DVector<f64> {
        &self.filter
    }

    #[inline(always)]
    fn link(&self) -> Link {
        Link::Exp
    }

    #[inline(always)]
    fn num_params(&self) -> usize {
        self.filter.len() + 1
    }
}
