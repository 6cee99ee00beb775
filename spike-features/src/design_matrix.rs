use common::{Error, Result};
use nalgebra::{DMatrix, DMatrixView, DVector};

/// The lagged stimulus regressors. Row `i` holds the stimulus history ending at bin `i`,
/// oldest sample first, optionally preceded by a column of ones.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    matrix: DMatrix<f64>,
    num_lags: usize,
    has_offset: bool,
}

impl DesignMatrix {
    /// The full matrix, including the offset column if present
    #[inline(always)]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    #[inline(always)]
    pub fn num_lags(&self) -> usize {
        self.num_lags
    }

    #[inline(always)]
    pub fn has_offset(&self) -> bool {
        self.has_offset
    }

    /// Number of time bins
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    /// View of all columns
    pub fn full(&self) -> DMatrixView<'_, f64> {
        self.matrix.columns(0, self.matrix.ncols())
    }

    /// View of the lagged stimulus columns only
    pub fn lags(&self) -> DMatrixView<'_, f64> {
        self.matrix.columns(usize::from(self.has_offset), self.num_lags)
    }
}

/// Builds the causal, zero padded design matrix of a stimulus
#[derive(Debug, Clone)]
pub struct DesignMatrixBuilder {
    num_lags: usize,
    offset: bool,
}

impl DesignMatrixBuilder {
    /// Create a new builder
    ///
    /// # Arguments:
    /// num_lags: Length of the stimulus history window, in bins
    pub fn new(num_lags: usize) -> Self {
        Self {
            num_lags,
            offset: false,
        }
    }

    /// Prepend a column of ones holding the constant offset
    pub fn with_offset(mut self, offset: bool) -> Self {
        self.offset = offset;
        self
    }

    fn check(&self, stimulus: &[f64]) -> Result<()> {
        if self.num_lags == 0 {
            return Err(Error::InvalidInput("history window must span at least 1 bin".to_string()));
        }
        if stimulus.is_empty() {
            return Err(Error::InvalidInput("stimulus is empty".to_string()));
        }
        Ok(())
    }

    /// Construct the design matrix in closed form, as a hankel matrix of the zero padded stimulus.
    /// Entry `(i, j)` is `padded[i + j]`, so the first column is the padded stimulus
    /// and the last column the stimulus itself.
    pub fn build(&self, stimulus: &[f64]) -> Result<DesignMatrix> {
        self.check(stimulus)?;

        let k = self.num_lags;
        let mut padded = vec![0.0; k - 1];
        padded.extend_from_slice(stimulus);

        let lags = DMatrix::from_fn(stimulus.len(), k, |i, j| padded[i + j]);
        debug!("hankel design of {} bins x {} lags", lags.nrows(), lags.ncols());

        Ok(self.finish(lags))
    }

    /// Construct the design matrix row by row, each row holding the `k` most recent samples
    pub fn build_explicit(&self, stimulus: &[f64]) -> Result<DesignMatrix> {
        self.check(stimulus)?;

        let k = self.num_lags;
        let mut lags: DMatrix<f64> = DMatrix::from_element(stimulus.len(), k, 0.0);
        for i in 0..stimulus.len() {
            for j in 0..k {
                // sample at i - (k - 1) + j, zero before the recording started
                if let Some(t) = (i + j).checked_sub(k - 1) {
                    lags[(i, j)] = stimulus[t];
                }
            }
        }

        Ok(self.finish(lags))
    }

    fn finish(&self, lags: DMatrix<f64>) -> DesignMatrix {
        let matrix = if self.offset {
            lags.insert_column(0, 1.0)
        } else {
            lags
        };

        DesignMatrix {
            matrix,
            num_lags: self.num_lags,
            has_offset: self.offset,
        }
    }
}

/// Time of each design column relative to the current bin, oldest lag first.
/// The last entry is always 0.
pub fn lag_axis(num_lags: usize, dt: f64) -> DVector<f64> {
    DVector::from_fn(num_lags, |j, _| (j as f64 - (num_lags as f64 - 1.0)) * dt)
}
