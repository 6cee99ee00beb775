use common::{Error, LinearFilter, Result};
use lin_reg::{LinReg, OrdinaryLeastSquares};
use spike_features::{BinnedSpikeCounts, DesignMatrix};

use crate::check_alignment;

/// Estimates linear filters from a lagged design matrix and binned spike counts
#[derive(Debug, Clone)]
pub struct LinearEstimator<R> {
    regressor: R,
}

impl Default for LinearEstimator<OrdinaryLeastSquares> {
    fn default() -> Self {
        Self::new(OrdinaryLeastSquares)
    }
}

impl<R> LinearEstimator<R>
where
    R: LinReg,
{
    /// Create a new linear estimator
    ///
    /// # Arguments:
    /// regressor: The linear regression solving the normal equations of the whitened filter
    pub fn new(regressor: R) -> Self {
        Self { regressor }
    }

    /// The spike-triggered average, `X^T y / sum(y)`.
    /// An offset column in the design is ignored.
    pub fn compute_sta(
        &self,
        design: &DesignMatrix,
        counts: &BinnedSpikeCounts,
    ) -> Result<LinearFilter> {
        check_alignment(design, counts)?;

        let num_spikes = counts.total();
        if num_spikes == 0 {
            return Err(Error::DegenerateInput(
                "no spikes, the spike-triggered average is undefined".to_string(),
            ));
        }

        let targets = counts.to_targets();
        let filter = design.lags().tr_mul(&targets) / num_spikes as f64;
        info!("sta over {} spikes and {} lags", num_spikes, filter.len());

        Ok(LinearFilter {
            filter,
            offset: None,
        })
    }

    /// The whitened spike-triggered average: the least squares solution of `X^T X w = X^T y`.
    ///
    /// # Arguments:
    /// design: The lagged stimulus. Must carry the ones column exactly if `include_offset`
    /// counts: The binned spike counts, one per design row
    /// include_offset: Whether the first coefficient is a constant offset
    pub fn compute_whitened_filter(
        &self,
        design: &DesignMatrix,
        counts: &BinnedSpikeCounts,
        include_offset: bool,
    ) -> Result<LinearFilter> {
        check_alignment(design, counts)?;
        if design.has_offset() != include_offset {
            return Err(Error::InvalidInput(format!(
                "include_offset is {} but the design {} an offset column",
                include_offset,
                if design.has_offset() { "has" } else { "lacks" }
            )));
        }

        let targets = counts.to_targets();
        let weights = self
            .regressor
            .fit_readout(&design.full(), &targets.rows(0, targets.nrows()))?;
        debug!("whitened weights: {}", weights);

        let filter = if include_offset {
            LinearFilter {
                filter: weights.rows(1, design.num_lags()).clone_owned(),
                offset: Some(weights[0]),
            }
        } else {
            LinearFilter {
                filter: weights,
                offset: None,
            }
        };
        info!(
            "whitened filter over {} lags, offset: {:?}",
            filter.filter.len(),
            filter.offset
        );

        Ok(filter)
    }
}
