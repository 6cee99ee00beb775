//! Linear encoding models: the spike-triggered average and its whitened,
//! least squares counterpart

#[macro_use]
extern crate log;

mod linear_estimator;

pub use linear_estimator::LinearEstimator;

use common::{Error, Result};
use spike_features::{BinnedSpikeCounts, DesignMatrix};

pub(crate) fn check_alignment(design: &DesignMatrix, counts: &BinnedSpikeCounts) -> Result<()> {
    if design.nrows() != counts.len() {
        return Err(Error::InvalidInput(format!(
            "design has {} bins but there are {} spike counts",
            design.nrows(),
            counts.len()
        )));
    }
    Ok(())
}
