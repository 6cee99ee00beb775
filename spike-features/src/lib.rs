//! Turns raw recordings into regression inputs:
//! spike times into binned counts and a stimulus into a lagged design matrix

#[macro_use]
extern crate log;

mod binning;
mod design_matrix;

pub use binning::{bin_spikes, frame_interval, BinEdges, BinnedSpikeCounts};
pub use design_matrix::{lag_axis, DesignMatrix, DesignMatrixBuilder};
