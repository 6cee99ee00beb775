//! Presentation layer: renders fitted filters and predictions to png files

#[macro_use]
extern crate log;

mod plot;

pub use plot::{plot_filters, plot_predictions};

pub type Series = Vec<(f64, f64)>;

/// Result of a plotting call
pub type PlotResult = Result<(), Box<dyn std::error::Error>>;

/// Pair up x and y values into a plottable series
pub fn to_series(xs: &[f64], ys: &[f64]) -> Series {
    xs.iter().cloned().zip(ys.iter().cloned()).collect()
}
