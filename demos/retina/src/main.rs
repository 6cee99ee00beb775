#[macro_use]
extern crate log;

use std::{fs::create_dir_all, path::PathBuf, time::Instant};

use dialoguer::{theme::ColorfulTheme, Select};
use glm_plot::{plot_filters, plot_predictions, to_series, Series};
use nalgebra::DVector;
use poisson_glm::GlmParams;
use thiserror::Error;

mod bundle;
mod pipeline;

use bundle::DataBundle;
use pipeline::{run_pipeline, PipelineConfig, PipelineOutput};

/// Number of stimulus frames used for prediction
const NUM_LAGS: usize = 25;
/// Number of bins shown in the prediction plot
const PLOT_BINS: usize = 300;
const SEED: Option<u64> = Some(0);
const SYNTHETIC_FRAMES: usize = 20_000;
const SYNTHETIC_DT: f64 = 1.0 / 120.0;
const SYNTHETIC_UNITS: usize = 4;

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not parse data bundle: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid data bundle: {0}")]
    Bundle(String),

    #[error(transparent)]
    Pipeline(#[from] common::Error),

    #[error("plotting failed: {0}")]
    Plot(String),
}

pub(crate) fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunError> {
    // The bundle path is the first argument, without one the data is simulated
    let bundle = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => DataBundle::load(&path)?,
        None => DataBundle::synthetic(SEED, SYNTHETIC_FRAMES, SYNTHETIC_DT, SYNTHETIC_UNITS),
    };

    let units: Vec<String> = bundle
        .spike_times
        .iter()
        .enumerate()
        .map(|(i, t)| format!("unit {} ({} spikes)", i, t.len()))
        .collect();
    let unit = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select unit")
        .items(&units)
        .default(0)
        .interact()?;

    let config = PipelineConfig {
        num_lags: NUM_LAGS,
        unit,
        glm: GlmParams::default(),
    };

    let t0 = Instant::now();
    let out = run_pipeline(&bundle, &config)?;
    info!("pipeline done in {}ms", t0.elapsed().as_millis());

    report(&out);

    create_dir_all("img")?;
    plot(&out, unit)?;

    Ok(())
}

fn report(out: &PipelineOutput) {
    info!("sta: {}", out.sta.filter.transpose());
    info!("whitened sta: {}", out.whitened_sta.filter.transpose());
    info!(
        "least squares: offset {:.5}, filter {}",
        out.least_squares.offset.unwrap_or(0.0),
        out.least_squares.filter.transpose()
    );
    info!(
        "poisson GLM: constant {:.5}, penalty strength {}, filter {}",
        out.glm.constant,
        out.glm.penalty_strength,
        out.glm.filter.transpose()
    );
    for p in out.glm.path.iter() {
        debug!(
            "penalty strength {:.4}: pseudo-R² {:.5}, {} iterations, converged: {}",
            p.penalty_strength, p.pseudo_r2, p.iterations, p.converged
        );
    }

    info!("fraction of variance explained, whitened sta: {:.4}", out.fve_whitened);
    info!("fraction of variance explained, least squares: {:.4}", out.fve_least_squares);
    info!(
        "poisson GLM: fraction of variance explained {:.4}, log-likelihood {:.2}, AIC {:.2}, {:.4} bits/spike",
        out.glm_scores.fraction_variance_explained,
        out.glm_scores.log_likelihood,
        out.glm_scores.aic,
        out.glm_scores.bits_per_spike
    );
}

/// Filters scaled to unit length so their shapes can share an axis
fn unit_norm(filter: &DVector<f64>) -> Vec<f64> {
    let norm = filter.norm();
    if norm > 0.0 {
        (filter / norm).iter().cloned().collect()
    } else {
        filter.iter().cloned().collect()
    }
}

fn plot(out: &PipelineOutput, unit: usize) -> Result<(), RunError> {
    let lags = out.lag_axis.as_slice();
    let filters: Vec<(&str, Series)> = vec![
        ("sta", to_series(lags, &unit_norm(&out.sta.filter))),
        ("whitened sta", to_series(lags, &unit_norm(&out.whitened_sta.filter))),
        ("least squares", to_series(lags, &unit_norm(&out.least_squares.filter))),
        ("poisson GLM", to_series(lags, &unit_norm(&out.glm.filter))),
    ];
    plot_filters(&filters, &format!("img/filters_unit_{}.png", unit), (1600, 1000))
        .map_err(|e| RunError::Plot(e.to_string()))?;

    let n = PLOT_BINS.min(out.counts.len());
    let times: Vec<f64> = (0..n).map(|i| i as f64 * out.dt).collect();
    let counts: Vec<f64> = out.counts.counts()[..n].iter().map(|c| *c as f64).collect();
    let predictions: Vec<(&str, Series)> = vec![
        ("whitened sta", to_series(&times, &out.pred_whitened.as_slice()[..n])),
        ("least squares", to_series(&times, &out.pred_least_squares.as_slice()[..n])),
        ("poisson GLM", to_series(&times, &out.pred_glm.as_slice()[..n])),
    ];
    plot_predictions(
        &to_series(&times, &counts),
        &predictions,
        &format!("img/predictions_unit_{}.png", unit),
        (2160, 1000),
    )
    .map_err(|e| RunError::Plot(e.to_string()))?;

    Ok(())
}
