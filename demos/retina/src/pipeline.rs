use common::{
    evaluation::{
        aic, fraction_variance_explained, poisson_log_likelihood, predict_linear,
        predict_poisson_rate, single_spike_information,
    },
    EncodingModel, Error, GlmFit, LinearFilter, Result,
};
use linear_encoders::LinearEstimator;
use nalgebra::DVector;
use poisson_glm::{GlmParams, PoissonGlm};
use spike_features::{bin_spikes, frame_interval, lag_axis, BinEdges, BinnedSpikeCounts, DesignMatrixBuilder};

use crate::bundle::DataBundle;

/// What to fit
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    /// Number of stimulus frames in the history window
    pub(crate) num_lags: usize,
    /// Index of the analyzed unit
    pub(crate) unit: usize,
    pub(crate) glm: GlmParams,
}

/// Goodness of fit of the poisson GLM
#[derive(Debug, Clone)]
pub(crate) struct PoissonScores {
    pub(crate) log_likelihood: f64,
    pub(crate) aic: f64,
    pub(crate) bits_per_spike: f64,
    pub(crate) fraction_variance_explained: f64,
}

/// Every artifact of one pipeline run. Nothing is mutated once produced.
#[derive(Debug, Clone)]
pub(crate) struct PipelineOutput {
    /// Frame interval in seconds
    pub(crate) dt: f64,
    pub(crate) counts: BinnedSpikeCounts,
    /// Time of each filter tap relative to the current frame
    pub(crate) lag_axis: DVector<f64>,
    pub(crate) sta: LinearFilter,
    pub(crate) whitened_sta: LinearFilter,
    pub(crate) least_squares: LinearFilter,
    pub(crate) glm: GlmFit,
    /// Predictions of the whitened STA, no offset
    pub(crate) pred_whitened: DVector<f64>,
    /// Predictions of least squares with offset
    pub(crate) pred_least_squares: DVector<f64>,
    /// Poisson rate of the GLM, in spikes per frame
    pub(crate) pred_glm: DVector<f64>,
    pub(crate) fve_whitened: f64,
    pub(crate) fve_least_squares: f64,
    pub(crate) glm_scores: PoissonScores,
}

/// Run binning, design construction, the linear estimators, the poisson GLM and the evaluation
pub(crate) fn run_pipeline(bundle: &DataBundle, config: &PipelineConfig) -> Result<PipelineOutput> {
    let spike_times = bundle.spike_times.get(config.unit).ok_or_else(|| {
        Error::InvalidInput(format!(
            "unit {} requested but only {} units recorded",
            config.unit,
            bundle.spike_times.len()
        ))
    })?;

    let dt = frame_interval(&bundle.stimulus_times)?;
    let edges = BinEdges::uniform(dt, bundle.stimulus.len())?;
    let counts = bin_spikes(spike_times, &edges)?;
    info!(
        "unit {}: {} of {} spikes in {} bins of {:.4}s",
        config.unit,
        counts.total(),
        spike_times.len(),
        counts.len(),
        dt
    );

    let builder = DesignMatrixBuilder::new(config.num_lags);
    let design = builder.build(&bundle.stimulus)?;
    let design_offset = builder.with_offset(true).build(&bundle.stimulus)?;

    let estimator = LinearEstimator::default();
    let sta = estimator.compute_sta(&design, &counts)?;
    let whitened_sta = estimator.compute_whitened_filter(&design, &counts, false)?;
    let least_squares = estimator.compute_whitened_filter(&design_offset, &counts, true)?;

    let glm = match PoissonGlm::new(config.glm.clone()).fit(&design, &counts) {
        Ok(fit) => fit,
        Err(Error::Convergence { iterations, fit }) => {
            warn!(
                "poisson GLM did not converge within {} iterations, continuing with the best available fit",
                iterations
            );
            *fit
        }
        Err(e) => return Err(e),
    };

    let targets = counts.to_targets();
    let pred_whitened = predict_linear(&design.lags(), &whitened_sta)?;
    let pred_least_squares = predict_linear(&design_offset.lags(), &least_squares)?;
    let pred_glm = predict_poisson_rate(&design.lags(), &glm)?;

    let fve_whitened = fraction_variance_explained(&targets, &pred_whitened)?;
    let fve_least_squares = fraction_variance_explained(&targets, &pred_least_squares)?;

    let log_likelihood = poisson_log_likelihood(&targets, &pred_glm)?;
    let glm_scores = PoissonScores {
        log_likelihood,
        aic: aic(log_likelihood, glm.num_params()),
        bits_per_spike: single_spike_information(&targets, &pred_glm)?,
        fraction_variance_explained: fraction_variance_explained(&targets, &pred_glm)?,
    };

    Ok(PipelineOutput {
        dt,
        counts,
        lag_axis: lag_axis(config.num_lags, dt),
        sta,
        whitened_sta,
        least_squares,
        glm,
        pred_whitened,
        pred_least_squares,
        pred_glm,
        fve_whitened,
        fve_least_squares,
        glm_scores,
    })
}

#[cfg(test)]
mod tests {
    use poisson_glm::PenaltyStrength;

    use super::*;

    fn config(unit: usize) -> PipelineConfig {
        PipelineConfig {
            num_lags: 20,
            unit,
            glm: GlmParams {
                penalty_strength: PenaltyStrength::Path(vec![0.01, 0.001]),
                ..Default::default()
            },
        }
    }

    #[test]
    fn pipeline_on_synthetic_data() {
        let bundle = DataBundle::synthetic(Some(0), 10_000, 0.01, 2);
        let out = run_pipeline(&bundle, &config(0)).unwrap();

        assert_eq!(out.counts.total(), bundle.spike_times[0].len() as u64);
        assert_eq!(out.sta.filter.len(), 20);
        assert_eq!(out.glm.filter.len(), 20);
        assert_eq!(out.pred_glm.len(), 10_000);
        assert_eq!(round::round(out.lag_axis[19], 9), 0.0);

        // least squares with offset is never worse than without on the training set
        assert!(out.fve_least_squares >= out.fve_whitened - 1e-12);
        assert!(out.fve_least_squares > 0.0);
        assert!(out.glm_scores.bits_per_spike > 0.0);
        assert!(out.pred_glm.iter().all(|r| *r > 0.0));
    }

    #[test]
    fn pipeline_continues_with_unconverged_glm() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let bundle = DataBundle::synthetic(Some(3), 3000, 0.01, 1);
        let mut config = config(0);
        config.glm.penalty_strength = PenaltyStrength::Single(0.0);
        config.glm.max_iterations = 1;
        let out = run_pipeline(&bundle, &config).unwrap();

        assert!(!out.glm.converged);
        assert_eq!(out.glm.iterations, 1);
        assert_eq!(out.glm.path.len(), 1);
        assert!(out.pred_glm.iter().all(|r| r.is_finite() && *r > 0.0));
        assert!(out.glm_scores.log_likelihood.is_finite());
    }

    #[test]
    fn pipeline_unknown_unit() {
        let bundle = DataBundle::synthetic(Some(1), 100, 0.01, 1);

        assert!(matches!(run_pipeline(&bundle, &config(3)), Err(Error::InvalidInput(_))));
    }
}
