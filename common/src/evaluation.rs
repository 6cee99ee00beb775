//! Training set predictions and goodness of fit measures

use std::f64::consts::LN_2;

use nalgebra::{DMatrixView, DVector};

use crate::{EncodingModel, Error, GlmFit, LinearFilter, Result};

/// Predict spike counts of a linear model: `offset + lags * filter`
pub fn predict_linear<'a>(lags: &DMatrixView<'a, f64>, f: &LinearFilter) -> Result<DVector<f64>> {
    f.predict(lags)
}

/// Predict the poisson rate of a GLM: `exp(constant + lags * filter)`.
///
/// The rate is in expected spikes per bin, the same unit as the binned counts
/// and the linear predictions. Divide by the bin width to obtain spikes per second.
pub fn predict_poisson_rate<'a>(lags: &DMatrixView<'a, f64>, g: &GlmFit) -> Result<DVector<f64>> {
    g.predict(lags)
}

fn check_lengths(observed: &DVector<f64>, predicted: &DVector<f64>) -> Result<()> {
    if observed.len() != predicted.len() {
        return Err(Error::InvalidInput(format!(
            "{} observations but {} predictions",
            observed.len(),
            predicted.len()
        )));
    }
    if observed.is_empty() {
        return Err(Error::InvalidInput("no observations".to_string()));
    }
    Ok(())
}

/// Mean of the squared residuals
pub fn mean_squared_error(observed: &DVector<f64>, predicted: &DVector<f64>) -> Result<f64> {
    check_lengths(observed, predicted)?;

    Ok((observed - predicted).norm_squared() / observed.len() as f64)
}

/// `1 - mse(y, y_hat) / mse(y, mean(y))`
pub fn fraction_variance_explained(
    observed: &DVector<f64>,
    predicted: &DVector<f64>,
) -> Result<f64> {
    let mse = mean_squared_error(observed, predicted)?;
    let mean = observed.mean();
    let baseline = observed.map(|v| (v - mean).powi(2)).mean();
    if baseline == 0.0 {
        return Err(Error::DegenerateInput(
            "observations have zero variance, fraction of variance explained is undefined"
                .to_string(),
        ));
    }

    Ok(1.0 - mse / baseline)
}

/// Natural log of `n!` for a non negative integer valued count
fn ln_factorial(n: f64) -> f64 {
    (2..=n as u64).map(|k| (k as f64).ln()).sum()
}

fn check_counts(observed: &DVector<f64>) -> Result<()> {
    if observed.iter().any(|y| *y < 0.0 || y.fract() != 0.0) {
        return Err(Error::InvalidInput(
            "spike counts must be non negative integers".to_string(),
        ));
    }
    Ok(())
}

/// Poisson log likelihood of the observed counts given a predicted rate per bin,
/// including the `log(y!)` normalizer
pub fn poisson_log_likelihood(observed: &DVector<f64>, rate: &DVector<f64>) -> Result<f64> {
    check_lengths(observed, rate)?;
    check_counts(observed)?;

    let mut ll = 0.0;
    for (y, r) in observed.iter().zip(rate.iter()) {
        if *y > 0.0 {
            if *r <= 0.0 {
                return Err(Error::InvalidInput(format!(
                    "non positive rate {} in a bin with {} spikes",
                    r, y
                )));
            }
            ll += y * r.ln();
        }
        ll -= r + ln_factorial(*y);
    }

    Ok(ll)
}

/// Akaike information criterion
pub fn aic(log_likelihood: f64, num_params: usize) -> f64 {
    2.0 * num_params as f64 - 2.0 * log_likelihood
}

/// Information the model carries about a spike, in bits per spike, relative to a
/// homogeneous poisson process firing at the mean rate
pub fn single_spike_information(observed: &DVector<f64>, rate: &DVector<f64>) -> Result<f64> {
    let num_spikes = observed.sum();
    if num_spikes <= 0.0 {
        return Err(Error::DegenerateInput(
            "no spikes, single spike information is undefined".to_string(),
        ));
    }
    let ll_model = poisson_log_likelihood(observed, rate)?;
    let mean_rate = DVector::from_element(observed.len(), num_spikes / observed.len() as f64);
    let ll_homogeneous = poisson_log_likelihood(observed, &mean_rate)?;

    Ok((ll_model - ll_homogeneous) / num_spikes / LN_2)
}

/// Poisson deviance `2 * sum(y log(y / mu) - (y - mu))`
pub fn poisson_deviance(observed: &DVector<f64>, rate: &DVector<f64>) -> Result<f64> {
    check_lengths(observed, rate)?;

    let mut dev = 0.0;
    for (y, mu) in observed.iter().zip(rate.iter()) {
        if *y > 0.0 {
            dev += y * (y / mu).ln();
        }
        dev -= y - mu;
    }

    Ok(2.0 * dev)
}

/// Deviance based pseudo-R², `1 - D(model) / D(null)` where the null model
/// predicts the mean count in every bin
pub fn pseudo_r2(observed: &DVector<f64>, rate: &DVector<f64>) -> Result<f64> {
    let mean = observed.mean();
    let null_rate = DVector::from_element(observed.len(), mean);
    let d_null = poisson_deviance(observed, &null_rate)?;
    if d_null == 0.0 {
        return Err(Error::DegenerateInput(
            "null deviance is zero, pseudo-R² is undefined".to_string(),
        ));
    }
    let d_model = poisson_deviance(observed, rate)?;
    debug!("deviance: model {}, null {}", d_model, d_null);

    Ok(1.0 - d_model / d_null)
}
