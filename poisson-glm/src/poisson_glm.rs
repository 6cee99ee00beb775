use common::{evaluation::pseudo_r2, EncodingModel, Error, GlmFit, PathPoint, Result};
use nalgebra::DVector;
use spike_features::{BinnedSpikeCounts, DesignMatrix};

use crate::{proximal_gradient::ProximalGradient, GlmParams};

/// The poisson GLM fitter. Maximizes the penalized poisson log likelihood
/// of every candidate along the regularization path and selects the candidate
/// with the highest training set pseudo-R².
#[derive(Debug, Clone)]
pub struct PoissonGlm {
    params: GlmParams,
}

impl Default for PoissonGlm {
    fn default() -> Self {
        Self::new(GlmParams::default())
    }
}

impl PoissonGlm {
    pub fn new(params: GlmParams) -> Self {
        Self { params }
    }

    #[inline(always)]
    pub fn params(&self) -> &GlmParams {
        &self.params
    }

    /// Fit the GLM.
    ///
    /// # Arguments:
    /// design: The lagged stimulus without offset column, the fitter manages its own constant
    /// counts: The binned spike counts, one per design row
    ///
    /// # Returns:
    /// The selected fit, or `Error::Convergence` carrying it if the selected
    /// candidate exhausted its iteration budget
    pub fn fit(&self, design: &DesignMatrix, counts: &BinnedSpikeCounts) -> Result<GlmFit> {
        self.params.validate()?;
        if design.has_offset() {
            return Err(Error::InvalidInput(
                "the poisson GLM fits its own constant, pass a design without offset column"
                    .to_string(),
            ));
        }
        if design.nrows() != counts.len() {
            return Err(Error::InvalidInput(format!(
                "design has {} bins but there are {} spike counts",
                design.nrows(),
                counts.len()
            )));
        }
        if counts.total() == 0 {
            return Err(Error::DegenerateInput(
                "no spikes, the poisson GLM has no finite maximum likelihood".to_string(),
            ));
        }

        let lags = design.lags();
        let targets = counts.to_targets();

        // warm start from the homogeneous poisson model
        let mut constant = targets.mean().ln();
        let mut filter: DVector<f64> = DVector::from_element(design.num_lags(), 0.0);

        let mut path: Vec<PathPoint> = Vec::new();
        let mut best: Option<(f64, GlmFit)> = None;
        for penalty_strength in self.params.penalty_strength.candidates() {
            let solver = ProximalGradient {
                lags: lags.columns(0, lags.ncols()),
                targets: &targets,
                l1: penalty_strength * self.params.alpha,
                l2: penalty_strength * (1.0 - self.params.alpha),
                learning_rate: self.params.learning_rate,
                max_iterations: self.params.max_iterations,
                tolerance: self.params.tolerance,
            };
            let solution = solver.solve(constant, filter);
            constant = solution.constant;
            filter = solution.filter.clone();

            let candidate = GlmFit {
                constant: solution.constant,
                filter: solution.filter,
                penalty_strength,
                path: vec![],
                iterations: solution.iterations,
                converged: solution.converged,
            };
            let rate = candidate.predict(&lags)?;
            let score = pseudo_r2(&targets, &rate)?;
            info!(
                "penalty strength {:.4}: pseudo-R² {:.5} after {} iterations (converged: {})",
                penalty_strength, score, solution.iterations, solution.converged
            );

            path.push(PathPoint {
                penalty_strength,
                pseudo_r2: score,
                iterations: solution.iterations,
                converged: solution.converged,
            });
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, candidate));
            }
        }

        // validate() guarantees at least one candidate
        let (score, mut fit) = best.ok_or_else(|| {
            Error::InvalidInput("empty regularization path".to_string())
        })?;
        fit.path = path;
        info!(
            "selected penalty strength {:.4} with pseudo-R² {:.5}",
            fit.penalty_strength, score
        );

        if !fit.converged {
            return Err(Error::Convergence {
                iterations: fit.iterations,
                fit: Box::new(fit),
            });
        }

        Ok(fit)
    }
}

#[cfg(test)]
mod tests {
    use nanorand::{Rng, WyRand};
    use spike_features::DesignMatrixBuilder;

    use super::*;
    use crate::PenaltyStrength;

    const NUM_BINS: usize = 20_000;
    const NUM_LAGS: usize = 8;

    /// Approximately standard normal samples, sum of twelve uniforms
    fn gaussian_noise(rng: &mut WyRand, len: usize) -> Vec<f64> {
        (0..len)
            .map(|_| (0..12).map(|_| rng.generate::<f64>()).sum::<f64>() - 6.0)
            .collect()
    }

    /// Knuth's multiplication method, fine for small rates
    fn poisson_sample(rng: &mut WyRand, rate: f64) -> u32 {
        let limit = (-rate).exp();
        let mut k = 0;
        let mut p = rng.generate::<f64>();
        while p > limit {
            k += 1;
            p *= rng.generate::<f64>();
        }
        k
    }

    fn true_filter() -> DVector<f64> {
        DVector::from_fn(NUM_LAGS, |j, _| {
            let t = (NUM_LAGS - 1 - j) as f64;
            0.6 * (-t / 2.0).exp() * (t * 0.9).cos()
        })
    }

    fn lnp_data(seed: u64) -> (DesignMatrix, BinnedSpikeCounts) {
        let mut rng = WyRand::new_seed(seed);
        let stimulus = gaussian_noise(&mut rng, NUM_BINS);
        let design = DesignMatrixBuilder::new(NUM_LAGS).build(&stimulus).unwrap();
        let eta = design.lags() * true_filter();
        let counts: Vec<u32> = eta.iter().map(|e| poisson_sample(&mut rng, (e - 2.0).exp())).collect();

        (design, counts.into())
    }

    fn correlation(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        let a = a.add_scalar(-a.mean());
        let b = b.add_scalar(-b.mean());
        a.dot(&b) / (a.norm() * b.norm())
    }

    #[test]
    fn poisson_glm_recovers_filter() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let (design, counts) = lnp_data(0);
        let glm = PoissonGlm::new(GlmParams {
            penalty_strength: PenaltyStrength::Path(vec![0.1, 0.01, 0.001]),
            ..Default::default()
        });
        let fit = glm.fit(&design, &counts).unwrap();
        info!("fit: constant {}, filter {}", fit.constant, fit.filter);

        assert!(fit.converged);
        assert_eq!(fit.path.len(), 3);
        assert_eq!(fit.path[0].penalty_strength, 0.1);
        assert!(correlation(&fit.filter, &true_filter()) > 0.9);
        assert!((fit.constant + 2.0).abs() < 0.2);

        let best = fit.path.iter().map(|p| p.pseudo_r2).fold(f64::MIN, f64::max);
        assert_eq!(
            fit.path.iter().find(|p| p.penalty_strength == fit.penalty_strength).unwrap().pseudo_r2,
            best
        );
    }

    #[test]
    fn poisson_glm_convergence_error_carries_fit() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let (design, counts) = lnp_data(1);
        let glm = PoissonGlm::new(GlmParams {
            penalty_strength: PenaltyStrength::Single(0.001),
            max_iterations: 1,
            ..Default::default()
        });

        match glm.fit(&design, &counts) {
            Err(Error::Convergence { iterations, fit }) => {
                assert_eq!(iterations, 1);
                assert!(!fit.converged);
                assert_eq!(fit.filter.len(), NUM_LAGS);
                assert!(fit.constant.is_finite());
                assert!(fit.predict(&design.lags()).unwrap().iter().all(|r| r.is_finite()));
            }
            other => panic!("expected a convergence error, got {:?}", other),
        }
    }

    #[test]
    fn poisson_glm_tiny_learning_rate_does_not_converge() {
        if let Err(_) = pretty_env_logger::try_init() {}

        let (design, counts) = lnp_data(3);
        let glm = PoissonGlm::new(GlmParams {
            penalty_strength: PenaltyStrength::Single(0.0),
            learning_rate: 1e-9,
            max_iterations: 20,
            ..Default::default()
        });

        match glm.fit(&design, &counts) {
            Err(Error::Convergence { iterations, fit }) => {
                assert_eq!(iterations, 20);
                assert!(!fit.converged);
            }
            other => panic!("expected a convergence error, got {:?}", other),
        }
    }

    #[test]
    fn poisson_glm_rejects_offset_design() {
        let (_, counts) = lnp_data(2);
        let design = DesignMatrixBuilder::new(NUM_LAGS)
            .with_offset(true)
            .build(&vec![0.5; NUM_BINS])
            .unwrap();

        assert!(matches!(
            PoissonGlm::default().fit(&design, &counts),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn poisson_glm_without_spikes() {
        let design = DesignMatrixBuilder::new(3).build(&[0.1, -0.2, 0.3, 0.4]).unwrap();
        let counts: BinnedSpikeCounts = vec![0; 4].into();

        assert!(matches!(
            PoissonGlm::default().fit(&design, &counts),
            Err(Error::DegenerateInput(_))
        ));
    }
}
