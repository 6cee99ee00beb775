use common::MAX_LINEAR_PREDICTOR;
use nalgebra::{DMatrixView, DVector};

/// Step halvings before the line search gives up
const MAX_HALVINGS: usize = 60;

/// Coefficients reached by one solver run
#[derive(Debug, Clone)]
pub(crate) struct Solution {
    pub(crate) constant: f64,
    pub(crate) filter: DVector<f64>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

/// Proximal gradient descent on the mean poisson negative log likelihood plus
/// an elastic net penalty on the filter. The L2 part is treated as smooth,
/// the L1 part through soft thresholding.
pub(crate) struct ProximalGradient<'a> {
    pub(crate) lags: DMatrixView<'a, f64>,
    pub(crate) targets: &'a DVector<f64>,
    pub(crate) l1: f64,
    pub(crate) l2: f64,
    pub(crate) learning_rate: f64,
    pub(crate) max_iterations: usize,
    pub(crate) tolerance: f64,
}

fn soft_threshold(v: &DVector<f64>, threshold: f64) -> DVector<f64> {
    v.map(|x| x.signum() * (x.abs() - threshold).max(0.0))
}

impl<'a> ProximalGradient<'a> {
    fn linear_predictor(&self, constant: f64, filter: &DVector<f64>) -> DVector<f64> {
        let mut eta = &self.lags * filter;
        eta.add_scalar_mut(constant);
        eta.apply(|e| *e = e.clamp(-MAX_LINEAR_PREDICTOR, MAX_LINEAR_PREDICTOR));
        eta
    }

    /// Mean negative log likelihood, up to the `log(y!)` constant, plus the L2 penalty
    fn smooth_objective(&self, constant: f64, filter: &DVector<f64>) -> f64 {
        let eta = self.linear_predictor(constant, filter);
        let nll: f64 = eta
            .iter()
            .zip(self.targets.iter())
            .map(|(e, y)| e.exp() - y * e)
            .sum();

        nll / eta.len() as f64 + 0.5 * self.l2 * filter.norm_squared()
    }

    fn gradient(&self, constant: f64, filter: &DVector<f64>) -> (f64, DVector<f64>) {
        let n = self.targets.len() as f64;
        let residuals = self.linear_predictor(constant, filter).map(f64::exp) - self.targets;

        let grad_constant = residuals.sum() / n;
        let grad_filter = self.lags.tr_mul(&residuals) / n + filter * self.l2;

        (grad_constant, grad_filter)
    }

    /// Run the solver from a warm start
    pub(crate) fn solve(&self, mut constant: f64, mut filter: DVector<f64>) -> Solution {
        for it in 1..=self.max_iterations {
            let f_old = self.smooth_objective(constant, &filter);
            // objective differences below this are rounding noise
            let rounding_slack = 4.0 * f64::EPSILON * f_old.abs().max(1.0);
            let (g_constant, g_filter) = self.gradient(constant, &filter);

            let mut step = self.learning_rate;
            let mut halvings = 0;
            let (next_constant, next_filter) = loop {
                let c = constant - step * g_constant;
                let w = soft_threshold(&(&filter - &g_filter * step), step * self.l1);

                let d_constant = c - constant;
                let d_filter = &w - &filter;
                let upper_bound = f_old
                    + g_constant * d_constant
                    + g_filter.dot(&d_filter)
                    + (d_constant * d_constant + d_filter.norm_squared()) / (2.0 * step)
                    + rounding_slack;
                if self.smooth_objective(c, &w) <= upper_bound {
                    break (c, w);
                }
                if halvings >= MAX_HALVINGS {
                    warn!("line search stalled at iteration {} with step {:e}", it, step);
                    return Solution {
                        constant,
                        filter,
                        iterations: it,
                        converged: false,
                    };
                }
                step *= 0.5;
                halvings += 1;
            };

            // norm of the gradient mapping, zero exactly at a stationary point
            let change =
                ((next_constant - constant).powi(2) + (&next_filter - &filter).norm_squared()).sqrt();
            let grad_mapping = change / step;
            let scale = (next_constant.powi(2) + next_filter.norm_squared()).sqrt().max(1.0);
            constant = next_constant;
            filter = next_filter;

            if it % 100 == 0 {
                debug!("iteration {}: step {:e}, gradient mapping {:e}", it, step, grad_mapping);
            }
            if grad_mapping <= self.tolerance * scale {
                return Solution {
                    constant,
                    filter,
                    iterations: it,
                    converged: true,
                };
            }
        }

        Solution {
            constant,
            filter,
            iterations: self.max_iterations,
            converged: false,
        }
    }
}
