use common::{Error, Link, Result};

/// The penalty strength, either a single value or a path of candidates
#[derive(Debug, Clone, PartialEq)]
pub enum PenaltyStrength {
    /// Fit exactly one candidate
    Single(f64),
    /// Fit every candidate, strongest penalty first, and keep the best scoring one
    Path(Vec<f64>),
}

impl PenaltyStrength {
    /// `num` values spaced evenly on a log scale from `start` down (or up) to `end`
    pub fn log_spaced(start: f64, end: f64, num: usize) -> Self {
        let (lo, hi) = (start.ln(), end.ln());
        let vals = match num {
            0 => vec![],
            1 => vec![start],
            _ => (0..num)
                .map(|i| (lo + (hi - lo) * i as f64 / (num - 1) as f64).exp())
                .collect(),
        };
        PenaltyStrength::Path(vals)
    }

    /// The candidates in the order they are fit, strongest first
    pub fn candidates(&self) -> Vec<f64> {
        let mut vals = match self {
            PenaltyStrength::Single(v) => vec![*v],
            PenaltyStrength::Path(vals) => vals.clone(),
        };
        vals.sort_by(|a, b| b.total_cmp(a));
        vals
    }
}

/// The parameters of the penalized poisson GLM
#[derive(Debug, Clone)]
pub struct GlmParams {
    /// Regularization strength `lambda`, scalar or path
    pub penalty_strength: PenaltyStrength,
    /// Mixing between the L1 (`alpha = 1`) and L2 (`alpha = 0`) penalty,
    /// `lambda * ((1 - alpha) / 2 * |w|^2 + alpha * |w|_1)`.
    /// The constant is never penalized.
    pub alpha: f64,
    /// Iteration budget of each path candidate
    pub max_iterations: usize,
    /// Initial step size of each proximal gradient iteration, halved until the step descends
    pub learning_rate: f64,
    /// Relative change of the coefficients below which a candidate counts as converged
    pub tolerance: f64,
    /// The inverse link function, only `Link::Exp` (log link) is supported
    pub link: Link,
}

impl Default for GlmParams {
    fn default() -> Self {
        Self {
            penalty_strength: PenaltyStrength::log_spaced(0.5, 0.01, 10),
            alpha: 0.5,
            max_iterations: 1000,
            learning_rate: 1.0,
            tolerance: 1e-6,
            link: Link::Exp,
        }
    }
}

impl GlmParams {
    pub(crate) fn validate(&self) -> Result<()> {
        let candidates = self.penalty_strength.candidates();
        if candidates.is_empty() {
            return Err(Error::InvalidInput("empty regularization path".to_string()));
        }
        if candidates.iter().any(|l| !l.is_finite() || *l < 0.0) {
            return Err(Error::InvalidInput(format!(
                "penalty strengths must be finite and non negative: {:?}",
                candidates
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::InvalidInput(format!("alpha {} outside of [0, 1]", self.alpha)));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput("max_iterations must be at least 1".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidInput(format!(
                "tolerance must be non negative, got {}",
                self.tolerance
            )));
        }
        if self.link != Link::Exp {
            return Err(Error::InvalidInput(format!(
                "poisson GLM requires the log link, got inverse link {:?}",
                self.link
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn log_spaced_path() {
        let path = PenaltyStrength::log_spaced(0.5, 0.01, 10);
        let candidates = path.candidates();

        assert_eq!(candidates.len(), 10);
        assert_eq!(round(candidates[0], 12), 0.5);
        assert_eq!(round(candidates[9], 12), 0.01);
        assert!(candidates.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn candidates_strongest_first() {
        let path = PenaltyStrength::Path(vec![0.1, 1.0, 0.01]);

        assert_eq!(path.candidates(), vec![1.0, 0.1, 0.01]);
    }

    #[test]
    fn default_params_are_valid() {
        assert!(GlmParams::default().validate().is_ok());
    }

    #[test]
    fn invalid_params() {
        let invalid = [
            GlmParams {
                penalty_strength: PenaltyStrength::Path(vec![]),
                ..Default::default()
            },
            GlmParams {
                penalty_strength: PenaltyStrength::Single(-1.0),
                ..Default::default()
            },
            GlmParams {
                alpha: 1.5,
                ..Default::default()
            },
            GlmParams {
                max_iterations: 0,
                ..Default::default()
            },
            GlmParams {
                learning_rate: 0.0,
                ..Default::default()
            },
            GlmParams {
                link: Link::Identity,
                ..Default::default()
            },
        ];
        for p in invalid.iter() {
            assert!(matches!(p.validate(), Err(Error::InvalidInput(_))), "{:?}", p);
        }
    }
}
