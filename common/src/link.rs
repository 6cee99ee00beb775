/// Bound on the magnitude of the linear predictor before the exponential
/// inverse link, keeping predicted rates finite and positive
pub const MAX_LINEAR_PREDICTOR: f64 = 50.0;

/// The possible inverse link functions mapping the linear predictor of an encoding model
/// onto its predicted spike count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// The identity function, linear-gaussian models
    Identity,
    /// The exponential function, the canonical inverse link of the poisson model
    Exp,
}

impl Link {
    /// Perform the inverse link function over all elements
    pub fn activate(&self, vals: &mut [f64]) {
        match self {
            Link::Identity => {}
            Link::Exp => {
                for v in vals {
                    *v = v.clamp(-MAX_LINEAR_PREDICTOR, MAX_LINEAR_PREDICTOR).exp();
                }
            }
        }
    }
}
