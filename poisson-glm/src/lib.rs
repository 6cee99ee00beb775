//! Penalized poisson regression with exponential link, fit along a regularization path

#[macro_use]
extern crate log;

pub use params::{GlmParams, PenaltyStrength};
pub use poisson_glm::PoissonGlm;

mod params;
mod poisson_glm;
mod proximal_gradient;
