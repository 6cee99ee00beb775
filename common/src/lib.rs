//! This crate provides the functionality shared by all encoding models:
//! the error type, the fitted model artifacts and their evaluation

#![deny(unused_imports)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

mod encoding_model;
mod error;
pub mod evaluation;
mod link;

pub use encoding_model::{EncodingModel, GlmFit, LinearFilter, PathPoint};
pub use error::{Error, Result};
pub use link::{Link, MAX_LINEAR_PREDICTOR};
