//! # iterfit
//!
//! Step-by-step parameter estimation for interactive visualization:
//! 1D Gaussian mixtures by EM, 1D K-means, and 2D Gaussians by closed-form
//! MLE or gradient descent.
//!
//! Engines hold a dataset and settings, never iteration state. Every step is
//! a function from parameters to new parameters, and every "fit" returns the
//! full history so a caller can scrub back and forth through it.
//!
//! Numerical degeneracy (identical points, collapsing variances, singular
//! covariances, underflowing likelihoods) is absorbed by floors and
//! projections; the only errors are boundary errors such as empty data or
//! mismatched shapes.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod density;
/// Error types used across `iterfit`.
pub mod error;
pub mod gaussian2d;
pub mod linalg;
pub mod mode;
pub mod sample;

pub use cluster::{
    Clustering, GaussianComponent, Gmm, GmmState, Kmeans, KmeansResult, SoftClustering,
};
pub use density::gaussian_pdf;
pub use error::{Error, Result};
pub use gaussian2d::{Gaussian2d, Gaussian2dFit, Gaussian2dState};
pub use linalg::{Covariance2, Point2D};
pub use mode::{Mode, ModelState};
pub use sample::{generate_sample_data, generate_sample_data_2d, SampleConfig, SampleConfig2D};
