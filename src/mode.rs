//! One value type over the three engines' results.
//!
//! Each engine keeps its own dedicated types; [`ModelState`] is what a
//! caller switching between modes holds instead of a struct of optional
//! fields.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster::{GmmState, KmeansResult};
use crate::gaussian2d::Gaussian2dState;
use core::fmt;

/// Which engine produced a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// 1D Gaussian mixture, EM.
    Gmm,
    /// 1D K-means.
    Kmeans,
    /// 2D Gaussian, gradient descent.
    Gaussian2d,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Gmm => write!(f, "gmm"),
            Mode::Kmeans => write!(f, "kmeans"),
            Mode::Gaussian2d => write!(f, "gaussian2d"),
        }
    }
}

/// Result of a run in any mode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModelState {
    /// EM fit.
    Gmm(GmmState),
    /// K-means history, oldest first.
    Kmeans(Vec<KmeansResult>),
    /// Gradient-descent fit.
    Gaussian2d(Gaussian2dState),
}

impl ModelState {
    /// The engine this state belongs to.
    pub fn mode(&self) -> Mode {
        match self {
            ModelState::Gmm(_) => Mode::Gmm,
            ModelState::Kmeans(_) => Mode::Kmeans,
            ModelState::Gaussian2d(_) => Mode::Gaussian2d,
        }
    }

    /// Latest iteration number.
    pub fn iteration(&self) -> usize {
        match self {
            ModelState::Gmm(s) => s.iteration,
            ModelState::Kmeans(h) => h.last().map_or(0, |r| r.iteration),
            ModelState::Gaussian2d(s) => s.iteration,
        }
    }

    /// Whether the run stopped on its tolerance.
    pub fn converged(&self) -> bool {
        match self {
            ModelState::Gmm(s) => s.converged,
            ModelState::Kmeans(h) => h.last().is_some_and(|r| r.converged),
            ModelState::Gaussian2d(s) => s.converged,
        }
    }

    /// Number of recorded snapshots.
    pub fn history_len(&self) -> usize {
        match self {
            ModelState::Gmm(s) => s.history.len(),
            ModelState::Kmeans(h) => h.len(),
            ModelState::Gaussian2d(s) => s.history.len(),
        }
    }

    /// The quantity the engine optimizes: log-likelihood (maximized) for the
    /// Gaussian modes, inertia (minimized) for K-means.
    pub fn objective(&self) -> f64 {
        match self {
            ModelState::Gmm(s) => s.log_likelihood,
            ModelState::Kmeans(h) => h.last().map_or(0.0, |r| r.inertia),
            ModelState::Gaussian2d(s) => s.log_likelihood,
        }
    }
}

impl From<GmmState> for ModelState {
    fn from(state: GmmState) -> Self {
        ModelState::Gmm(state)
    }
}

impl From<Vec<KmeansResult>> for ModelState {
    fn from(history: Vec<KmeansResult>) -> Self {
        ModelState::Kmeans(history)
    }
}

impl From<Gaussian2dState> for ModelState {
    fn from(state: Gaussian2dState) -> Self {
        ModelState::Gaussian2d(state)
    }
}
