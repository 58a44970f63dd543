//! One-dimensional Gaussian Mixture Model fitted by Expectation-Maximization.
//!
//! # The Probabilistic Model
//!
//! ```text
//! P(x) = Σₖ πₖ × N(x | μₖ, σₖ)
//! ```
//!
//! Where:
//! - πₖ = mixing weight (probability of component k)
//! - μₖ = mean of component k
//! - σₖ = standard deviation of component k
//!
//! # The EM Algorithm
//!
//! **E-step**: Compute "responsibilities" (soft assignments):
//! ```text
//! γₙₖ = πₖ × N(xₙ | μₖ, σₖ) / Σⱼ πⱼ × N(xₙ | μⱼ, σⱼ)
//! ```
//!
//! **M-step**: Update parameters using responsibilities:
//! - πₖ = (1/N) Σₙ γₙₖ  (fraction of responsibility)
//! - μₖ = Σₙ γₙₖ xₙ / Σₙ γₙₖ  (weighted mean)
//! - σₖ = √(Σₙ γₙₖ (xₙ - μₖ)² / Σₙ γₙₖ)  (weighted spread, floored)
//!
//! Every EM step can only raise the log-likelihood. The engine holds no
//! iteration state: each call takes components in and hands new components
//! back, so the caller's list of [`GmmHistoryStep`]s is the whole run.
//!
//! # Failure Modes
//!
//! - **Local optima**: EM converges to local maxima; initialization matters
//! - **Collapsing components**: a component sitting on one point drives σ → 0;
//!   σ is floored at [`MIN_SIGMA`]
//! - **Underflow**: far-away points have density 0 under every component;
//!   responsibilities are computed in log space

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::traits::{Clustering, SoftClustering};
use crate::density::{
    gaussian_pdf, log_gaussian_pdf, log_sum_exp, mean, variance, DENSITY_FLOOR,
};
use crate::error::{Error, Result};
use ndarray::Array2;
use tracing::{debug, trace, warn};

/// Floor applied to every component's standard deviation.
pub const MIN_SIGMA: f64 = 0.01;

/// One mixture component.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussianComponent {
    /// Mean.
    pub mu: f64,
    /// Standard deviation.
    pub sigma: f64,
    /// Mixing weight.
    pub pi: f64,
}

impl GaussianComponent {
    /// Create a component.
    pub fn new(mu: f64, sigma: f64, pi: f64) -> Self {
        Self { mu, sigma, pi }
    }
}

/// Snapshot of one EM iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GmmHistoryStep {
    /// Components after this iteration (iteration 0: the starting point).
    pub components: Vec<GaussianComponent>,
    /// Iteration number.
    pub iteration: usize,
    /// Log-likelihood of `components`.
    pub log_likelihood: f64,
    /// Responsibilities under `components`, when recording is enabled.
    pub responsibilities: Option<Vec<Vec<f64>>>,
}

/// Output of a single E+M step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmStep {
    /// Updated components.
    pub components: Vec<GaussianComponent>,
    /// Responsibilities computed in the E-step (under the input components).
    pub responsibilities: Vec<Vec<f64>>,
    /// Log-likelihood of the updated components.
    pub log_likelihood: f64,
}

/// Result of running EM to convergence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GmmState {
    /// Final components.
    pub components: Vec<GaussianComponent>,
    /// Number of EM steps taken.
    pub iteration: usize,
    /// Final log-likelihood.
    pub log_likelihood: f64,
    /// Whether the tolerance was reached before the iteration cap.
    pub converged: bool,
    /// One entry per iteration, starting at iteration 0.
    pub history: Vec<GmmHistoryStep>,
}

/// Mixture evaluated at a single query point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixtureEvaluation {
    /// Mixture density `Σₖ πₖ N(x)`.
    pub total: f64,
    /// Weighted density `πₖ N(x)` of each component.
    pub component_probs: Vec<f64>,
    /// Posterior `P(k | x)`; sums to 1.
    pub posteriors: Vec<f64>,
}

/// EM settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GmmConfig {
    /// Maximum EM iterations.
    pub max_iter: usize,
    /// Stop once |ΔlogL| falls below this.
    pub tol: f64,
    /// Floor for component standard deviations.
    pub min_sigma: f64,
    /// Store responsibilities in every history step.
    pub record_responsibilities: bool,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-6,
            min_sigma: MIN_SIGMA,
            record_responsibilities: false,
        }
    }
}

/// Gaussian Mixture Model over a fixed 1D dataset.
#[derive(Debug, Clone)]
pub struct Gmm {
    data: Vec<f64>,
    n_components: usize,
    config: GmmConfig,
}

impl Gmm {
    /// Create an engine for `data` with `n_components` components.
    ///
    /// Fails on empty data, zero components, or more components than points.
    pub fn new(data: Vec<f64>, n_components: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if n_components == 0 {
            return Err(Error::InvalidParameter {
                name: "n_components",
                message: "must be > 0",
            });
        }
        if n_components > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: n_components,
                n_items: data.len(),
            });
        }
        Ok(Self {
            data,
            n_components,
            config: GmmConfig::default(),
        })
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: GmmConfig) -> Self {
        self.config = config;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance on the log-likelihood change.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set the standard deviation floor.
    pub fn with_min_sigma(mut self, min_sigma: f64) -> Self {
        self.config.min_sigma = min_sigma;
        self
    }

    /// Record responsibilities in every history step of [`Gmm::fit`].
    pub fn with_responsibilities(mut self, record: bool) -> Self {
        self.config.record_responsibilities = record;
        self
    }

    /// The dataset.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of components used by [`Gmm::initialize_components`].
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Active configuration.
    pub fn config(&self) -> &GmmConfig {
        &self.config
    }

    /// Starting components: means at evenly spaced quantiles of the data,
    /// equal weights, and a shared σ of `std(data) / k`.
    pub fn initialize_components(&self) -> Vec<GaussianComponent> {
        let k = self.n_components;
        let mut sorted = self.data.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();

        let spread = (variance(&self.data).sqrt() / k as f64).max(self.config.min_sigma);
        let pi = 1.0 / k as f64;

        (0..k)
            .map(|i| {
                let q = (i as f64 + 0.5) / k as f64;
                let idx = ((q * n as f64) as usize).min(n - 1);
                GaussianComponent::new(sorted[idx], spread, pi)
            })
            .collect()
    }

    /// `ln πₖ + ln N(x | μₖ, σₖ)` for every component.
    fn log_terms(x: f64, components: &[GaussianComponent], out: &mut Vec<f64>) {
        out.clear();
        out.extend(components.iter().map(|c| {
            if c.pi > 0.0 {
                c.pi.ln() + log_gaussian_pdf(x, c.mu, c.sigma)
            } else {
                f64::NEG_INFINITY
            }
        }));
    }

    /// Normalize log terms into a posterior row. Returns `false` when every
    /// term was `-∞` and the row fell back to uniform.
    fn posterior_row(log_terms: &[f64], out: &mut [f64]) -> bool {
        let k = log_terms.len();
        let lse = log_sum_exp(log_terms);
        if !lse.is_finite() {
            out.fill(1.0 / k as f64);
            return false;
        }
        let mut sum = 0.0;
        for (o, &t) in out.iter_mut().zip(log_terms) {
            *o = (t - lse).exp();
            sum += *o;
        }
        for o in out.iter_mut() {
            *o /= sum;
        }
        true
    }

    /// Total log-likelihood `Σₙ ln Σₖ πₖ N(xₙ)`.
    ///
    /// The inner sum is floored at [`DENSITY_FLOOR`], so the result is finite
    /// for any finite parameters.
    pub fn calculate_log_likelihood(&self, components: &[GaussianComponent]) -> f64 {
        let floor = DENSITY_FLOOR.ln();
        let mut terms = Vec::with_capacity(components.len());
        self.data
            .iter()
            .map(|&x| {
                Self::log_terms(x, components, &mut terms);
                log_sum_exp(&terms).max(floor)
            })
            .sum()
    }

    fn responsibility_matrix(&self, components: &[GaussianComponent]) -> Array2<f64> {
        let n = self.data.len();
        let k = components.len();
        let mut resp = Array2::zeros((n, k));
        if k == 0 {
            return resp;
        }

        let mut terms = Vec::with_capacity(k);
        let mut row = vec![0.0; k];
        let mut fallbacks = 0usize;
        for (i, &x) in self.data.iter().enumerate() {
            Self::log_terms(x, components, &mut terms);
            if !Self::posterior_row(&terms, &mut row) {
                fallbacks += 1;
            }
            for (c, &r) in row.iter().enumerate() {
                resp[[i, c]] = r;
            }
        }

        if fallbacks > 0 {
            warn!(
                points = fallbacks,
                "mixture density vanished; using uniform responsibilities"
            );
        }
        resp
    }

    /// E-step: posterior probability of each component for each point.
    ///
    /// Entry `[i][k]` is `P(k | xᵢ)`; every row sums to 1.
    pub fn calculate_responsibilities(&self, components: &[GaussianComponent]) -> Vec<Vec<f64>> {
        to_rows(&self.responsibility_matrix(components))
    }

    fn m_step(&self, resp: &Array2<f64>) -> Vec<GaussianComponent> {
        let k = resp.ncols();
        let min_sigma = self.config.min_sigma;

        let mass: Vec<f64> = (0..k).map(|c| resp.column(c).sum()).collect();
        let total: f64 = mass.iter().sum();

        let data_mean = mean(&self.data);
        let data_sigma = variance(&self.data).sqrt().max(min_sigma);

        (0..k)
            .map(|c| {
                let pi = if total > 0.0 {
                    mass[c] / total
                } else {
                    1.0 / k as f64
                };

                if !(mass[c] > f64::MIN_POSITIVE) {
                    // Nothing assigned: park the component on the data.
                    return GaussianComponent::new(data_mean, data_sigma, pi);
                }

                let column = resp.column(c);
                let mu = column
                    .iter()
                    .zip(&self.data)
                    .map(|(&r, &x)| r * x)
                    .sum::<f64>()
                    / mass[c];
                let var = column
                    .iter()
                    .zip(&self.data)
                    .map(|(&r, &x)| r * (x - mu) * (x - mu))
                    .sum::<f64>()
                    / mass[c];

                GaussianComponent::new(mu, var.sqrt().max(min_sigma), pi)
            })
            .collect()
    }

    /// M-step: re-estimate components from a responsibility matrix.
    ///
    /// `responsibilities` must have one row per data point and the same
    /// (non-zero) width on every row.
    pub fn maximization_step(
        &self,
        responsibilities: &[Vec<f64>],
    ) -> Result<Vec<GaussianComponent>> {
        let n = self.data.len();
        if responsibilities.len() != n {
            return Err(Error::ShapeMismatch {
                expected: format!("{n} rows"),
                actual: format!("{} rows", responsibilities.len()),
            });
        }
        let k = responsibilities[0].len();
        if k == 0 {
            return Err(Error::ShapeMismatch {
                expected: "at least one column".to_string(),
                actual: "0 columns".to_string(),
            });
        }

        let mut flat = Vec::with_capacity(n * k);
        for (i, row) in responsibilities.iter().enumerate() {
            if row.len() != k {
                return Err(Error::ShapeMismatch {
                    expected: format!("{k} columns"),
                    actual: format!("{} columns in row {i}", row.len()),
                });
            }
            flat.extend(row);
        }
        let resp = Array2::from_shape_vec((n, k), flat).map_err(|e| Error::Other(e.to_string()))?;

        Ok(self.m_step(&resp))
    }

    /// One EM iteration: E-step under `components`, then M-step.
    ///
    /// The reported log-likelihood belongs to the updated components, so it
    /// is never below `calculate_log_likelihood(components)`.
    pub fn single_em_step(&self, components: &[GaussianComponent]) -> Result<EmStep> {
        if components.is_empty() {
            return Err(Error::ShapeMismatch {
                expected: "at least one component".to_string(),
                actual: "0 components".to_string(),
            });
        }

        let resp = self.responsibility_matrix(components);
        let updated = self.m_step(&resp);
        let log_likelihood = self.calculate_log_likelihood(&updated);

        Ok(EmStep {
            components: updated,
            responsibilities: to_rows(&resp),
            log_likelihood,
        })
    }

    fn snapshot(
        &self,
        components: &[GaussianComponent],
        iteration: usize,
        ll: f64,
    ) -> GmmHistoryStep {
        GmmHistoryStep {
            components: components.to_vec(),
            iteration,
            log_likelihood: ll,
            responsibilities: self
                .config
                .record_responsibilities
                .then(|| self.calculate_responsibilities(components)),
        }
    }

    /// Run EM until |ΔlogL| < `tol` or `max_iter` steps.
    ///
    /// Starts from `initial` when given, otherwise from
    /// [`Gmm::initialize_components`]. `history[0]` is the starting point and
    /// `history.len() == iteration + 1`.
    pub fn fit(&self, initial: Option<Vec<GaussianComponent>>) -> Result<GmmState> {
        let mut components = initial.unwrap_or_else(|| self.initialize_components());
        if components.is_empty() {
            return Err(Error::ShapeMismatch {
                expected: "at least one component".to_string(),
                actual: "0 components".to_string(),
            });
        }

        let mut log_likelihood = self.calculate_log_likelihood(&components);
        let mut history = vec![self.snapshot(&components, 0, log_likelihood)];
        let mut iteration = 0;
        let mut converged = false;

        for iter in 1..=self.config.max_iter {
            let step = self.single_em_step(&components)?;
            let delta = (step.log_likelihood - log_likelihood).abs();

            components = step.components;
            log_likelihood = step.log_likelihood;
            iteration = iter;
            history.push(self.snapshot(&components, iter, log_likelihood));
            trace!(iteration = iter, log_likelihood, delta, "em step");

            if delta < self.config.tol {
                converged = true;
                break;
            }
        }

        debug!(
            iterations = iteration,
            log_likelihood, converged, "gmm fit finished"
        );

        Ok(GmmState {
            components,
            iteration,
            log_likelihood,
            converged,
            history,
        })
    }

    /// Mixture density, weighted component densities and posteriors at `x`.
    pub fn evaluate_mixture(x: f64, components: &[GaussianComponent]) -> MixtureEvaluation {
        let component_probs: Vec<f64> = components
            .iter()
            .map(|c| c.pi.max(0.0) * gaussian_pdf(x, c.mu, c.sigma))
            .collect();
        let total = component_probs.iter().sum();

        let mut terms = Vec::with_capacity(components.len());
        Self::log_terms(x, components, &mut terms);
        let mut posteriors = vec![0.0; components.len()];
        if !components.is_empty() {
            Self::posterior_row(&terms, &mut posteriors);
        }

        MixtureEvaluation {
            total,
            component_probs,
            posteriors,
        }
    }

    /// Index of the component with the highest posterior at `x`.
    pub fn predict(x: f64, components: &[GaussianComponent]) -> Option<usize> {
        argmax(&Self::evaluate_mixture(x, components).posteriors)
    }
}

fn to_rows(matrix: &Array2<f64>) -> Vec<Vec<f64>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

fn argmax(row: &[f64]) -> Option<usize> {
    row.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

impl Clustering for Gmm {
    fn fit_predict(&self) -> Result<Vec<usize>> {
        let probs = self.fit_predict_proba()?;

        // Hard assignment: argmax
        Ok(probs.iter().map(|row| argmax(row).unwrap_or(0)).collect())
    }

    fn n_clusters(&self) -> usize {
        self.n_components
    }
}

impl SoftClustering for Gmm {
    fn fit_predict_proba(&self) -> Result<Vec<Vec<f64>>> {
        let state = self.fit(None)?;
        Ok(self.calculate_responsibilities(&state.components))
    }
}
