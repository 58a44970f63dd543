//! One-dimensional K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (the inertia):
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ (xᵢ - μₖ)²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids (evenly spaced or via k-means++)
//! 2. **Assign**: Each point → nearest centroid (ties go to the lower index)
//! 3. **Update**: Each centroid → mean of assigned points
//! 4. Repeat until no centroid moves more than the tolerance
//!
//! WCSS decreases monotonically: the update can only lower it for fixed
//! assignments, and the next assignment can only lower it for fixed
//! centroids. Each [`KmeansResult`] reports the inertia of its own
//! assignments against its updated centroids, so a run's history is
//! non-increasing.
//!
//! ## K-means++ Initialization
//!
//! 1. Choose first centroid uniformly at random from the data
//! 2. Choose next centroid with probability proportional to D(x)²
//!    (squared distance to nearest existing centroid)
//!
//! When every remaining distance is zero (identical data) the initializer
//! falls back to evenly spaced centroids.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::traits::Clustering;
use crate::density::min_max;
use crate::error::{Error, Result};
use rand::prelude::*;
use tracing::{debug, trace, warn};

/// How [`Kmeans::run`] picks its starting centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KmeansInit {
    /// D²-weighted sampling from the data.
    #[default]
    PlusPlus,
    /// Evenly spaced across `[min, max]`.
    Simple,
}

/// Lloyd iteration settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KmeansConfig {
    /// Maximum Lloyd iterations.
    pub max_iter: usize,
    /// A run converges once no centroid moves this much.
    pub tol: f64,
    /// Initialization strategy for [`Kmeans::run`].
    pub init: KmeansInit,
}

impl Default for KmeansConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-6,
            init: KmeansInit::PlusPlus,
        }
    }
}

/// Points currently nearest one centroid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KmeansCluster {
    /// Centroid position.
    pub centroid: f64,
    /// Member points, in input order.
    pub points: Vec<f64>,
    /// `points.len()`.
    pub size: usize,
}

/// Snapshot of one Lloyd iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KmeansResult {
    /// Centroids after this iteration.
    pub centroids: Vec<f64>,
    /// Partition of the data, one cluster per centroid.
    pub clusters: Vec<KmeansCluster>,
    /// Cluster index of every data point, in input order.
    pub assignments: Vec<usize>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    /// Iteration number (0: the starting centroids).
    pub iteration: usize,
    /// Every centroid moved less than the tolerance.
    pub converged: bool,
}

/// One point of an elbow sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElbowPoint {
    /// Number of clusters.
    pub k: usize,
    /// Final inertia for that k.
    pub inertia: f64,
}

/// K-means over a fixed 1D dataset.
#[derive(Debug, Clone)]
pub struct Kmeans {
    data: Vec<f64>,
    /// Number of clusters.
    k: usize,
    config: KmeansConfig,
    /// Random seed.
    seed: Option<u64>,
}

impl Kmeans {
    /// Create a K-means engine.
    ///
    /// Fails on empty data, `k == 0`, or `k` larger than the dataset.
    pub fn new(data: Vec<f64>, k: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be > 0",
            });
        }
        if k > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: data.len(),
            });
        }
        Ok(Self {
            data,
            k,
            config: KmeansConfig::default(),
            seed: None,
        })
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: KmeansConfig) -> Self {
        self.config = config;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set the initialization strategy.
    pub fn with_init(mut self, init: KmeansInit) -> Self {
        self.config.init = init;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The dataset.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Active configuration.
    pub fn config(&self) -> &KmeansConfig {
        &self.config
    }

    fn rng(&self) -> Box<dyn RngCore> {
        match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        }
    }

    fn spaced(&self, k: usize) -> Vec<f64> {
        let (lo, hi) = min_max(&self.data).unwrap_or((0.0, 0.0));
        if k == 1 {
            return vec![0.5 * (lo + hi)];
        }
        (0..k)
            .map(|i| lo + (hi - lo) * i as f64 / (k - 1) as f64)
            .collect()
    }

    /// `k` centroids evenly spaced from the minimum to the maximum of the data.
    pub fn initialize_centroids_simple(&self) -> Vec<f64> {
        self.spaced(self.k)
    }

    fn plus_plus<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<f64> {
        let n = self.data.len();
        let mut centroids = Vec::with_capacity(k);

        // First centroid: random point
        centroids.push(self.data[rng.random_range(0..n)]);

        // Remaining centroids: k-means++ selection
        while centroids.len() < k {
            let distances: Vec<f64> = self
                .data
                .iter()
                .map(|&x| {
                    centroids
                        .iter()
                        .map(|&c| (x - c) * (x - c))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            // Sample proportional to squared distance
            let total: f64 = distances.iter().sum();
            if !(total > 0.0) {
                warn!(k, "all points coincide with chosen centroids; spacing evenly");
                return self.spaced(k);
            }

            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = None;
            for (j, &d) in distances.iter().enumerate() {
                cumsum += d;
                if d > 0.0 && cumsum >= threshold {
                    selected = Some(j);
                    break;
                }
            }
            // Rounding can leave the cumulative sum just short of the threshold.
            let selected = selected.unwrap_or_else(|| {
                distances
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(j, _)| j)
                    .unwrap_or(0)
            });

            centroids.push(self.data[selected]);
        }

        centroids
    }

    /// k-means++ initialization drawing from `rng`.
    pub fn initialize_centroids_plus_plus<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.plus_plus(self.k, rng)
    }

    fn initial_centroids<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<f64> {
        match self.config.init {
            KmeansInit::PlusPlus => self.plus_plus(k, rng),
            KmeansInit::Simple => self.spaced(k),
        }
    }

    /// Nearest centroid by absolute distance; ties go to the lowest index.
    fn nearest(x: f64, centroids: &[f64]) -> usize {
        let mut best_cluster = 0;
        let mut best_dist = f64::INFINITY;
        for (k, &c) in centroids.iter().enumerate() {
            let dist = (x - c).abs();
            if dist < best_dist {
                best_dist = dist;
                best_cluster = k;
            }
        }
        best_cluster
    }

    fn assign(&self, centroids: &[f64]) -> Vec<usize> {
        self.data
            .iter()
            .map(|&x| Self::nearest(x, centroids))
            .collect()
    }

    fn inertia(&self, assignments: &[usize], centroids: &[f64]) -> f64 {
        self.data
            .iter()
            .zip(assignments)
            .map(|(&x, &a)| (x - centroids[a]) * (x - centroids[a]))
            .sum()
    }

    /// Group the data by `assignments`, one cluster per centroid.
    ///
    /// `assignments` must have one entry per data point, each a valid
    /// centroid index.
    pub fn clusters(
        &self,
        assignments: &[usize],
        centroids: &[f64],
    ) -> Result<Vec<KmeansCluster>> {
        if assignments.len() != self.data.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} assignments", self.data.len()),
                actual: format!("{} assignments", assignments.len()),
            });
        }
        let mut points: Vec<Vec<f64>> = vec![Vec::new(); centroids.len()];
        for (&x, &a) in self.data.iter().zip(assignments) {
            let bucket = points.get_mut(a).ok_or_else(|| Error::ShapeMismatch {
                expected: format!("cluster index < {}", centroids.len()),
                actual: format!("cluster index {a}"),
            })?;
            bucket.push(x);
        }
        Ok(centroids
            .iter()
            .zip(points)
            .map(|(&centroid, points)| KmeansCluster {
                centroid,
                size: points.len(),
                points,
            })
            .collect())
    }

    fn check_centroids(centroids: &[f64]) -> Result<()> {
        if centroids.is_empty() {
            return Err(Error::ShapeMismatch {
                expected: "at least one centroid".to_string(),
                actual: "0 centroids".to_string(),
            });
        }
        Ok(())
    }

    /// Assignment and inertia for `centroids` without moving them.
    ///
    /// This is the iteration-0 entry of a run.
    pub fn snapshot(&self, centroids: &[f64]) -> Result<KmeansResult> {
        Self::check_centroids(centroids)?;
        let assignments = self.assign(centroids);
        Ok(KmeansResult {
            centroids: centroids.to_vec(),
            clusters: self.clusters(&assignments, centroids)?,
            inertia: self.inertia(&assignments, centroids),
            assignments,
            iteration: 0,
            converged: false,
        })
    }

    fn iterate<R: Rng + ?Sized>(
        &self,
        centroids: &[f64],
        iteration: usize,
        rng: &mut R,
    ) -> Result<KmeansResult> {
        Self::check_centroids(centroids)?;
        let k = centroids.len();
        let n = self.data.len();

        // Assignment step
        let assignments = self.assign(centroids);

        // Update step
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&x, &a) in self.data.iter().zip(&assignments) {
            sums[a] += x;
            counts[a] += 1;
        }

        let mut new_centroids = Vec::with_capacity(k);
        for c in 0..k {
            if counts[c] > 0 {
                new_centroids.push(sums[c] / counts[c] as f64);
            } else {
                // Empty cluster: reinitialize randomly
                let idx = rng.random_range(0..n);
                warn!(cluster = c, reseed = self.data[idx], "empty cluster reseeded");
                new_centroids.push(self.data[idx]);
            }
        }

        // Check convergence
        let converged = centroids
            .iter()
            .zip(&new_centroids)
            .all(|(a, b)| (a - b).abs() < self.config.tol);

        Ok(KmeansResult {
            clusters: self.clusters(&assignments, &new_centroids)?,
            inertia: self.inertia(&assignments, &new_centroids),
            centroids: new_centroids,
            assignments,
            iteration,
            converged,
        })
    }

    /// One Lloyd iteration from `centroids`.
    ///
    /// `iteration` in the result is 1; callers stepping by hand renumber as
    /// they append to their own history. Each call draws from a fresh engine
    /// RNG, so on a seeded engine every empty-cluster reseed picks the same
    /// data index. Use [`Kmeans::single_iteration_with`] to carry one RNG
    /// across steps.
    pub fn single_iteration(&self, centroids: &[f64]) -> Result<KmeansResult> {
        let mut rng = self.rng();
        self.iterate(centroids, 1, &mut rng)
    }

    /// [`Kmeans::single_iteration`] drawing empty-cluster reseeds from
    /// `rng`. Stepping with `StdRng::seed_from_u64(seed)` reproduces
    /// [`Kmeans::run_from`] on an engine seeded with `seed`.
    pub fn single_iteration_with<R: Rng + ?Sized>(
        &self,
        centroids: &[f64],
        rng: &mut R,
    ) -> Result<KmeansResult> {
        self.iterate(centroids, 1, rng)
    }

    fn run_with<R: Rng + ?Sized>(
        &self,
        centroids: Vec<f64>,
        rng: &mut R,
    ) -> Result<Vec<KmeansResult>> {
        let mut history = vec![self.snapshot(&centroids)?];
        let mut current = centroids;

        for iter in 1..=self.config.max_iter {
            let result = self.iterate(&current, iter, rng)?;
            trace!(iteration = iter, inertia = result.inertia, "lloyd step");
            let converged = result.converged;
            current = result.centroids.clone();
            history.push(result);
            if converged {
                break;
            }
        }

        if let Some(last) = history.last() {
            debug!(
                iterations = last.iteration,
                inertia = last.inertia,
                converged = last.converged,
                "kmeans run finished"
            );
        }
        Ok(history)
    }

    /// Initialize per the configured strategy and iterate until convergence
    /// or `max_iter`.
    ///
    /// `history[0]` is the initial assignment; every later entry is one
    /// Lloyd iteration.
    pub fn run(&self) -> Result<Vec<KmeansResult>> {
        let mut rng = self.rng();
        let centroids = self.initial_centroids(self.k, &mut rng);
        self.run_with(centroids, &mut rng)
    }

    /// Like [`Kmeans::run`], starting from caller-supplied centroids.
    pub fn run_from(&self, centroids: Vec<f64>) -> Result<Vec<KmeansResult>> {
        let mut rng = self.rng();
        self.run_with(centroids, &mut rng)
    }

    /// Elbow sweep: final inertia of an independent run for each k in
    /// `1..=max_k` (capped at the dataset size).
    pub fn find_optimal_k(&self, max_k: usize) -> Result<Vec<ElbowPoint>> {
        if max_k == 0 {
            return Err(Error::InvalidParameter {
                name: "max_k",
                message: "must be > 0",
            });
        }
        let mut rng = self.rng();
        (1..=max_k.min(self.data.len()))
            .map(|k| {
                let centroids = self.initial_centroids(k, &mut rng);
                let history = self.run_with(centroids, &mut rng)?;
                let inertia = history.last().map_or(0.0, |r| r.inertia);
                Ok(ElbowPoint { k, inertia })
            })
            .collect()
    }

    /// Absolute distance from `x` to every centroid.
    pub fn distances_to_centroids(x: f64, centroids: &[f64]) -> Vec<f64> {
        centroids.iter().map(|&c| (x - c).abs()).collect()
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self) -> Result<Vec<usize>> {
        let history = self.run()?;
        history
            .last()
            .map(|r| r.assignments.clone())
            .ok_or(Error::EmptyInput)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}
