//! Clustering traits.

use crate::error::Result;

/// Trait for clustering engines that own their dataset.
pub trait Clustering {
    /// Fit the model to the engine's data and return cluster assignments.
    ///
    /// Returns a vector of cluster labels, one per data point, in input order.
    fn fit_predict(&self) -> Result<Vec<usize>>;

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}

/// Trait for soft clustering algorithms that return probabilities.
pub trait SoftClustering: Clustering {
    /// Fit and return soft cluster assignments (probabilities).
    ///
    /// Returns a matrix where entry \[i\]\[k\] is the probability that
    /// point i belongs to cluster k.
    fn fit_predict_proba(&self) -> Result<Vec<Vec<f64>>>;
}
