//! Iterative 1D clustering engines.
//!
//! ## Hard vs Soft Clustering
//!
//! **Hard clustering** (K-means) assigns each point to exactly one cluster.
//!
//! **Soft clustering** (GMM) gives each point a probability distribution over
//! components. A point halfway between two modes is 50/50 rather than forced
//! into one side.
//!
//! ## Algorithms
//!
//! ### Gaussian Mixture Model (GMM)
//!
//! ```text
//! P(x) = Σ π_k × N(x | μ_k, σ_k)
//! ```
//!
//! **EM Algorithm**:
//! 1. **E-step**: Compute P(component k | point x) for each point
//! 2. **M-step**: Update μ, σ, π to maximize likelihood
//! 3. Repeat until the log-likelihood stops changing
//!
//! ### K-means
//!
//! Assign each point to the nearest centroid, then move centroids to the
//! mean of their points. Repeat.
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} (x - μ_k)²
//! ```
//!
//! ## Stepping
//!
//! Both engines own only their data and settings. Single steps take the
//! current parameters and return new ones, so a caller can step forward,
//! keep every snapshot, and move back through them without recomputing.
//!
//! ```rust
//! use iterfit::cluster::{Kmeans, Gmm};
//!
//! let data = vec![1.0, 2.0, 3.0, 7.0, 8.0, 9.0];
//!
//! let kmeans = Kmeans::new(data.clone(), 2).unwrap();
//! let step = kmeans.single_iteration(&[2.0, 8.0]).unwrap();
//! assert_eq!(step.assignments, vec![0, 0, 0, 1, 1, 1]);
//!
//! let gmm = Gmm::new(data, 2).unwrap();
//! let state = gmm.fit(None).unwrap();
//! assert_eq!(state.history.len(), state.iteration + 1);
//! ```

mod gmm;
mod kmeans;
mod traits;

pub use gmm::{
    EmStep, GaussianComponent, Gmm, GmmConfig, GmmHistoryStep, GmmState, MixtureEvaluation,
    MIN_SIGMA,
};
pub use kmeans::{ElbowPoint, Kmeans, KmeansCluster, KmeansConfig, KmeansInit, KmeansResult};
pub use traits::{Clustering, SoftClustering};
