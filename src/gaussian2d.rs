//! Bivariate normal fitting: closed-form MLE and gradient descent.
//!
//! # Log-likelihood
//!
//! ```text
//! ln L = Σᵢ [ -ln(2π) - ½ ln|Σ| - ½ dᵢᵀ Σ⁻¹ dᵢ ],   dᵢ = xᵢ - μ
//! ```
//!
//! # Gradients
//!
//! Gradient descent minimizes the mean negative log-likelihood `-ln L / n`.
//! With `S = Σ⁻¹` and `C = (1/n) Σᵢ dᵢ dᵢᵀ` (scatter about the current mean):
//!
//! ```text
//! ∂/∂μ = -S (x̄ - μ)
//! ∂/∂Σ = ½ (S - S C S)
//! ```
//!
//! `xy` appears twice in the symmetric matrix, so its partial derivative is
//! twice the off-diagonal entry of `∂/∂Σ`.
//!
//! # Steps
//!
//! Steps precondition the gradient with the Fisher information (the natural
//! gradient), which keeps the step size independent of the scale of `Σ`:
//!
//! ```text
//! μ ← μ + η (x̄ - μ)
//! Σ ← Σ - η (Σ - C)
//! ```
//!
//! and halve `η` until the projected result does not lower the
//! log-likelihood.
//!
//! Every operation that produces a covariance projects it back onto the
//! positive-definite cone (see [`Covariance2::project_positive_definite`]).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::linalg::{Covariance2, Ellipse, Point2D, MIN_VARIANCE};
use std::f64::consts::PI;
use tracing::{debug, trace};

/// Bivariate normal with the log-likelihood it scored on the engine's data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gaussian2d {
    /// Mean vector.
    pub mu: Point2D,
    /// Covariance matrix.
    pub sigma: Covariance2,
    /// Log-likelihood of the data under this Gaussian (`-∞` until evaluated).
    ///
    /// Every Gaussian returned by [`Gaussian2dFit`] is evaluated and finite.
    /// An unevaluated one does not survive a JSON round-trip, since JSON has
    /// no infinity.
    pub log_likelihood: f64,
}

impl Gaussian2d {
    /// Create an unevaluated Gaussian.
    pub fn new(mu: Point2D, sigma: Covariance2) -> Self {
        Self {
            mu,
            sigma,
            log_likelihood: f64::NEG_INFINITY,
        }
    }

    /// Correlation coefficient of the covariance, in [-1, 1].
    pub fn correlation(&self) -> f64 {
        self.sigma.correlation()
    }

    /// Confidence ellipse spanning `n_std` standard deviations.
    pub fn ellipse(&self, n_std: f64) -> Ellipse {
        self.sigma.ellipse(n_std)
    }
}

/// Gradient of the mean negative log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gradients2d {
    /// With respect to the mean.
    pub mu_grad: Point2D,
    /// With respect to `xx`, `yy` and `xy`.
    pub sigma_grad: Covariance2,
}

impl Gradients2d {
    fn zero() -> Self {
        Self {
            mu_grad: Point2D::default(),
            sigma_grad: Covariance2::new(0.0, 0.0, 0.0),
        }
    }
}

/// Output of one gradient-descent step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientStep {
    /// Updated, projected parameters.
    pub gaussian: Gaussian2d,
    /// Log-likelihood of `gaussian`.
    pub log_likelihood: f64,
    /// Rate actually applied after backtracking (0 if no step was taken).
    pub learning_rate: f64,
}

/// One entry of a gradient-descent history.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gaussian2dSnapshot {
    /// Parameters at this iteration.
    pub gaussian: Gaussian2d,
    /// Iteration number (0: the initial guess).
    pub iteration: usize,
    /// Log-likelihood of `gaussian`.
    pub log_likelihood: f64,
}

/// Result of a gradient-descent run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gaussian2dState {
    /// Final parameters.
    pub gaussian: Gaussian2d,
    /// Number of steps taken.
    pub iteration: usize,
    /// Final log-likelihood.
    pub log_likelihood: f64,
    /// Whether |ΔlogL| dropped below the tolerance before the cap.
    pub converged: bool,
    /// One entry per iteration, starting at iteration 0.
    pub history: Vec<Gaussian2dSnapshot>,
}

/// Gradient-descent settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientDescentConfig {
    /// Stop once |ΔlogL| falls below this.
    pub tol: f64,
    /// Maximum number of steps.
    pub max_iter: usize,
    /// Diagonal floor of the projected covariance.
    pub min_variance: f64,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            max_iter: 500,
            min_variance: MIN_VARIANCE,
        }
    }
}

/// Suggested learning rate. With rates in (0, 1] each step moves the mean
/// toward the sample mean and `Σ` toward the scatter `C`.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Backtracking gives up after this many halvings of the learning rate.
const MAX_HALVINGS: usize = 40;

/// 2D Gaussian engine over a fixed point set.
#[derive(Debug, Clone)]
pub struct Gaussian2dFit {
    data: Vec<Point2D>,
    config: GradientDescentConfig,
}

impl Gaussian2dFit {
    /// Create an engine. Empty data is allowed: the log-likelihood is 0 and
    /// every gradient is zero.
    pub fn new(data: Vec<Point2D>) -> Self {
        Self {
            data,
            config: GradientDescentConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: GradientDescentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// The dataset.
    pub fn data(&self) -> &[Point2D] {
        &self.data
    }

    fn project(&self, sigma: Covariance2) -> Covariance2 {
        sigma.project_positive_definite(self.config.min_variance)
    }

    fn sample_mean(&self) -> Point2D {
        if self.data.is_empty() {
            return Point2D::default();
        }
        let n = self.data.len() as f64;
        let (sx, sy) = self
            .data
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / n, sy / n)
    }

    /// `(1/n) Σ (xᵢ - c)(xᵢ - c)ᵀ`.
    fn scatter(&self, center: Point2D) -> Covariance2 {
        let n = self.data.len() as f64;
        let (xx, yy, xy) = self.data.iter().fold((0.0, 0.0, 0.0), |(xx, yy, xy), p| {
            let dx = p.x - center.x;
            let dy = p.y - center.y;
            (xx + dx * dx, yy + dy * dy, xy + dx * dy)
        });
        Covariance2::new(xx / n, yy / n, xy / n)
    }

    /// Sum of log-densities over the data.
    ///
    /// `-∞` for a singular covariance; `0.0` for empty data.
    pub fn calculate_log_likelihood(&self, gaussian: &Gaussian2d) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let Some(inv) = gaussian.sigma.inverse() else {
            return f64::NEG_INFINITY;
        };
        let n = self.data.len() as f64;
        let norm = -(2.0 * PI).ln() - 0.5 * gaussian.sigma.determinant().ln();
        let quad: f64 = self
            .data
            .iter()
            .map(|p| inv.quad_form(p.x - gaussian.mu.x, p.y - gaussian.mu.y))
            .sum();
        n * norm - 0.5 * quad
    }

    fn evaluated(&self, mu: Point2D, sigma: Covariance2) -> Gaussian2d {
        let mut g = Gaussian2d::new(mu, self.project(sigma));
        g.log_likelihood = self.calculate_log_likelihood(&g);
        g
    }

    /// Starting guess for gradient descent: the sample mean with an
    /// isotropic covariance whose variance is the mean of the two marginal
    /// variances. Identity covariance around the origin for empty data.
    pub fn initialize_gaussian(&self) -> Gaussian2d {
        if self.data.is_empty() {
            return self.evaluated(Point2D::default(), Covariance2::identity());
        }
        let mu = self.sample_mean();
        let scatter = self.scatter(mu);
        self.evaluated(mu, Covariance2::isotropic(0.5 * scatter.trace()))
    }

    /// Closed-form maximum-likelihood fit: sample mean and (biased) sample
    /// covariance, projected to stay positive-definite.
    pub fn fit_mle(&self) -> Gaussian2d {
        if self.data.is_empty() {
            return self.evaluated(Point2D::default(), Covariance2::identity());
        }
        let mu = self.sample_mean();
        self.evaluated(mu, self.scatter(mu))
    }

    /// Analytic gradient of the mean negative log-likelihood.
    ///
    /// All zeros when the data is empty or the covariance is singular.
    pub fn calculate_gradients(&self, gaussian: &Gaussian2d) -> Gradients2d {
        if self.data.is_empty() {
            return Gradients2d::zero();
        }
        let Some(s) = gaussian.sigma.inverse() else {
            return Gradients2d::zero();
        };

        let mean = self.sample_mean();
        let dx = mean.x - gaussian.mu.x;
        let dy = mean.y - gaussian.mu.y;
        let mu_grad = Point2D::new(-(s.xx * dx + s.xy * dy), -(s.xy * dx + s.yy * dy));

        let scs = s.conjugate(&self.scatter(gaussian.mu));
        let sigma_grad = Covariance2::new(
            0.5 * (s.xx - scs.xx),
            0.5 * (s.yy - scs.yy),
            s.xy - scs.xy,
        );

        Gradients2d { mu_grad, sigma_grad }
    }

    /// Descent direction: the gradient preconditioned by the Fisher
    /// information of the current Gaussian.
    ///
    /// For the mean this is `Σ · ∂/∂μ = -(x̄ - μ)`; for the covariance it is
    /// `2 Σ (∂/∂Σ) Σ = Σ - C`, so the step size no longer depends on how
    /// concentrated `Σ` is.
    fn descent_direction(&self, gaussian: &Gaussian2d) -> Gradients2d {
        let grad = self.calculate_gradients(gaussian);
        let s = gaussian.sigma;
        let g = grad.mu_grad;
        let mu_grad = Point2D::new(s.xx * g.x + s.xy * g.y, s.xy * g.x + s.yy * g.y);
        // The xy gradient already counts both off-diagonal entries.
        let middle = Covariance2::new(
            2.0 * grad.sigma_grad.xx,
            2.0 * grad.sigma_grad.yy,
            grad.sigma_grad.xy,
        );
        Gradients2d {
            mu_grad,
            sigma_grad: s.conjugate(&middle),
        }
    }

    fn descend(&self, gaussian: &Gaussian2d, direction: &Gradients2d, rate: f64) -> Gaussian2d {
        let mu = Point2D::new(
            gaussian.mu.x - rate * direction.mu_grad.x,
            gaussian.mu.y - rate * direction.mu_grad.y,
        );
        let sigma = Covariance2::new(
            gaussian.sigma.xx - rate * direction.sigma_grad.xx,
            gaussian.sigma.yy - rate * direction.sigma_grad.yy,
            gaussian.sigma.xy - rate * direction.sigma_grad.xy,
        );
        self.evaluated(mu, sigma)
    }

    /// Step with backtracking: halve the rate until the projected result
    /// scores at least as well as the start. Returns the start unchanged
    /// (with rate 0) when no halving helps.
    fn backtracking_step(&self, gaussian: &Gaussian2d, learning_rate: f64) -> GradientStep {
        let start = self.evaluated(gaussian.mu, gaussian.sigma);
        let direction = self.descent_direction(&start);

        let mut rate = learning_rate;
        for _ in 0..=MAX_HALVINGS {
            let candidate = self.descend(&start, &direction, rate);
            if candidate.log_likelihood >= start.log_likelihood {
                return GradientStep {
                    gaussian: candidate,
                    log_likelihood: candidate.log_likelihood,
                    learning_rate: rate,
                };
            }
            rate *= 0.5;
        }

        GradientStep {
            gaussian: start,
            log_likelihood: start.log_likelihood,
            learning_rate: 0.0,
        }
    }

    /// One descent step followed by projection onto the positive-definite
    /// cone.
    ///
    /// The step follows the natural gradient (see the module docs) and
    /// halves `learning_rate` until the log-likelihood does not decrease.
    pub fn gradient_descent_step(&self, gaussian: &Gaussian2d, learning_rate: f64) -> Gaussian2d {
        self.backtracking_step(gaussian, learning_rate).gaussian
    }

    /// [`Gaussian2dFit::gradient_descent_step`] paired with the new
    /// log-likelihood and the rate actually taken.
    pub fn single_gradient_descent_step(
        &self,
        gaussian: &Gaussian2d,
        learning_rate: f64,
    ) -> GradientStep {
        self.backtracking_step(gaussian, learning_rate)
    }

    /// Iterate gradient descent until |ΔlogL| < `tol` or `max_iter` steps.
    ///
    /// Starts from `initial` (projected and re-scored) or from
    /// [`Gaussian2dFit::initialize_gaussian`]. A step that lowered the
    /// log-likelihood never counts as convergence.
    pub fn fit_with_gradient_descent(
        &self,
        initial: Option<Gaussian2d>,
        learning_rate: f64,
    ) -> Gaussian2dState {
        let mut gaussian = match initial {
            Some(g) => self.evaluated(g.mu, g.sigma),
            None => self.initialize_gaussian(),
        };

        let mut history = vec![Gaussian2dSnapshot {
            gaussian,
            iteration: 0,
            log_likelihood: gaussian.log_likelihood,
        }];
        let mut iteration = 0;
        let mut converged = false;

        for iter in 1..=self.config.max_iter {
            let step = self.single_gradient_descent_step(&gaussian, learning_rate);
            let improved = step.log_likelihood >= gaussian.log_likelihood;
            let delta = (step.log_likelihood - gaussian.log_likelihood).abs();

            gaussian = step.gaussian;
            iteration = iter;
            history.push(Gaussian2dSnapshot {
                gaussian,
                iteration: iter,
                log_likelihood: step.log_likelihood,
            });
            trace!(
                iteration = iter,
                log_likelihood = step.log_likelihood,
                delta,
                rate = step.learning_rate,
                "gradient step"
            );

            if improved && delta < self.config.tol {
                converged = true;
                break;
            }
        }

        debug!(
            iterations = iteration,
            log_likelihood = gaussian.log_likelihood,
            converged,
            learning_rate,
            "gradient descent finished"
        );

        Gaussian2dState {
            gaussian,
            iteration,
            log_likelihood: gaussian.log_likelihood,
            converged,
            history,
        }
    }

    /// Density of `gaussian` at `point`; 0 for a singular covariance.
    pub fn density(point: Point2D, gaussian: &Gaussian2d) -> f64 {
        let Some(inv) = gaussian.sigma.inverse() else {
            return 0.0;
        };
        let q = inv.quad_form(point.x - gaussian.mu.x, point.y - gaussian.mu.y);
        (-0.5 * q).exp() / (2.0 * PI * gaussian.sigma.determinant().sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ellipse_data() -> Vec<Point2D> {
        (0..20)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / 20.0;
                Point2D::new(2.0 + 2.0 * t.cos(), 1.0 + t.sin() + 0.5 * t.cos())
            })
            .collect()
    }

    fn mean_nll(fit: &Gaussian2dFit, g: &Gaussian2d) -> f64 {
        -fit.calculate_log_likelihood(g) / fit.data().len() as f64
    }

    #[test]
    fn test_single_point_converges() {
        let fit = Gaussian2dFit::new(vec![Point2D::new(1.0, 2.0)]);
        let state = fit.fit_with_gradient_descent(None, DEFAULT_LEARNING_RATE);

        assert!(state.converged);
        assert!((state.gaussian.mu.x - 1.0).abs() < 0.1);
        assert!((state.gaussian.mu.y - 2.0).abs() < 0.1);
        assert!(state.gaussian.sigma.xx >= MIN_VARIANCE);
        assert!(state.gaussian.sigma.yy >= MIN_VARIANCE);
        assert_eq!(state.history.len(), state.iteration + 1);
    }

    #[test]
    fn test_mle_matches_sample_moments() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let g = fit.fit_mle();
        assert!((g.mu.x - 2.0).abs() < 1e-12);
        assert!((g.mu.y - 1.0).abs() < 1e-12);
        assert!((g.sigma.xx - 2.0).abs() < 1e-12);
        assert!((g.sigma.yy - 0.625).abs() < 1e-12);
        assert!((g.sigma.xy - 0.5).abs() < 1e-12);
        assert!(g.log_likelihood.is_finite());
    }

    #[test]
    fn test_gradients_vanish_at_mle() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let grad = fit.calculate_gradients(&fit.fit_mle());
        assert!(grad.mu_grad.x.abs() < 1e-9);
        assert!(grad.mu_grad.y.abs() < 1e-9);
        assert!(grad.sigma_grad.xx.abs() < 1e-9);
        assert!(grad.sigma_grad.yy.abs() < 1e-9);
        assert!(grad.sigma_grad.xy.abs() < 1e-9);
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let fit = Gaussian2dFit::new(vec![
            Point2D::new(0.0, 1.0),
            Point2D::new(2.0, -1.0),
            Point2D::new(1.5, 0.5),
            Point2D::new(-0.5, 2.0),
        ]);
        let g = Gaussian2d::new(Point2D::new(0.3, -0.2), Covariance2::new(1.5, 0.8, 0.3));
        let grad = fit.calculate_gradients(&g);
        let h = 1e-6;

        let numeric = |perturb: &dyn Fn(&mut Gaussian2d, f64)| {
            let mut plus = g;
            let mut minus = g;
            perturb(&mut plus, h);
            perturb(&mut minus, -h);
            (mean_nll(&fit, &plus) - mean_nll(&fit, &minus)) / (2.0 * h)
        };

        let cases: [(f64, &dyn Fn(&mut Gaussian2d, f64)); 5] = [
            (grad.mu_grad.x, &|g: &mut Gaussian2d, d: f64| g.mu.x += d),
            (grad.mu_grad.y, &|g: &mut Gaussian2d, d: f64| g.mu.y += d),
            (grad.sigma_grad.xx, &|g: &mut Gaussian2d, d: f64| g.sigma.xx += d),
            (grad.sigma_grad.yy, &|g: &mut Gaussian2d, d: f64| g.sigma.yy += d),
            (grad.sigma_grad.xy, &|g: &mut Gaussian2d, d: f64| g.sigma.xy += d),
        ];
        for (analytic, perturb) in cases {
            let fd = numeric(perturb);
            assert!((analytic - fd).abs() < 1e-5, "analytic {analytic} vs numeric {fd}");
        }
    }

    #[test]
    fn test_gradient_descent_approaches_mle() {
        let fit = Gaussian2dFit::new(ellipse_data()).with_max_iter(5000);
        let mle = fit.fit_mle();
        let state = fit.fit_with_gradient_descent(None, DEFAULT_LEARNING_RATE);

        assert!(state.log_likelihood > state.history[0].log_likelihood);
        assert!(state.log_likelihood <= mle.log_likelihood + 1e-9);
        assert!((state.gaussian.mu.x - 2.0).abs() < 1e-6);
        assert!((state.gaussian.sigma.xx - mle.sigma.xx).abs() < 0.05);
        assert!((state.gaussian.sigma.yy - mle.sigma.yy).abs() < 0.05);
        assert!((state.gaussian.sigma.xy - mle.sigma.xy).abs() < 0.05);
    }

    #[test]
    fn test_huge_learning_rate_stays_positive_definite() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let mut g = Gaussian2d::new(Point2D::new(-5.0, 5.0), Covariance2::new(0.05, 0.05, 0.0));
        for _ in 0..20 {
            g = fit.gradient_descent_step(&g, 50.0);
            assert!(g.sigma.is_positive_definite(), "{:?}", g.sigma);
            assert!(g.correlation().abs() <= 1.0);
        }
    }

    fn assert_monotone(state: &Gaussian2dState) {
        for pair in state.history.windows(2) {
            assert!(
                pair[1].log_likelihood >= pair[0].log_likelihood,
                "log-likelihood fell from {} to {} at iteration {}",
                pair[0].log_likelihood,
                pair[1].log_likelihood,
                pair[1].iteration
            );
        }
    }

    #[test]
    fn test_single_point_from_initial_guess() {
        let fit = Gaussian2dFit::new(vec![Point2D::new(1.0, 2.0)]);
        let guesses = [
            Gaussian2d::new(Point2D::new(0.0, 0.0), Covariance2::identity()),
            Gaussian2d::new(Point2D::new(5.0, -3.0), Covariance2::new(2.0, 2.0, 0.5)),
            Gaussian2d::new(Point2D::new(-10.0, 10.0), Covariance2::isotropic(0.01)),
        ];

        for guess in guesses {
            let state = fit.fit_with_gradient_descent(Some(guess), DEFAULT_LEARNING_RATE);
            assert!(state.converged, "no convergence from {:?}", guess.mu);
            assert!((state.gaussian.mu.x - 1.0).abs() < 0.1, "{:?}", state.gaussian);
            assert!((state.gaussian.mu.y - 2.0).abs() < 0.1, "{:?}", state.gaussian);
            assert!(state.gaussian.sigma.xx >= MIN_VARIANCE);
            assert!(state.gaussian.sigma.yy >= MIN_VARIANCE);
            assert_monotone(&state);
        }
    }

    #[test]
    fn test_tight_cluster_from_initial_guess() {
        let data = vec![
            Point2D::new(1.0, 2.0),
            Point2D::new(1.05, 2.02),
            Point2D::new(0.97, 1.96),
            Point2D::new(1.02, 2.03),
        ];
        let fit = Gaussian2dFit::new(data);
        let mean = fit.fit_mle().mu;

        for guess in [
            Gaussian2d::new(Point2D::new(0.0, 0.0), Covariance2::identity()),
            Gaussian2d::new(Point2D::new(5.0, -3.0), Covariance2::new(2.0, 2.0, 0.5)),
        ] {
            let state = fit.fit_with_gradient_descent(Some(guess), DEFAULT_LEARNING_RATE);
            assert!(state.converged);
            assert!((state.gaussian.mu.x - mean.x).abs() < 0.1);
            assert!((state.gaussian.mu.y - mean.y).abs() < 0.1);
            assert!(state.gaussian.sigma.is_positive_definite());
            assert_monotone(&state);
        }
    }

    #[test]
    fn test_far_initial_guess_reaches_mle() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let mle = fit.fit_mle();
        let guess = Gaussian2d::new(Point2D::new(-5.0, 5.0), Covariance2::isotropic(0.05));
        let state = fit.fit_with_gradient_descent(Some(guess), DEFAULT_LEARNING_RATE);

        assert!(state.converged);
        assert!((state.gaussian.mu.x - 2.0).abs() < 1e-2);
        assert!((state.gaussian.mu.y - 1.0).abs() < 1e-2);
        assert!((state.gaussian.sigma.xx - mle.sigma.xx).abs() < 0.05);
        assert!((state.gaussian.sigma.yy - mle.sigma.yy).abs() < 0.05);
        assert!((state.gaussian.sigma.xy - mle.sigma.xy).abs() < 0.05);
        assert_monotone(&state);
    }

    #[test]
    fn test_oversized_rate_backtracks() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let mut from = Gaussian2d::new(Point2D::new(2.5, 1.0), fit.fit_mle().sigma);
        from.log_likelihood = fit.calculate_log_likelihood(&from);

        let step = fit.single_gradient_descent_step(&from, 50.0);
        assert!(step.learning_rate < 50.0);
        assert!(step.log_likelihood >= from.log_likelihood);

        let step = fit.single_gradient_descent_step(&from, f64::NAN);
        assert_eq!(step.learning_rate, 0.0);
        assert_eq!(step.gaussian, from);
    }

    #[test]
    fn test_single_step_agrees_with_direct_step() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let g = fit.initialize_gaussian();
        let direct = fit.gradient_descent_step(&g, 0.05);
        let wrapped = fit.single_gradient_descent_step(&g, 0.05);
        assert_eq!(wrapped.gaussian, direct);
        assert_eq!(wrapped.log_likelihood, fit.calculate_log_likelihood(&direct));
    }

    #[test]
    fn test_singular_covariance() {
        let fit = Gaussian2dFit::new(ellipse_data());
        let g = Gaussian2d::new(Point2D::new(0.0, 0.0), Covariance2::new(1.0, 1.0, 1.0));
        assert_eq!(fit.calculate_log_likelihood(&g), f64::NEG_INFINITY);
        let grad = fit.calculate_gradients(&g);
        assert_eq!(grad, Gradients2d::zero());
        assert_eq!(Gaussian2dFit::density(Point2D::new(0.0, 0.0), &g), 0.0);

        // A singular initial guess is projected before iterating.
        let state = fit.fit_with_gradient_descent(Some(g), 0.01);
        assert!(state.history[0].gaussian.sigma.is_positive_definite());
        assert!(state.history[0].log_likelihood.is_finite());
    }

    #[test]
    fn test_empty_data() {
        let fit = Gaussian2dFit::new(Vec::new());
        let g = fit.initialize_gaussian();
        assert_eq!(g.sigma, Covariance2::identity());
        assert_eq!(fit.calculate_log_likelihood(&g), 0.0);
        assert_eq!(fit.calculate_gradients(&g), Gradients2d::zero());
        let state = fit.fit_with_gradient_descent(None, DEFAULT_LEARNING_RATE);
        assert!(state.converged);
        assert_eq!(state.iteration, 1);
    }

    #[test]
    fn test_density_peak() {
        let g = Gaussian2d::new(Point2D::new(1.0, 1.0), Covariance2::identity());
        let peak = Gaussian2dFit::density(Point2D::new(1.0, 1.0), &g);
        assert!((peak - 1.0 / (2.0 * PI)).abs() < 1e-15);
    }
}
