//! Step through EM on bimodal sample data, then compare with K-means and a
//! 2D gradient-descent fit.
//!
//! ```sh
//! cargo run --example em_walkthrough
//! ```

use iterfit::cluster::{Gmm, Kmeans};
use iterfit::gaussian2d::{Gaussian2dFit, DEFAULT_LEARNING_RATE};
use iterfit::sample::{
    generate_sample_data, generate_sample_data_2d, Preset2d, SampleConfig, SampleConfig2D,
};
use iterfit::{ModelState, Result};

fn main() -> Result<()> {
    let data = generate_sample_data(&SampleConfig::default().with_seed(7))?;
    println!("{} points in [{:.2}, {:.2}]", data.len(), data[0], data[data.len() - 1]);

    let gmm = Gmm::new(data.clone(), 2)?;
    let mut components = gmm.initialize_components();
    println!("iter 0  logL = {:.4}", gmm.calculate_log_likelihood(&components));
    for iter in 1..=5 {
        let step = gmm.single_em_step(&components)?;
        println!("iter {iter}  logL = {:.4}", step.log_likelihood);
        components = step.components;
    }

    let state: ModelState = gmm.fit(None)?.into();
    println!(
        "{}: {} iterations, converged = {}, logL = {:.4}",
        state.mode(),
        state.iteration(),
        state.converged(),
        state.objective()
    );
    if let ModelState::Gmm(s) = &state {
        for c in &s.components {
            println!("  mu = {:7.3}  sigma = {:6.3}  pi = {:.3}", c.mu, c.sigma, c.pi);
        }
    }

    let kmeans = Kmeans::new(data, 2)?.with_seed(7);
    let history = kmeans.run()?;
    if let Some(last) = history.last() {
        println!("kmeans: centroids = {:?}, inertia = {:.4}", last.centroids, last.inertia);
    }
    for point in kmeans.find_optimal_k(5)? {
        println!("  k = {}  inertia = {:.4}", point.k, point.inertia);
    }

    let points =
        generate_sample_data_2d(&SampleConfig2D::preset(Preset2d::Correlated).with_seed(7))?;
    let fit = Gaussian2dFit::new(points);
    let mle = fit.fit_mle();
    let gd = fit.fit_with_gradient_descent(None, DEFAULT_LEARNING_RATE);
    println!(
        "2d: mle logL = {:.4}, gradient descent logL = {:.4} after {} steps (rho = {:.3})",
        mle.log_likelihood,
        gd.log_likelihood,
        gd.iteration,
        gd.gaussian.correlation()
    );

    Ok(())
}
