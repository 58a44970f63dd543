//! Synthetic datasets drawn from Gaussian mixtures.
//!
//! Point counts are split across components in proportion to their
//! normalized weights; the points lost to rounding are drawn from
//! weight-randomly chosen components, so the output size always equals the
//! requested total. 1D output is sorted ascending.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::linalg::Point2D;
use rand::prelude::*;
use rand_distr::StandardNormal;
use std::str::FromStr;

/// One component of a 1D generating mixture.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixtureComponent {
    /// Mean.
    pub mean: f64,
    /// Standard deviation.
    pub std_dev: f64,
    /// Relative weight (normalized over the mixture).
    pub weight: f64,
}

impl MixtureComponent {
    /// Create a component.
    pub fn new(mean: f64, std_dev: f64, weight: f64) -> Self {
        Self {
            mean,
            std_dev,
            weight,
        }
    }
}

/// One component of a 2D generating mixture.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MixtureComponent2D {
    /// Mean.
    pub mean: Point2D,
    /// Standard deviation along x.
    pub std_x: f64,
    /// Standard deviation along y.
    pub std_y: f64,
    /// Correlation between x and y, in [-1, 1].
    pub correlation: f64,
    /// Relative weight (normalized over the mixture).
    pub weight: f64,
}

/// Named 1D mixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Preset1d {
    /// Two well-separated equal modes.
    #[default]
    Bimodal,
    /// Three equal modes.
    Trimodal,
    /// Two modes closer than their spread.
    Overlapping,
    /// Two narrow modes far apart.
    Separated,
    /// Evenly spaced wide modes that blend into a plateau.
    Uniform,
}

/// Named 2D mixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Preset2d {
    /// Equal spread, no correlation.
    #[default]
    Circular,
    /// Axis-aligned ellipse.
    Elliptical,
    /// Strong positive correlation.
    Correlated,
    /// Strong negative correlation.
    Anticorrelated,
    /// Long thin cloud, tilted.
    Stretched,
}

impl Preset1d {
    /// Components of this preset.
    pub fn components(self) -> Vec<MixtureComponent> {
        match self {
            Preset1d::Bimodal => vec![
                MixtureComponent::new(-2.0, 1.0, 0.5),
                MixtureComponent::new(3.0, 1.0, 0.5),
            ],
            Preset1d::Trimodal => vec![
                MixtureComponent::new(-4.0, 0.8, 1.0),
                MixtureComponent::new(0.0, 0.8, 1.0),
                MixtureComponent::new(4.0, 0.8, 1.0),
            ],
            Preset1d::Overlapping => vec![
                MixtureComponent::new(0.0, 1.5, 0.5),
                MixtureComponent::new(1.5, 1.5, 0.5),
            ],
            Preset1d::Separated => vec![
                MixtureComponent::new(-6.0, 0.7, 0.5),
                MixtureComponent::new(6.0, 0.7, 0.5),
            ],
            Preset1d::Uniform => (0..5)
                .map(|i| MixtureComponent::new(-4.0 + 2.0 * i as f64, 1.2, 1.0))
                .collect(),
        }
    }
}

impl Preset2d {
    /// Components of this preset.
    pub fn components(self) -> Vec<MixtureComponent2D> {
        let single = |std_x, std_y, correlation| {
            vec![MixtureComponent2D {
                mean: Point2D::default(),
                std_x,
                std_y,
                correlation,
                weight: 1.0,
            }]
        };
        match self {
            Preset2d::Circular => single(1.0, 1.0, 0.0),
            Preset2d::Elliptical => single(2.0, 0.7, 0.0),
            Preset2d::Correlated => single(1.5, 1.5, 0.8),
            Preset2d::Anticorrelated => single(1.5, 1.5, -0.8),
            Preset2d::Stretched => single(3.0, 0.4, 0.5),
        }
    }
}

impl FromStr for Preset1d {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bimodal" => Ok(Preset1d::Bimodal),
            "trimodal" => Ok(Preset1d::Trimodal),
            "overlapping" => Ok(Preset1d::Overlapping),
            "separated" => Ok(Preset1d::Separated),
            "uniform" => Ok(Preset1d::Uniform),
            _ => Err(Error::InvalidParameter {
                name: "preset",
                message: "unknown 1D preset",
            }),
        }
    }
}

impl FromStr for Preset2d {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circular" => Ok(Preset2d::Circular),
            "elliptical" => Ok(Preset2d::Elliptical),
            "correlated" => Ok(Preset2d::Correlated),
            "anticorrelated" => Ok(Preset2d::Anticorrelated),
            "stretched" => Ok(Preset2d::Stretched),
            _ => Err(Error::InvalidParameter {
                name: "preset",
                message: "unknown 2D preset",
            }),
        }
    }
}

/// Settings for [`generate_sample_data`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleConfig {
    /// Exact number of points to produce.
    pub total_points: usize,
    /// Generating mixture.
    pub components: Vec<MixtureComponent>,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self::preset(Preset1d::default())
    }
}

impl SampleConfig {
    /// 100 points from a named preset.
    pub fn preset(preset: Preset1d) -> Self {
        Self {
            total_points: 100,
            components: preset.components(),
            seed: None,
        }
    }

    /// Set the number of points.
    pub fn with_total_points(mut self, total_points: usize) -> Self {
        self.total_points = total_points;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Settings for [`generate_sample_data_2d`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleConfig2D {
    /// Exact number of points to produce.
    pub total_points: usize,
    /// Generating mixture.
    pub components: Vec<MixtureComponent2D>,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for SampleConfig2D {
    fn default() -> Self {
        Self::preset(Preset2d::default())
    }
}

impl SampleConfig2D {
    /// 100 points from a named preset.
    pub fn preset(preset: Preset2d) -> Self {
        Self {
            total_points: 100,
            components: preset.components(),
            seed: None,
        }
    }

    /// Set the number of points.
    pub fn with_total_points(mut self, total_points: usize) -> Self {
        self.total_points = total_points;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

fn seeded_rng(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    }
}

fn check_spread(value: f64, name: &'static str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidParameter {
            name,
            message: "must be finite and >= 0",
        });
    }
    Ok(())
}

/// Normalize weights and split `total` into per-component counts.
///
/// Leftover points from flooring go to components picked at random in
/// proportion to their weight.
fn allocate<R: Rng + ?Sized>(weights: &[f64], total: usize, rng: &mut R) -> Result<Vec<usize>> {
    if weights.is_empty() {
        return Err(Error::EmptyInput);
    }
    for &w in weights {
        check_spread(w, "weight")?;
    }
    let sum: f64 = weights.iter().sum();
    if !(sum > 0.0) || !sum.is_finite() {
        return Err(Error::InvalidParameter {
            name: "weight",
            message: "weights must have a positive finite sum",
        });
    }

    let normalized: Vec<f64> = weights.iter().map(|w| w / sum).collect();
    let mut counts: Vec<usize> = normalized
        .iter()
        .map(|w| (w * total as f64).floor() as usize)
        .collect();

    let allocated: usize = counts.iter().sum();
    for _ in allocated..total {
        let threshold = rng.random::<f64>();
        let mut cumsum = 0.0;
        let mut chosen = normalized.len() - 1;
        for (k, &w) in normalized.iter().enumerate() {
            cumsum += w;
            if w > 0.0 && cumsum > threshold {
                chosen = k;
                break;
            }
        }
        counts[chosen] += 1;
    }
    Ok(counts)
}

/// Draw `config.total_points` values from the configured mixture, sorted
/// ascending.
pub fn generate_sample_data(config: &SampleConfig) -> Result<Vec<f64>> {
    for c in &config.components {
        check_spread(c.std_dev, "std_dev")?;
        if !c.mean.is_finite() {
            return Err(Error::InvalidParameter {
                name: "mean",
                message: "must be finite",
            });
        }
    }

    let mut rng = seeded_rng(config.seed);
    let weights: Vec<f64> = config.components.iter().map(|c| c.weight).collect();
    let counts = allocate(&weights, config.total_points, &mut rng)?;

    let mut data = Vec::with_capacity(config.total_points);
    for (c, &count) in config.components.iter().zip(&counts) {
        for _ in 0..count {
            let z: f64 = rng.sample(StandardNormal);
            data.push(c.mean + c.std_dev * z);
        }
    }
    data.sort_by(f64::total_cmp);
    Ok(data)
}

/// Draw `config.total_points` points from the configured 2D mixture.
///
/// Correlated pairs are built as `x = μx + σx z₁`,
/// `y = μy + σy (ρ z₁ + √(1-ρ²) z₂)`.
pub fn generate_sample_data_2d(config: &SampleConfig2D) -> Result<Vec<Point2D>> {
    for c in &config.components {
        check_spread(c.std_x, "std_x")?;
        check_spread(c.std_y, "std_y")?;
        if !(-1.0..=1.0).contains(&c.correlation) {
            return Err(Error::InvalidParameter {
                name: "correlation",
                message: "must be in [-1, 1]",
            });
        }
        if !c.mean.x.is_finite() || !c.mean.y.is_finite() {
            return Err(Error::InvalidParameter {
                name: "mean",
                message: "must be finite",
            });
        }
    }

    let mut rng = seeded_rng(config.seed);
    let weights: Vec<f64> = config.components.iter().map(|c| c.weight).collect();
    let counts = allocate(&weights, config.total_points, &mut rng)?;

    let mut points = Vec::with_capacity(config.total_points);
    for (c, &count) in config.components.iter().zip(&counts) {
        let rho = c.correlation;
        let residual = (1.0 - rho * rho).max(0.0).sqrt();
        for _ in 0..count {
            let z1: f64 = rng.sample(StandardNormal);
            let z2: f64 = rng.sample(StandardNormal);
            points.push(Point2D::new(
                c.mean.x + c.std_x * z1,
                c.mean.y + c.std_y * (rho * z1 + residual * z2),
            ));
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{mean, variance};

    #[test]
    fn test_default_hundred_points_sorted() {
        let data =
            generate_sample_data(&SampleConfig::default().with_total_points(100)).unwrap();
        assert_eq!(data.len(), 100);
        assert!(data.iter().all(|v| v.is_finite()));
        assert!(data.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_every_preset_exact_size() {
        for preset in [
            Preset1d::Bimodal,
            Preset1d::Trimodal,
            Preset1d::Overlapping,
            Preset1d::Separated,
            Preset1d::Uniform,
        ] {
            // 7 does not split evenly across any preset
            let config = SampleConfig::preset(preset).with_total_points(7).with_seed(1);
            assert_eq!(generate_sample_data(&config).unwrap().len(), 7);
        }
        for preset in [
            Preset2d::Circular,
            Preset2d::Elliptical,
            Preset2d::Correlated,
            Preset2d::Anticorrelated,
            Preset2d::Stretched,
        ] {
            let config = SampleConfig2D::preset(preset).with_total_points(33).with_seed(1);
            let points = generate_sample_data_2d(&config).unwrap();
            assert_eq!(points.len(), 33);
            assert!(points.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = SampleConfig::preset(Preset1d::Trimodal).with_seed(99);
        assert_eq!(
            generate_sample_data(&config).unwrap(),
            generate_sample_data(&config).unwrap()
        );
    }

    #[test]
    fn test_allocation_follows_weights() {
        let mut rng = StdRng::seed_from_u64(0);
        let counts = allocate(&[3.0, 1.0], 100, &mut rng).unwrap();
        assert_eq!(counts, vec![75, 25]);

        let counts = allocate(&[1.0, 1.0, 1.0], 10, &mut rng).unwrap();
        assert_eq!(counts.iter().sum::<usize>(), 10);
        assert!(counts.iter().all(|&c| c >= 3));

        let counts = allocate(&[0.0, 1.0], 5, &mut rng).unwrap();
        assert_eq!(counts, vec![0, 5]);
    }

    #[test]
    fn test_moments_are_plausible() {
        let config = SampleConfig {
            total_points: 4000,
            components: vec![MixtureComponent::new(5.0, 2.0, 1.0)],
            seed: Some(2024),
        };
        let data = generate_sample_data(&config).unwrap();
        assert!((mean(&data) - 5.0).abs() < 0.2);
        assert!((variance(&data).sqrt() - 2.0).abs() < 0.2);
    }

    #[test]
    fn test_correlated_preset_has_positive_correlation() {
        let config = SampleConfig2D::preset(Preset2d::Correlated)
            .with_total_points(2000)
            .with_seed(3);
        let points = generate_sample_data_2d(&config).unwrap();
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        let (mx, my) = (mean(&xs), mean(&ys));
        let cov =
            points.iter().map(|p| (p.x - mx) * (p.y - my)).sum::<f64>() / points.len() as f64;
        let rho = cov / (variance(&xs) * variance(&ys)).sqrt();
        assert!((rho - 0.8).abs() < 0.1);
    }

    #[test]
    fn test_invalid_configs() {
        let bad_std = SampleConfig {
            total_points: 10,
            components: vec![MixtureComponent::new(0.0, -1.0, 1.0)],
            seed: None,
        };
        assert!(generate_sample_data(&bad_std).is_err());

        let zero_weights = SampleConfig {
            total_points: 10,
            components: vec![MixtureComponent::new(0.0, 1.0, 0.0)],
            seed: None,
        };
        assert!(generate_sample_data(&zero_weights).is_err());

        let empty = SampleConfig {
            total_points: 10,
            components: vec![],
            seed: None,
        };
        assert_eq!(generate_sample_data(&empty).unwrap_err(), Error::EmptyInput);

        let mut bad_rho = SampleConfig2D::default();
        bad_rho.components[0].correlation = 1.5;
        assert!(generate_sample_data_2d(&bad_rho).is_err());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!("bimodal".parse::<Preset1d>().unwrap(), Preset1d::Bimodal);
        assert_eq!(" Uniform ".parse::<Preset1d>().unwrap(), Preset1d::Uniform);
        assert_eq!(
            "anticorrelated".parse::<Preset2d>().unwrap(),
            Preset2d::Anticorrelated
        );
        assert!("spiral".parse::<Preset2d>().is_err());
    }
}
