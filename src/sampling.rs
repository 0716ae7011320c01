use std::fmt;
use std::path::Path;

use itertools::Itertools;
use ndarray_rand::rand_distr::{Distribution, Poisson};
use rand::Rng;
use serde_derive::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Parameters of the [`IntervalSampler`]. Missing keys in a config file
/// fall back to the defaults: 24 samples, rate 5, bounds [0, 60].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerParams {
    /// Number of intervals to draw.
    pub count: usize,
    /// Poisson rate (mean), in seconds.
    pub rate: f64,
    /// Lower clamp bound, inclusive.
    pub min: u64,
    /// Upper clamp bound, inclusive.
    pub max: u64,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            count: 24,
            rate: 5.0,
            min: 0,
            max: 60,
        }
    }
}

impl SamplerParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
        let json = std::fs::read_to_string(filepath)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "rate must be a positive number, got {}",
                self.rate
            )));
        }
        if self.min > self.max {
            return Err(Error::invalid_parameter(format!(
                "min ({}) is greater than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Sleep intervals in seconds, in draw order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleList(Vec<u64>);

impl SampleList {
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Prints as a list literal: `[4, 7, 5]`, or `[]` when empty.
impl fmt::Display for SampleList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// Draws Poisson distributed intervals clamped into a closed range.
pub struct IntervalSampler {
    params: SamplerParams,
    distribution: Poisson<f64>,
}

impl IntervalSampler {
    pub fn new(params: SamplerParams) -> Result<Self> {
        params.validate()?;
        let distribution = Poisson::new(params.rate)
            .map_err(|err| Error::invalid_parameter(format!("rate {}: {err}", params.rate)))?;
        Ok(Self {
            params,
            distribution,
        })
    }

    pub fn params(&self) -> &SamplerParams {
        &self.params
    }

    /// Constrains a drawn value into `[min, max]`.
    pub fn clamp(&self, value: f64) -> u64 {
        value.clamp(self.params.min as f64, self.params.max as f64) as u64
    }

    /// Draws `count` intervals. The whole list is built before returning.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampleList {
        let samples = (0..self.params.count)
            .map(|_| self.clamp(self.distribution.sample(rng)))
            .collect::<Vec<_>>();
        debug!(count = samples.len(), rate = self.params.rate, "drew intervals");
        SampleList(samples)
    }
}
