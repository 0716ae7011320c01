use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use pcdtools::{
    logging::enable_tracing,
    sampling::{IntervalSampler, SamplerParams},
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::error;

/// Prints a list of Poisson distributed sleep intervals, in seconds.
#[derive(Parser)]
struct CommandLine {
    /// Number of intervals [default: 24]
    #[clap(short, long)]
    count: Option<usize>,
    /// Poisson rate (mean) [default: 5]
    #[clap(long)]
    rate: Option<f64>,
    /// Smallest interval [default: 0]
    #[clap(long)]
    min: Option<u64>,
    /// Largest interval [default: 60]
    #[clap(long)]
    max: Option<u64>,
    /// Seed for a reproducible list
    #[clap(long)]
    seed: Option<u64>,
    /// JSON file with `count`, `rate`, `min` and `max`; flags win over it
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(short, long)]
    verbose: bool,
}

impl CommandLine {
    fn params(&self) -> pcdtools::Result<SamplerParams> {
        let mut params = match &self.config {
            Some(path) => SamplerParams::from_json_file(path)?,
            None => SamplerParams::default(),
        };
        if let Some(count) = self.count {
            params.count = count;
        }
        if let Some(rate) = self.rate {
            params.rate = rate;
        }
        if let Some(min) = self.min {
            params.min = min;
        }
        if let Some(max) = self.max {
            params.max = max;
        }
        Ok(params)
    }
}

fn run(args: &CommandLine) -> pcdtools::Result<()> {
    let sampler = IntervalSampler::new(args.params()?)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("{}", sampler.sample(&mut rng));
    Ok(())
}

fn main() -> ExitCode {
    let args = CommandLine::parse();
    enable_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
