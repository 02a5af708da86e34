use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use vae_flow::cli::Args;
use vae_flow::data::binarized_mnist;
use vae_flow::train::run;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.into_run_config()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut data = binarized_mnist(&args.data, &mut rng)
        .with_context(|| format!("loading data from {}", args.data.display()))?;
    let (dir, outcome) = run(&config, &mut data, &mut rng)?;

    let written = outcome.samples.save_comparisons(dir.path())?;
    info!(
        "Finished {} epochs ({} steps); wrote {} comparison images to {}",
        outcome.epochs.len(),
        outcome.state.step(),
        written.len(),
        dir.path().display()
    );
    Ok(())
}
