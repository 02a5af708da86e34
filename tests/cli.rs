use clap::Parser;
use pretty_assertions::assert_eq;

use vae_flow::cli::Args;
use vae_flow::config::{KlWeighting, ModelFamily};
use vae_flow::error::Error;
use vae_flow::optim::OptimizerKind;

fn parse(args: &[&str]) -> Args {
    Args::try_parse_from(std::iter::once("vae-flow").chain(args.iter().copied())).expect("valid flags")
}

#[test]
fn defaults_follow_the_mnist_setup() {
    let config = parse(&["--nf"]).into_run_config().expect("config");
    assert_eq!(config.encoder.family, ModelFamily::Nf);
    assert_eq!(config.encoder.flow_length, 1);
    assert_eq!(config.seed, 0);
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.max_epochs, 100);
    assert_eq!(config.optimizer, OptimizerKind::Adam);
    assert_eq!(config.kl_weighting, KlWeighting::Fixed { weight: 0.0 });
    assert!(!config.anneal_lr());
}

#[test]
fn flags_reach_the_configuration() {
    let config = parse(&[
        "--iaf", "--flow", "4", "--seed", "7", "--anneal-lr", "--optimizer", "sgd",
        "--kl-anneal-rate", "10", "--epochs", "3",
    ])
    .into_run_config()
    .expect("config");
    assert_eq!(config.encoder.family, ModelFamily::Iaf);
    assert_eq!(config.encoder.flow_length, 4);
    assert_eq!(config.seed, 7);
    assert!(config.anneal_lr());
    assert_eq!(config.optimizer, OptimizerKind::Sgd);
    assert_eq!(config.kl_weighting, KlWeighting::Annealed { rate: 10.0 });
    assert_eq!(config.max_epochs, 3);
}

#[test]
fn family_flags_are_exclusive_and_required() {
    let both = parse(&["--basic", "--iaf"]).into_run_config();
    assert!(matches!(both, Err(Error::Configuration { .. })));
    let none = parse(&[]).into_run_config();
    assert!(matches!(none, Err(Error::Configuration { .. })));
}

#[test]
fn kl_options_conflict() {
    let result = Args::try_parse_from(["vae-flow", "--basic", "--kl-weight", "1", "--kl-anneal-rate", "5"]);
    assert!(result.is_err());
}

#[test]
fn zero_batch_size_is_a_configuration_error() {
    let result = parse(&["--basic", "--batch-size", "0"]).into_run_config();
    assert!(matches!(result, Err(Error::Configuration { .. })));
}

#[test]
fn config_file_replaces_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run.json");
    let mut saved = vae_flow::RunConfig::mnist(ModelFamily::Iaf, 2);
    saved.max_epochs = 5;
    saved.save_json(&path).expect("save");

    let path_arg = path.to_string_lossy().into_owned();
    let loaded = parse(&["--config", &path_arg]).into_run_config().expect("config");
    assert_eq!(loaded, saved);
}
