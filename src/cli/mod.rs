// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses the command line with `clap` and hands off to the
// test use case. There are no subcommands:
//
//   calo-eval -c config.json -r saved/models/run/model_best.mpk
//   calo-eval -r saved/models/run/model_best -d 0,1
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::application::test_use_case::TestUseCase;
use crate::infra::{
    config::{ConfigArgs, EvalConfig},
    logging::init_tracing,
};

#[derive(Parser, Debug)]
#[command(
    name = "calo-eval",
    version,
    about = "Evaluate a trained shower-energy regression checkpoint on the held-out split."
)]
pub struct Cli {
    /// Config file path. Defaults to config.json next to the checkpoint.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Checkpoint to evaluate (.mpk extension optional)
    #[arg(short, long)]
    pub resume: Option<PathBuf>,

    /// Comma separated indices of the GPUs to use, e.g. "0,1"
    #[arg(short, long)]
    pub device: Option<String>,
}

impl From<Cli> for ConfigArgs {
    fn from(cli: Cli) -> Self {
        Self { config: cli.config, resume: cli.resume, device: cli.device }
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = EvalConfig::from_args(self.into())?;
        init_tracing(config.verbosity)?;
        tracing::info!("Using config '{}'", config.source.display());

        let summary = TestUseCase::new(config).execute()?;
        println!("{summary}");
        Ok(())
    }
}
