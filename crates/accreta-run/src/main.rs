//! accreta-run, the batch driver.
//!
//! Loads the parameter file, then processes every tree file in the
//! configured range. Files are independent (each one's output is
//! self-contained), so they fan out across the thread pool; a file whose
//! first catalogue already exists is skipped, which makes re-runs after an
//! abort idempotent.

mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::pipeline::{FileContext, PipelineError};

#[derive(Parser, Debug)]
#[command(name = "accreta-run")]
#[command(about = "Evolve galaxies along dark-matter merger forests")]
struct Cli {
    /// Path to the JSON parameter file
    params: PathBuf,

    /// Process tree files one at a time instead of in parallel
    #[arg(long)]
    serial: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accreta=info,accreta_run=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let ctx = FileContext::load(&cli.params)?;
    let files: Vec<i32> =
        (ctx.params.files.first_file..=ctx.params.files.last_file).collect();
    info!(files = files.len(), "starting run");

    if cli.serial {
        for &file_nr in &files {
            pipeline::process_file(&ctx, file_nr)?;
        }
    } else {
        files
            .par_iter()
            .try_for_each(|&file_nr| pipeline::process_file(&ctx, file_nr))?;
    }

    info!("run complete");
    Ok(())
}
