//! dupctl CLI: parse arguments, build the effective configuration, run the
//! scan-and-resolve pipeline, and translate the outcome to an exit code
//! (spec §6: 0 success, 1 configuration error, 2 missing dependency or
//! refusal, 130 cancelled by operator).

use clap::Parser;
use dupctl::arg_parser::{Cli, build_run_config};
use dupctl::engine::run::run;
use dupctl::error::{Cancelled, exit_code};
use dupctl::types::RunSummary;
use dupctl::utils::setup_logging;
use std::time::Instant;

/// Distinguishes a configuration-time failure from a failure during the run
/// itself, since the two map to different exit codes.
enum Failure {
    Config(anyhow::Error),
    Run(anyhow::Error),
}

fn execute(cli: &Cli) -> Result<RunSummary, Failure> {
    let cfg = build_run_config(cli).map_err(Failure::Config)?;
    run(&cfg, cli.resume).map_err(Failure::Run)
}

fn main() {
    let start_time = Instant::now();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let code = match execute(&cli) {
        Ok(summary) => {
            log::info!(
                "{} group(s), {} byte(s) wasted, {} byte(s) reclaimed",
                summary.groups_found,
                summary.bytes_wasted,
                summary.bytes_reclaimed
            );
            exit_code::SUCCESS
        }
        Err(Failure::Config(e)) => {
            log::error!("{e:#}");
            exit_code::CONFIG_ERROR
        }
        Err(Failure::Run(e)) => {
            log::error!("{e:#}");
            if e.downcast_ref::<Cancelled>().is_some() {
                exit_code::CANCELLED
            } else {
                exit_code::REFUSAL
            }
        }
    };

    log::debug!("Total time: {:?}", start_time.elapsed());
    std::process::exit(code);
}
