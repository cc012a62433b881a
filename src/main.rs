use std::process::ExitCode;

use phased_radix::{set_unit_scheduler, sort, Args, SortedArray};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();
    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    set_unit_scheduler(config.scheduler);
    match sort(config.base, &config.values) {
        Ok(outcome) => {
            println!("{}", SortedArray(&outcome.sorted));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Sort failed: {err}");
            ExitCode::FAILURE
        }
    }
}
