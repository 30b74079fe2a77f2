mod args;
mod tally;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::tally::run_count;

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("arguments: {:?}", args);

    if let Err(e) = run_count(&args) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
