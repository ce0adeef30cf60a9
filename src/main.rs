mod args;
mod kobo;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("args: {:?}", args);

    if let Err(e) = kobo::run(&args) {
        eprintln!("An error occured: {}", e);
        let mut cause = std::error::Error::source(e.as_ref());
        while let Some(c) = cause {
            eprintln!("  caused by: {}", c);
            cause = std::error::Error::source(c);
        }
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
