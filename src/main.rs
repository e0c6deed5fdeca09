//! Provides the main entry point to the program.
use ::log::error;
use gridplan::cli::run_cli;
use gridplan::log::is_logger_initialised;
use human_panic::setup_panic;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Any failed precondition (configuration, data, solver) ends the run with a non-zero code
        std::process::exit(1);
    }
}
