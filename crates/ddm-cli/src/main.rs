use ddm_core::logging;

mod cli;
mod display;
mod menu;
mod selftest;

fn main() {
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    let code = cli::run_from_args();
    std::process::exit(code);
}
