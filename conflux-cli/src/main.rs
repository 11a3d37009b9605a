//! Entry point for the `conflux` binary.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = conflux_cli::run() {
        eprintln!("conflux: {err}");
        std::process::exit(1);
    }
}
