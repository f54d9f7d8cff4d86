/// Stepwise CLI
///
/// Parses, checks and runs programs written in structured-algorithm notation.

use stepwise_core::cli;

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
