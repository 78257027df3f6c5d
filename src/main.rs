//! TutorQueue - course waitlists and tutor-driven ready checks over Telegram.

use clap::Parser;
use std::process::ExitCode;

use tutorqueue::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Commands::parse();

    // Initialize logging; the guard flushes the file writer on exit.
    let _guard = match logging::init(&args.log_options()) {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
