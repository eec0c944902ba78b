mod cli;
mod collection;
mod engine;
mod error;
mod logging;
mod model;
mod orchestrator;
mod paths;
mod resolver;
mod run_log;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_interactive = args.is_interactive();

    // The TUI owns the terminal, so diagnostics go to a file there.
    #[cfg(feature = "tui")]
    let _log_guard = if is_interactive {
        logging::init_file()
    } else {
        logging::init_stderr();
        None
    };
    #[cfg(not(feature = "tui"))]
    logging::init_stderr();

    match cli::run(args).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            // Failed or fatally aborted run in a non-interactive mode.
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "nmrunner failed");
            if is_interactive {
                Err(e)
            } else {
                eprintln!("{e:#}");
                std::process::exit(1);
            }
        }
    }
}
