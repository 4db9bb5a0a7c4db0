use std::process;

use autobuy_cli::cli::{Cli, Commands};
use autobuy_cli::error::exit_code_for;
use autobuy_cli::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use autobuy_cli::{logging, run};
use clap::CommandFactory;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse_from_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout; anything else is a rejected invocation
            if e.use_stderr() {
                load_dotenv();
                run::record_usage_error(&e);
            }
            e.exit();
        }
    };

    // Fast path for help
    if cli.command.is_none() {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Failed to print help: {e}");
        }
        process::exit(EXIT_SUCCESS);
    }

    logging::init(logging::level_for(&cli));

    load_dotenv();

    let exit_code = match cli.command {
        Some(Commands::Run(args)) => {
            tracing::debug!("Running purchase workflow");
            exit_code_for(run::run_workflow_command(args).await)
        }
        Some(Commands::Doctor { config }) => {
            tracing::debug!("Running diagnostics");
            run_doctor(config)
        }
        None => unreachable!(),
    };

    process::exit(exit_code);
}

fn load_dotenv() {
    if let Ok(cwd) = std::env::current_dir() {
        autobuy::env::load_dotenv(&cwd);
    }
}

fn run_doctor(config: Option<PathBuf>) -> i32 {
    use autobuy_cli::doctor::Doctor;

    let mut doctor = Doctor::new();
    match doctor.run_diagnostics(config.as_deref()) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Doctor failed: {e}");
            EXIT_ERROR
        }
    }
}
