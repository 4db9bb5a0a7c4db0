use autobuy::{Lotto645Mode, PurchaseKind, WorkflowConfig};
use clap::{Args, Parser, Subcommand};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "autobuy")]
#[command(version)]
#[command(about = "Check the deposit balance, top it up if needed, and buy tickets")]
#[command(long_about = "
autobuy runs the purchase workflow unattended, typically from a scheduler.
It checks the spendable balance, tops the deposit up when it is below the
configured minimum, then runs each enabled purchase in order. Every step and
decision is appended to a daily audit log.

Example usage:
  autobuy run                 # Buy every enabled ticket type
  autobuy run --lotto720      # Only buy Lotto 720
  autobuy doctor              # Check interpreter, agent scripts and log directory
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the balance check, top-up and purchase workflow
    #[command(long_about = "
Runs the workflow once:

1. Optionally refresh the login session (--login)
2. Check the balance; a balance that cannot be read stops the run
3. Top up by the configured amount when the balance is below the minimum
4. Run each enabled purchase in order, stopping at the first failure

Exit codes:
  0 - Every enabled purchase succeeded
  1 - A step failed
  2 - Invalid configuration or flags
  3 - The balance could not be read from the balance step
  4 - The audit log could not be written

Examples:
  autobuy run
  autobuy run --lotto645 --games 3
  autobuy run --lotto645 --numbers 3,11,19,27,35,42
  autobuy run --min-balance 20000 --top-up 20000
")]
    Run(RunArgs),
    /// Diagnose configuration and setup issues
    #[command(long_about = "
Checks that the configuration validates, the interpreter and every agent
script exist, and the audit log directory is usable.

Exit codes:
  0 - All checks passed
  1 - Warnings found
  2 - Errors found
")]
    Doctor {
        /// Configuration file to use instead of searching for autobuy.yaml
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Only buy Lotto 6/45
    #[arg(long, conflicts_with = "lotto720")]
    pub lotto645: bool,

    /// Only buy Lotto 720
    #[arg(long)]
    pub lotto720: bool,

    /// Number of automatic Lotto 6/45 games (1-5)
    #[arg(long, conflicts_with = "numbers")]
    pub games: Option<u32>,

    /// Six Lotto 6/45 numbers for one manual game, comma separated
    #[arg(long, value_delimiter = ',')]
    pub numbers: Option<Vec<u32>>,

    /// Refresh the login session before checking the balance
    #[arg(long)]
    pub login: bool,

    /// Top up when the balance is below this amount
    #[arg(long)]
    pub min_balance: Option<u64>,

    /// Amount to top up by (5000, 10000 or 20000)
    #[arg(long)]
    pub top_up: Option<u64>,

    /// Directory for the daily audit logs
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Directory holding the agent scripts
    #[arg(long)]
    pub scripts_dir: Option<PathBuf>,

    /// Configuration file to use instead of searching for autobuy.yaml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Purchases selected by the ticket toggles, `None` meaning all
    pub fn selected_purchases(&self) -> Option<Vec<PurchaseKind>> {
        match (self.lotto645, self.lotto720) {
            (true, false) => Some(vec![PurchaseKind::Lotto645]),
            (false, true) => Some(vec![PurchaseKind::Lotto720]),
            _ => None,
        }
    }

    /// Apply flag overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut WorkflowConfig) {
        if let Some(purchases) = self.selected_purchases() {
            config.purchases = purchases;
        }
        if let Some(games) = self.games {
            config.lotto645 = Lotto645Mode::Auto { games };
        }
        if let Some(numbers) = &self.numbers {
            config.lotto645 = Lotto645Mode::Manual {
                numbers: numbers.clone(),
            };
        }
        if self.login {
            config.login_first = true;
        }
        if let Some(min_balance) = self.min_balance {
            config.min_balance = min_balance;
        }
        if let Some(top_up) = self.top_up {
            config.top_up_amount = top_up;
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
        if let Some(scripts_dir) = &self.scripts_dir {
            config.scripts_dir = scripts_dir.clone();
        }
    }
}

impl Cli {
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_run(args: &[&str]) -> RunArgs {
        let mut argv = vec!["autobuy", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from_args(argv).unwrap().command {
            Some(Commands::Run(run)) => run,
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_help_works() {
        let result = Cli::try_parse_from_args(["autobuy", "--help"]);
        let error = result.unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_works() {
        let result = Cli::try_parse_from_args(["autobuy", "--version"]);
        let error = result.unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_no_subcommand() {
        let cli = Cli::try_parse_from_args(["autobuy"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.debug);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_run_defaults_to_all_purchases() {
        let run = parse_run(&[]);
        assert_eq!(run.selected_purchases(), None);
        assert!(!run.login);
    }

    #[test]
    fn test_run_single_ticket_toggle() {
        assert_eq!(
            parse_run(&["--lotto645"]).selected_purchases(),
            Some(vec![PurchaseKind::Lotto645])
        );
        assert_eq!(
            parse_run(&["--lotto720"]).selected_purchases(),
            Some(vec![PurchaseKind::Lotto720])
        );
    }

    #[test]
    fn test_ticket_toggles_are_mutually_exclusive() {
        let error =
            Cli::try_parse_from_args(["autobuy", "run", "--lotto645", "--lotto720"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_games_and_numbers_are_mutually_exclusive() {
        let error = Cli::try_parse_from_args([
            "autobuy", "run", "--games", "2", "--numbers", "1,2,3,4,5,6",
        ])
        .unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_numbers_are_comma_separated() {
        let run = parse_run(&["--numbers", "7,1,30,12,45,3"]);
        assert_eq!(run.numbers, Some(vec![7, 1, 30, 12, 45, 3]));
    }

    #[test]
    fn test_apply_to_overrides_config() {
        let run = parse_run(&[
            "--lotto645",
            "--games",
            "2",
            "--login",
            "--min-balance",
            "3000",
            "--top-up",
            "5000",
            "--log-dir",
            "/var/log/autobuy",
        ]);
        let mut config = WorkflowConfig::with_project_root("/srv/autobuy");
        run.apply_to(&mut config);

        assert_eq!(config.purchases, vec![PurchaseKind::Lotto645]);
        assert_eq!(config.lotto645, Lotto645Mode::Auto { games: 2 });
        assert!(config.login_first);
        assert_eq!(config.min_balance, 3000);
        assert_eq!(config.top_up_amount, 5000);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/autobuy"));
        assert_eq!(config.scripts_dir, PathBuf::from("/srv/autobuy/src"));
    }

    #[test]
    fn test_doctor_subcommand() {
        let cli = Cli::try_parse_from_args(["autobuy", "doctor"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Doctor { config: None })));
    }

    #[test]
    fn test_cli_invalid_subcommand() {
        let error = Cli::try_parse_from_args(["autobuy", "invalid"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
