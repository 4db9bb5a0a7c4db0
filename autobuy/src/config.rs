//! Workflow configuration
//!
//! A [`WorkflowConfig`] is built once at process start and handed to the
//! orchestrator by reference. Values are resolved from, in increasing order
//! of precedence:
//! 1. Built-in defaults
//! 2. `AUTOBUY_*` environment variables
//! 3. An `autobuy.yaml` file
//! 4. Command-line flags, applied by the caller before [`WorkflowConfig::validate`]

use crate::env::{resolve_path, EnvLoader};
use crate::error::ConfigError;
use crate::step::Step;
use crate::ticket::{purchase_cost, Lotto645Mode, PurchaseKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the optional YAML configuration file
pub const CONFIG_FILE_NAME: &str = "autobuy.yaml";

/// Default balance below which the account is topped up
pub const DEFAULT_MIN_BALANCE: u64 = 10_000;

/// Default top-up amount
pub const DEFAULT_TOP_UP_AMOUNT: u64 = 10_000;

/// Amounts the funding agent can charge
pub const ALLOWED_TOP_UP_AMOUNTS: [u64; 3] = [5_000, 10_000, 20_000];

/// Step names outside the purchase steps
pub mod step_names {
    /// Explicit session login
    pub const LOGIN: &str = "login";
    /// Balance check
    pub const BALANCE: &str = "balance";
    /// Deposit top-up
    pub const CHARGE: &str = "charge";
}

/// Immutable configuration for one workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Directory the agents run in
    pub project_root: PathBuf,
    /// Interpreter used to launch every agent
    pub interpreter: PathBuf,
    /// Directory holding the agent scripts
    pub scripts_dir: PathBuf,
    /// Directory holding the daily audit logs
    pub log_dir: PathBuf,
    /// Balance below which the account is topped up
    pub min_balance: u64,
    /// Amount charged when topping up
    pub top_up_amount: u64,
    /// Enabled purchase steps
    pub purchases: Vec<PurchaseKind>,
    /// Lotto 6/45 game selection
    pub lotto645: Lotto645Mode,
    /// Run the login agent before checking the balance
    pub login_first: bool,
}

impl WorkflowConfig {
    /// Defaults rooted at `project_root`
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            interpreter: default_interpreter(&project_root),
            scripts_dir: project_root.join("src"),
            log_dir: project_root.join("logs"),
            project_root,
            min_balance: DEFAULT_MIN_BALANCE,
            top_up_amount: DEFAULT_TOP_UP_AMOUNT,
            purchases: PurchaseKind::ALL.to_vec(),
            lotto645: Lotto645Mode::default(),
            login_first: false,
        }
    }

    /// Defaults overridden by `AUTOBUY_*` environment variables
    pub fn from_env() -> Self {
        let loader = EnvLoader::default();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_root = loader.load_path("HOME", &cwd).unwrap_or(cwd);

        let mut config = Self::with_project_root(project_root);
        config.apply_env_vars(&loader);
        config
    }

    /// Environment, then the YAML file at `path` or the first one found
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        let yaml = match path {
            Some(path) => Some(YamlConfig::load_from_file(path)?),
            None => match Self::find_yaml_config_file(&config.project_root) {
                Some(found) => Some(YamlConfig::load_from_file(found)?),
                None => {
                    tracing::debug!("No {} found, using environment and defaults", CONFIG_FILE_NAME);
                    None
                }
            },
        };
        if let Some(yaml) = yaml {
            yaml.apply_to_config(&mut config);
        }
        Ok(config)
    }

    fn apply_env_vars(&mut self, loader: &EnvLoader) {
        let root = self.project_root.clone();
        if let Some(interpreter) = loader.load_path("PYTHON", &root) {
            self.interpreter = interpreter;
        }
        if let Some(scripts_dir) = loader.load_path("SCRIPTS_DIR", &root) {
            self.scripts_dir = scripts_dir;
        }
        if let Some(log_dir) = loader.load_path("LOG_DIR", &root) {
            self.log_dir = log_dir;
        }
        self.min_balance = loader.load_parsed("MIN_BALANCE", self.min_balance);
        self.top_up_amount = loader.load_parsed("TOP_UP_AMOUNT", self.top_up_amount);
        if let Some(games) = loader.load_raw("LOTTO645_GAMES") {
            match games.trim().parse() {
                Ok(games) => self.lotto645 = Lotto645Mode::Auto { games },
                Err(_) => tracing::warn!("Ignoring unparsable {}", loader.key("LOTTO645_GAMES")),
            }
        }
        self.login_first = loader.load_bool("LOGIN_FIRST", self.login_first);
    }

    /// Find `autobuy.yaml` in the project root, then `~/.config/autobuy/`
    pub fn find_yaml_config_file(project_root: &Path) -> Option<PathBuf> {
        let mut candidates = vec![project_root.join(CONFIG_FILE_NAME)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("autobuy").join(CONFIG_FILE_NAME));
        }
        candidates.into_iter().find(|path| path.is_file())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.purchases.is_empty() {
            return Err(ConfigError::NoPurchasesEnabled);
        }

        if !ALLOWED_TOP_UP_AMOUNTS.contains(&self.top_up_amount) {
            return Err(ConfigError::InvalidValue {
                field: "top_up_amount".to_string(),
                value: self.top_up_amount.to_string(),
                hint: format!(
                    "top_up_amount must be one of {}",
                    ALLOWED_TOP_UP_AMOUNTS
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }

        if self.purchases.contains(&PurchaseKind::Lotto645) {
            if let Err(problem) = self.lotto645.validate() {
                return Err(match &self.lotto645 {
                    Lotto645Mode::Auto { games } => ConfigError::InvalidValue {
                        field: "lotto645_games".to_string(),
                        value: games.to_string(),
                        hint: problem,
                    },
                    Lotto645Mode::Manual { .. } => ConfigError::Validation {
                        message: format!("lotto645_numbers: {problem}"),
                    },
                });
            }
        }

        let spend = self.planned_spend();
        if self.min_balance < spend {
            tracing::warn!(
                "min_balance ({}) is below the planned spend ({}); purchases may fail for lack of funds",
                self.min_balance,
                spend
            );
        }

        Ok(())
    }

    /// Enabled purchases, deduplicated, in purchase order
    pub fn enabled_purchases(&self) -> Vec<PurchaseKind> {
        let mut kinds = self.purchases.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Total cost of the enabled purchases
    pub fn planned_spend(&self) -> u64 {
        self.enabled_purchases()
            .into_iter()
            .map(|kind| purchase_cost(kind, &self.lotto645))
            .sum()
    }

    /// Path of an agent script
    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }

    /// Environment passed to every agent
    pub fn step_environment(&self) -> HashMap<String, String> {
        HashMap::from([("PYTHONUNBUFFERED".to_string(), "1".to_string())])
    }

    fn agent_step(&self, name: &str, script: &str) -> Step {
        Step::new(name, &self.interpreter).arg(self.script_path(script))
    }

    /// Step that refreshes the login session
    pub fn login_step(&self) -> Step {
        self.agent_step(step_names::LOGIN, "login.py")
    }

    /// Step that prints the spendable balance
    pub fn balance_step(&self) -> Step {
        self.agent_step(step_names::BALANCE, "balance.py")
    }

    /// Step that tops up the deposit by the configured amount
    pub fn charge_step(&self) -> Step {
        self.agent_step(step_names::CHARGE, "charge.py")
            .arg(self.top_up_amount.to_string())
    }

    /// Step that buys tickets of `kind`
    pub fn purchase_step(&self, kind: PurchaseKind) -> Step {
        let step = self.agent_step(kind.step_name(), kind.script());
        match kind {
            PurchaseKind::Lotto645 => step.args(self.lotto645.arguments()),
            PurchaseKind::Lotto720 => step,
        }
    }
}

fn default_interpreter(project_root: &Path) -> PathBuf {
    if cfg!(windows) {
        project_root.join(".venv").join("Scripts").join("python.exe")
    } else {
        project_root.join(".venv").join("bin").join("python")
    }
}

/// Values accepted in `autobuy.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    /// Interpreter path
    pub interpreter: Option<PathBuf>,
    /// Agent script directory
    pub scripts_dir: Option<PathBuf>,
    /// Audit log directory
    pub log_dir: Option<PathBuf>,
    /// Top-up threshold
    pub min_balance: Option<u64>,
    /// Top-up amount
    pub top_up_amount: Option<u64>,
    /// Enabled purchase steps
    pub purchases: Option<Vec<PurchaseKind>>,
    /// Lotto 6/45 auto game count
    pub lotto645_games: Option<u32>,
    /// Lotto 6/45 manual numbers, taking precedence over the game count
    pub lotto645_numbers: Option<Vec<u32>>,
    /// Run the login agent first
    pub login_first: Option<bool>,
}

impl YamlConfig {
    /// Load YAML configuration from a file path
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse YAML content
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply values present in the file; relative paths resolve against the project root
    pub fn apply_to_config(&self, config: &mut WorkflowConfig) {
        let root = config.project_root.clone();
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = resolve_path(&root, interpreter);
        }
        if let Some(scripts_dir) = &self.scripts_dir {
            config.scripts_dir = resolve_path(&root, scripts_dir);
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = resolve_path(&root, log_dir);
        }
        if let Some(min_balance) = self.min_balance {
            config.min_balance = min_balance;
        }
        if let Some(top_up_amount) = self.top_up_amount {
            config.top_up_amount = top_up_amount;
        }
        if let Some(purchases) = &self.purchases {
            config.purchases = purchases.clone();
        }
        if let Some(games) = self.lotto645_games {
            config.lotto645 = Lotto645Mode::Auto { games };
        }
        if let Some(numbers) = &self.lotto645_numbers {
            config.lotto645 = Lotto645Mode::Manual {
                numbers: numbers.clone(),
            };
        }
        if let Some(login_first) = self.login_first {
            config.login_first = login_first;
        }
    }
}
