//! Ticket types the workflow can purchase

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Price of one Lotto 6/45 game
pub const LOTTO645_GAME_PRICE: u64 = 1_000;

/// Largest number of Lotto 6/45 games one purchase step accepts
pub const LOTTO645_MAX_GAMES: u32 = 5;

/// Lotto 720 purchases are a fixed set of five tickets
pub const LOTTO720_PRICE: u64 = 5_000;

/// A purchase step, in the order purchases run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    /// Lotto 6/45
    Lotto645,
    /// Lotto 720
    Lotto720,
}

impl PurchaseKind {
    /// Every kind, in purchase order
    pub const ALL: [PurchaseKind; 2] = [PurchaseKind::Lotto645, PurchaseKind::Lotto720];

    /// Step name used in the audit log
    pub fn step_name(&self) -> &'static str {
        match self {
            PurchaseKind::Lotto645 => "lotto645",
            PurchaseKind::Lotto720 => "lotto720",
        }
    }

    /// Agent script performing the purchase
    pub fn script(&self) -> &'static str {
        match self {
            PurchaseKind::Lotto645 => "lotto645.py",
            PurchaseKind::Lotto720 => "lotto720.py",
        }
    }
}

impl fmt::Display for PurchaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step_name())
    }
}

impl FromStr for PurchaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lotto645" | "645" => Ok(PurchaseKind::Lotto645),
            "lotto720" | "720" => Ok(PurchaseKind::Lotto720),
            other => Err(format!("unknown ticket type '{other}'")),
        }
    }
}

/// How Lotto 6/45 games are chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lotto645Mode {
    /// Machine-picked games
    Auto {
        /// Number of games, 1 to [`LOTTO645_MAX_GAMES`]
        games: u32,
    },
    /// One game with the given six numbers
    Manual {
        /// Six distinct numbers between 1 and 45
        numbers: Vec<u32>,
    },
}

impl Default for Lotto645Mode {
    fn default() -> Self {
        Lotto645Mode::Auto {
            games: LOTTO645_MAX_GAMES,
        }
    }
}

impl Lotto645Mode {
    /// Cost of the purchase in whole currency units
    pub fn cost(&self) -> u64 {
        match self {
            Lotto645Mode::Auto { games } => u64::from(*games) * LOTTO645_GAME_PRICE,
            Lotto645Mode::Manual { .. } => LOTTO645_GAME_PRICE,
        }
    }

    /// Arguments passed to the purchase agent
    pub fn arguments(&self) -> Vec<String> {
        match self {
            Lotto645Mode::Auto { .. } => vec![self.cost().to_string()],
            Lotto645Mode::Manual { numbers } => {
                let mut sorted = numbers.clone();
                sorted.sort_unstable();
                sorted.iter().map(u32::to_string).collect()
            }
        }
    }

    /// Check the game count or the manual numbers
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Lotto645Mode::Auto { games } => {
                if (1..=LOTTO645_MAX_GAMES).contains(games) {
                    Ok(())
                } else {
                    Err(format!(
                        "games must be between 1 and {LOTTO645_MAX_GAMES}, got {games}"
                    ))
                }
            }
            Lotto645Mode::Manual { numbers } => {
                if numbers.len() != 6 {
                    return Err(format!("exactly 6 numbers are required, got {}", numbers.len()));
                }
                if let Some(n) = numbers.iter().find(|n| !(1..=45).contains(*n)) {
                    return Err(format!("numbers must be between 1 and 45, got {n}"));
                }
                let distinct: BTreeSet<_> = numbers.iter().collect();
                if distinct.len() != numbers.len() {
                    return Err("numbers must not contain duplicates".to_string());
                }
                Ok(())
            }
        }
    }
}

/// Cost of one purchase step
pub fn purchase_cost(kind: PurchaseKind, lotto645: &Lotto645Mode) -> u64 {
    match kind {
        PurchaseKind::Lotto645 => lotto645.cost(),
        PurchaseKind::Lotto720 => LOTTO720_PRICE,
    }
}
