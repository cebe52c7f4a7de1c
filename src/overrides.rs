//! Manual corrections for games whose feeds are known to be wrong.
//!
//! Loaded from a JSON file keyed by game id:
//!
//! ```json
//! {
//!   "games": {
//!     "2013020610": {
//!       "orientation": { "3": true, "4": false },
//!       "switched_ends": [3, 4]
//!     },
//!     "2015020904": {
//!       "period_fixes": [{ "period": 4, "duration": 300 }]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::warn;

use crate::engine::periods::PeriodType;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedOverrides {
    #[serde(default)]
    pub games: BTreeMap<u64, GameOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameOverride {
    /// Period number → whether the home team defends negative x. For periods
    /// in `switched_ends` this describes the first half of the period.
    #[serde(default)]
    pub orientation: BTreeMap<u8, bool>,
    /// Periods in which the teams changed ends halfway without the feed
    /// saying so.
    #[serde(default)]
    pub switched_ends: BTreeSet<u8>,
    /// Missing or wrong period_end markers.
    #[serde(default)]
    pub period_fixes: Vec<PeriodFix>,
}

/// Sets a period's duration, adding the period if the feed never ended it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeriodFix {
    pub period: u8,
    pub duration: u32,
    /// Only used when the period has to be added.
    #[serde(default = "default_fix_type")]
    pub period_type: PeriodType,
}

fn default_fix_type() -> PeriodType {
    PeriodType::Overtime
}

impl FeedOverrides {
    /// Load overrides from `path`. A missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Overrides file {} not found, known feed defects will not be corrected",
                path.display()
            );
            return Ok(FeedOverrides::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read overrides file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse overrides file {}", path.display()))
    }

    pub fn for_game(&self, game_id: u64) -> Option<&GameOverride> {
        self.games.get(&game_id)
    }
}
