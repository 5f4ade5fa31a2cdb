//! Tunable parameters for route planning.
//!
//! Every level is `#[serde(default)]`, so a partial settings file is completed
//! with the defaults below.

use serde::{Deserialize, Serialize};

use crate::grid::TileType;
use crate::scan::{Contents, ScanLimits};

pub const DEFAULT_MAX_STEPS: u32 = 30;

/// Per-type cost of passing through a tile on the way to the boss
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub fountain: u32,
    pub bonfire: u32,
    pub monster: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            fountain: 1,
            bonfire: 5,
            monster: 3,
        }
    }
}

impl Weights {
    /// Cost contributed by a tile of the given type. The boss always costs 1.
    pub fn of(&self, tile: TileType) -> u64 {
        u64::from(match tile {
            TileType::Fountain => self.fountain,
            TileType::Bonfire => self.bonfire,
            TileType::Monster => self.monster,
            TileType::Boss => 1,
            _ => 0,
        })
    }
}

/// How much a single monster or treasure on a route is worth
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Multipliers {
    pub monster: i64,
    pub treasure: i64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            monster: 1,
            treasure: 1,
        }
    }
}

impl Multipliers {
    pub fn value(&self, contents: Contents) -> i64 {
        i64::from(contents.monsters)
            .saturating_mul(self.monster)
            .saturating_add(i64::from(contents.treasures).saturating_mul(self.treasure))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossSettings {
    /// Only bonfires may connect directly to the boss, for coordinated attacks
    pub only_through_bonfires: bool,
    pub weights: Weights,
}

impl Default for BossSettings {
    fn default() -> Self {
        Self {
            only_through_bonfires: true,
            weights: Weights::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasureSettings {
    /// Only fountains may serve as stops on a treasure run
    pub fountains_only: bool,
    pub multipliers: Multipliers,
}

impl Default for TreasureSettings {
    fn default() -> Self {
        Self {
            fountains_only: true,
            multipliers: Multipliers::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of steps between two consecutive stops
    pub max_steps: u32,
    pub boss: BossSettings,
    pub treasure: TreasureSettings,
    pub limits: ScanLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            boss: BossSettings::default(),
            treasure: TreasureSettings::default(),
            limits: ScanLimits::default(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(json).map(Settings::sanitized)
    }

    /// Replaces values that make no sense for planning with their defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Weights::default();
        if self.max_steps == 0 {
            self.max_steps = DEFAULT_MAX_STEPS;
        }
        let weights = &mut self.boss.weights;
        if weights.fountain == 0 {
            weights.fountain = defaults.fountain;
        }
        if weights.bonfire == 0 {
            weights.bonfire = defaults.bonfire;
        }
        if weights.monster == 0 {
            weights.monster = defaults.monster;
        }
        let multipliers = &mut self.treasure.multipliers;
        if multipliers.monster <= 0 {
            multipliers.monster = Multipliers::default().monster;
        }
        if multipliers.treasure <= 0 {
            multipliers.treasure = Multipliers::default().treasure;
        }
        if self.limits.max_branches == 0 {
            self.limits = ScanLimits::default();
        }
        self
    }
}
