//! Dungeon XP ↔ level conversion.
//!
//! A [`LevelTable`] is a monotonically increasing list of cumulative XP
//! values where index `i` is the XP required to reach level `i`. The table
//! is configuration: the conversion functions never assume a particular
//! shape beyond monotonicity.

use crate::error::RulesError;

/// Cumulative XP per level for the catacombs skill, levels 0..=99.
const CATACOMBS_XP: [u64; 100] = [
    0, 50, 125, 235, 395, 625, 955, 1425, 2095, 3045, 4385, 6275, 8940, 12700, 17960, 25340,
    35640, 50040, 70040, 97640, 135640, 188140, 259640, 356640, 488640, 668640, 911640,
    1239640, 1684640, 2284640, 3084640, 4149640, 5559640, 7459640, 9959640, 13259640,
    17559640, 23159640, 30359640, 39559640, 51559640, 66559640, 85559640, 109559640,
    139559640, 177559640, 225559640, 285559640, 360559640, 453559640, 569809640, 769809640,
    969809640, 1169809640, 1369809640, 1569809640, 1769809640, 1969809640, 2169809640,
    2369809640, 2569809640, 2769809640, 2969809640, 3169809640, 3369809640, 3569809640,
    3769809640, 3969809640, 4169809640, 4369809640, 4569809640, 4769809640, 4969809640,
    5169809640, 5369809640, 5569809640, 5769809640, 5969809640, 6169809640, 6369809640,
    6569809640, 6769809640, 6969809640, 7169809640, 7369809640, 7569809640, 7769809640,
    7969809640, 8169809640, 8369809640, 8569809640, 8769809640, 8969809640, 9169809640,
    9369809640, 9569809640, 9769809640, 9969809640, 10169809640, 10369809640,
];

/// Piecewise-linear mapping between cumulative XP and (fractional) level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    cumulative: Vec<u64>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::catacombs()
    }
}

impl LevelTable {
    /// Build a table from cumulative XP values.
    ///
    /// The first entry must be `0` (level 0 at 0 XP), there must be at least
    /// one level above it, and values must strictly increase.
    pub fn new(cumulative: Vec<u64>) -> Result<Self, RulesError> {
        if cumulative.len() < 2 {
            return Err(RulesError::LevelTableTooShort(cumulative.len()));
        }
        if cumulative[0] != 0 {
            return Err(RulesError::LevelTableOrigin(cumulative[0]));
        }
        if let Some(level) = cumulative.windows(2).position(|w| w[1] <= w[0]) {
            return Err(RulesError::LevelTableNotIncreasing(level as u32 + 1));
        }
        Ok(Self { cumulative })
    }

    /// The built-in catacombs table.
    pub fn catacombs() -> Self {
        Self {
            cumulative: CATACOMBS_XP.to_vec(),
        }
    }

    /// Highest level described by the table.
    pub fn max_level(&self) -> u32 {
        (self.cumulative.len() - 1) as u32
    }

    /// Cumulative XP values, index = level.
    pub fn cumulative(&self) -> &[u64] {
        &self.cumulative
    }

    /// Fractional level for an XP total.
    ///
    /// Non-positive XP is level 0; XP at or past the last entry saturates at
    /// [`max_level`](Self::max_level).
    pub fn level_for_xp(&self, xp: f64) -> f64 {
        if xp.is_nan() || xp <= 0.0 {
            return 0.0;
        }
        let Some(idx) = self.cumulative.iter().position(|&c| c as f64 > xp) else {
            return self.max_level() as f64;
        };
        let lower = self.cumulative[idx - 1] as f64;
        let upper = self.cumulative[idx] as f64;
        (idx - 1) as f64 + (xp - lower) / (upper - lower)
    }

    /// Whole level reached for an XP total (what roles and nicknames show).
    pub fn whole_level(&self, xp: f64) -> u32 {
        self.level_for_xp(xp).floor() as u32
    }

    /// Cumulative XP needed to reach `level`, interpolating fractional levels.
    ///
    /// Saturates at 0 below level 0 and at the last entry above the table.
    pub fn xp_for_level(&self, level: f64) -> f64 {
        if level.is_nan() || level <= 0.0 {
            return 0.0;
        }
        let max = self.max_level() as f64;
        if level >= max {
            return self.cumulative[self.cumulative.len() - 1] as f64;
        }
        let base = level.floor() as usize;
        let frac = level - base as f64;
        let lower = self.cumulative[base] as f64;
        let upper = self.cumulative[base + 1] as f64;
        lower + frac * (upper - lower)
    }

    /// XP required to go from level `from` to level `to` (negative when `to < from`).
    pub fn xp_between(&self, from: f64, to: f64) -> f64 {
        self.xp_for_level(to) - self.xp_for_level(from)
    }
}
