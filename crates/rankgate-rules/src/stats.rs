//! Point-in-time game statistics and profile selection.

use serde::{Deserialize, Serialize};

/// Best S+ completion times in milliseconds: master-mode floors five and
/// six, normal-mode floor seven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTimes {
    pub five: Option<u64>,
    pub six: Option<u64>,
    pub seven: Option<u64>,
}

/// One game profile as reported by the stats provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameProfile {
    /// Display name of the profile ("cute name").
    pub name: String,
    /// Last time the profile was saved (epoch millis), if known.
    pub last_save: Option<i64>,
    /// Dungeon XP on this profile.
    pub xp: f64,
    /// Blood-mob kills on this profile.
    pub blood_mob_kills: u64,
    pub best_times: BestTimes,
}

/// The statistics rule evaluation looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub xp: f64,
    /// Account-wide secrets count (an achievement, not a profile stat).
    pub secrets: u64,
    pub blood_mob_kills: u64,
    pub best_times: BestTimes,
}

impl StatSnapshot {
    /// Snapshot for an account without any usable profile.
    ///
    /// Only the achievement-derived secrets count survives.
    pub fn empty(secrets: u64) -> Self {
        Self {
            secrets,
            ..Self::default()
        }
    }

    /// Snapshot derived from a selected profile plus the account secrets count.
    pub fn from_profile(profile: &GameProfile, secrets: u64) -> Self {
        Self {
            xp: profile.xp,
            secrets,
            blood_mob_kills: profile.blood_mob_kills,
            best_times: profile.best_times,
        }
    }

    /// True when the snapshot carries no profile data at all.
    pub fn is_empty(&self) -> bool {
        self.xp == 0.0 && self.blood_mob_kills == 0 && self.best_times == BestTimes::default()
    }
}

/// The most recently saved profile. Profiles that never recorded a save are skipped.
pub fn newest_profile(profiles: &[GameProfile]) -> Option<&GameProfile> {
    profiles
        .iter()
        .filter(|p| p.last_save.is_some())
        .max_by_key(|p| p.last_save)
}

/// Look up a profile by name, ignoring case.
pub fn profile_by_name<'a>(profiles: &'a [GameProfile], name: &str) -> Option<&'a GameProfile> {
    profiles.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}
