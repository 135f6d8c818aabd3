//! Eligibility predicates for the tier and badge roles.
//!
//! The three top tiers share one shape:
//!
//! ```text
//! level AND (secrets OR blood mobs) AND (five OR six OR seven)
//! ```
//!
//! Every comparison requires its threshold to be configured. After each
//! badge is evaluated on its own, the tier cascade is applied: top-plus
//! implies top-normal, top-normal implies top-minus.

use crate::requirements::{Requirements, TierRequirement};
use crate::stats::StatSnapshot;
use serde::{Deserialize, Serialize};

/// Staff vote outcome stored on the linkage record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingOverride {
    pub voted_in: bool,
    pub voted_out: bool,
}

/// Computed eligibility flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub top_plus: bool,
    pub top_normal: bool,
    pub top_minus: bool,
    pub speed: bool,
    pub secret: bool,
}

impl Eligibility {
    /// Whether any of the three top tiers holds.
    pub fn any_tier(&self) -> bool {
        self.top_plus || self.top_normal || self.top_minus
    }

    /// Apply the tier cascade.
    pub fn cascade(mut self) -> Self {
        if self.top_plus {
            self.top_normal = true;
        }
        if self.top_normal {
            self.top_minus = true;
        }
        self
    }
}

fn at_least(stat: u64, threshold: Option<u64>) -> bool {
    threshold.is_some_and(|t| stat >= t)
}

fn within(time_ms: Option<u64>, ceiling_secs: Option<u64>) -> bool {
    match (time_ms, ceiling_secs) {
        (Some(ms), Some(secs)) => ms <= secs.saturating_mul(1000),
        _ => false,
    }
}

/// Level criterion.
///
/// A level of 0 (no profile found) passes regardless of the threshold. This
/// lets statless accounts through the level gate and is kept as-is pending
/// product review; the other gates still apply.
pub fn meets_level(level: u32, req: &TierRequirement) -> bool {
    level == 0 || req.min_level.is_some_and(|min| level >= min)
}

/// Any of the three time ceilings.
pub fn meets_time(stats: &StatSnapshot, req: &TierRequirement) -> bool {
    let times = &stats.best_times;
    within(times.five, req.max_time_five)
        || within(times.six, req.max_time_six)
        || within(times.seven, req.max_time_seven)
}

/// Shared predicate for the three top tiers.
pub fn meets_tier(level: u32, stats: &StatSnapshot, req: &TierRequirement) -> bool {
    meets_level(level, req)
        && (at_least(stats.secrets, req.min_secrets)
            || at_least(stats.blood_mob_kills, req.min_blood_mobs))
        && meets_time(stats, req)
}

/// Top-plus: a vote-in forces eligibility, a vote-out forbids it, otherwise
/// the tier formula decides. A vote-in outranks a vote-out.
pub fn meets_top_plus(
    level: u32,
    stats: &StatSnapshot,
    req: &TierRequirement,
    voting: VotingOverride,
) -> bool {
    if voting.voted_in {
        return true;
    }
    if voting.voted_out {
        return false;
    }
    meets_tier(level, stats, req)
}

/// Speed badge: any time ceiling, no level or secrets gate.
pub fn meets_speed(stats: &StatSnapshot, req: &TierRequirement) -> bool {
    meets_time(stats, req)
}

/// Secret badge: secrets count only.
pub fn meets_secret(stats: &StatSnapshot, req: &TierRequirement) -> bool {
    at_least(stats.secrets, req.min_secrets)
}

/// Evaluate every badge and apply the cascade.
pub fn evaluate(
    level: u32,
    stats: &StatSnapshot,
    requirements: &Requirements,
    voting: VotingOverride,
) -> Eligibility {
    Eligibility {
        top_plus: meets_top_plus(level, stats, &requirements.top_plus, voting),
        top_normal: meets_tier(level, stats, &requirements.top_normal),
        top_minus: meets_tier(level, stats, &requirements.top_minus),
        speed: meets_speed(stats, &requirements.speed),
        secret: meets_secret(stats, &requirements.secret),
    }
    .cascade()
}
