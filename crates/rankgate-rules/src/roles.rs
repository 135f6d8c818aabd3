//! Role identifiers and the role reconciler.
//!
//! [`reconcile`] is a pure set function: it strips every role in the managed
//! universe and re-adds exactly the roles the eligibility flags imply. Roles
//! outside the universe pass through untouched, which makes the function
//! idempotent and independent of the input order.

use crate::eligibility::Eligibility;
use crate::requirements::Requirements;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque chat-platform role id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unordered, duplicate-free role set.
pub type RoleSet = BTreeSet<RoleId>;

/// Lowest level that earns a level role.
pub const BUCKET_FLOOR: u32 = 30;
/// Second bucket; also the cap for members without a top tier.
pub const BUCKET_CAP: u32 = 35;
/// First level with its own exact-level role.
pub const EXACT_FLOOR: u32 = 40;
/// Highest level that earns a level role.
pub const EXACT_CEILING: u32 = 60;

/// Every level key the level-role map is expected to contain.
pub fn level_role_keys() -> impl Iterator<Item = u32> {
    [BUCKET_FLOOR, BUCKET_CAP]
        .into_iter()
        .chain(EXACT_FLOOR..=EXACT_CEILING)
}

/// The role ids the reconciler may add or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePlan {
    pub member: RoleId,
    /// Level roles keyed by level: 30, 35 and 40..=60.
    pub levels: BTreeMap<u32, RoleId>,
    pub top_plus: RoleId,
    pub top_normal: RoleId,
    pub top_minus: RoleId,
    pub speed: RoleId,
    pub secret: RoleId,
}

impl RolePlan {
    /// Assemble a plan from the member role, level roles and the badge roles
    /// named by the requirements.
    pub fn new(member: RoleId, levels: BTreeMap<u32, RoleId>, requirements: &Requirements) -> Self {
        Self {
            member,
            levels,
            top_plus: requirements.top_plus.role.clone(),
            top_normal: requirements.top_normal.role.clone(),
            top_minus: requirements.top_minus.role.clone(),
            speed: requirements.speed.role.clone(),
            secret: requirements.secret.role.clone(),
        }
    }

    /// Roles stripped before re-adding: all level roles and all badge roles.
    pub fn removal_set(&self) -> RoleSet {
        let mut set: RoleSet = self.levels.values().cloned().collect();
        set.extend([
            self.top_plus.clone(),
            self.top_normal.clone(),
            self.top_minus.clone(),
            self.speed.clone(),
            self.secret.clone(),
        ]);
        set
    }

    /// Every role this engine may ever touch.
    pub fn managed_universe(&self) -> RoleSet {
        let mut set = self.removal_set();
        set.insert(self.member.clone());
        set
    }

    /// Level role for a whole level.
    ///
    /// `[30,34]` → bucket 30, `[35,39]` → bucket 35, `[40,60]` → the exact
    /// level role, or bucket 35 when no top tier applies. Other levels get
    /// nothing.
    pub fn level_role(&self, level: u32, any_tier: bool) -> Option<&RoleId> {
        let key = match level {
            BUCKET_FLOOR..=34 => BUCKET_FLOOR,
            BUCKET_CAP..=39 => BUCKET_CAP,
            EXACT_FLOOR..=EXACT_CEILING if any_tier => level,
            EXACT_FLOOR..=EXACT_CEILING => BUCKET_CAP,
            _ => return None,
        };
        self.levels.get(&key)
    }
}

/// Compute the member's target role set.
///
/// Removes the whole removal set from `current`, then adds the highest true
/// tier role only, the speed and secret badges independently, the level
/// role, and finally the member role.
pub fn reconcile<'a>(
    current: impl IntoIterator<Item = &'a RoleId>,
    flags: &Eligibility,
    level_role: Option<&RoleId>,
    plan: &RolePlan,
) -> RoleSet {
    let removal = plan.removal_set();
    let mut roles: RoleSet = current
        .into_iter()
        .filter(|role| !removal.contains(*role))
        .cloned()
        .collect();

    if flags.top_plus {
        roles.insert(plan.top_plus.clone());
    } else if flags.top_normal {
        roles.insert(plan.top_normal.clone());
    } else if flags.top_minus {
        roles.insert(plan.top_minus.clone());
    }
    if flags.speed {
        roles.insert(plan.speed.clone());
    }
    if flags.secret {
        roles.insert(plan.secret.clone());
    }
    if let Some(role) = level_role {
        roles.insert(role.clone());
    }
    roles.insert(plan.member.clone());
    roles
}

/// Convenience wrapper: derive the level role from `level` and reconcile.
pub fn reconcile_for_level<'a>(
    current: impl IntoIterator<Item = &'a RoleId>,
    flags: &Eligibility,
    level: u32,
    plan: &RolePlan,
) -> RoleSet {
    let level_role = plan.level_role(level, flags.any_tier());
    reconcile(current, flags, level_role, plan)
}

/// Keep only the baseline roles the member already holds (unverify).
pub fn strip_to_baseline<'a>(
    current: impl IntoIterator<Item = &'a RoleId>,
    baseline: &RoleSet,
) -> RoleSet {
    current
        .into_iter()
        .filter(|role| baseline.contains(*role))
        .cloned()
        .collect()
}

/// Add every baseline role to the member's roles (fix).
pub fn with_baseline<'a>(
    current: impl IntoIterator<Item = &'a RoleId>,
    baseline: &'a RoleSet,
) -> RoleSet {
    current.into_iter().chain(baseline.iter()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> RolePlan {
        let levels = level_role_keys()
            .map(|level| (level, RoleId::new(format!("lvl{level}"))))
            .collect();
        RolePlan {
            member: "member".into(),
            levels,
            top_plus: "tpp".into(),
            top_normal: "tp".into(),
            top_minus: "tpm".into(),
            speed: "speed".into(),
            secret: "secret".into(),
        }
    }

    fn set(ids: &[&str]) -> RoleSet {
        ids.iter().map(|s| RoleId::from(*s)).collect()
    }

    #[test]
    fn only_highest_tier_is_rendered() {
        let plan = plan();
        let flags = Eligibility {
            top_plus: true,
            top_normal: true,
            top_minus: true,
            ..Eligibility::default()
        };
        let out = reconcile_for_level(&set(&[]), &flags, 50, &plan);
        assert!(out.contains(&RoleId::from("tpp")));
        assert!(!out.contains(&RoleId::from("tp")));
        assert!(!out.contains(&RoleId::from("tpm")));
        assert!(out.contains(&RoleId::from("lvl50")));
        assert!(out.contains(&RoleId::from("member")));
    }

    #[test]
    fn stale_managed_roles_are_removed_and_foreign_roles_kept() {
        let plan = plan();
        let current = set(&["booster", "tpp", "speed", "lvl45", "lvl30"]);
        let out = reconcile_for_level(&current, &Eligibility::default(), 32, &plan);
        assert_eq!(out, set(&["booster", "lvl30", "member"]));
    }

    #[test]
    fn level_bands() {
        let plan = plan();
        assert_eq!(plan.level_role(29, true), None);
        assert_eq!(plan.level_role(30, false), Some(&RoleId::from("lvl30")));
        assert_eq!(plan.level_role(34, true), Some(&RoleId::from("lvl30")));
        assert_eq!(plan.level_role(35, true), Some(&RoleId::from("lvl35")));
        assert_eq!(plan.level_role(39, false), Some(&RoleId::from("lvl35")));
        assert_eq!(plan.level_role(40, true), Some(&RoleId::from("lvl40")));
        assert_eq!(plan.level_role(55, false), Some(&RoleId::from("lvl35")));
        assert_eq!(plan.level_role(60, true), Some(&RoleId::from("lvl60")));
        assert_eq!(plan.level_role(61, true), None);
    }

    #[test]
    fn badges_are_independent_of_tiers() {
        let plan = plan();
        let flags = Eligibility {
            speed: true,
            secret: true,
            ..Eligibility::default()
        };
        let out = reconcile_for_level(&set(&[]), &flags, 10, &plan);
        assert_eq!(out, set(&["member", "secret", "speed"]));
    }

    #[test]
    fn baseline_helpers() {
        let baseline = set(&["unverified", "separator"]);
        let current = set(&["separator", "tp", "member"]);
        assert_eq!(strip_to_baseline(&current, &baseline), set(&["separator"]));
        assert_eq!(
            with_baseline(&current, &baseline),
            set(&["member", "separator", "tp", "unverified"])
        );
    }
}
