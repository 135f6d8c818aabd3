//! Property tests for the reconciler, cascade and level table.

use proptest::prelude::*;
use rankgate_rules::roles::level_role_keys;
use rankgate_rules::{
    evaluate, reconcile, reconcile_for_level, BestTimes, Eligibility, LevelTable, Requirements,
    RoleId, RolePlan, RoleSet, StatSnapshot, TierRequirement, VotingOverride,
};
use std::collections::BTreeMap;

fn plan() -> RolePlan {
    let levels: BTreeMap<u32, RoleId> = level_role_keys()
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

fn requirements() -> Requirements {
    Requirements {
        top_plus: TierRequirement {
            min_level: Some(48),
            min_secrets: Some(50_000),
            min_blood_mobs: Some(45_000),
            max_time_six: Some(195),
            ..TierRequirement::disabled("tpp".into())
        },
        top_normal: TierRequirement {
            min_level: Some(45),
            min_secrets: Some(30_000),
            max_time_five: Some(150),
            max_time_six: Some(225),
            ..TierRequirement::disabled("tp".into())
        },
        top_minus: TierRequirement {
            min_level: Some(42),
            min_secrets: Some(20_000),
            max_time_five: Some(165),
            max_time_seven: Some(260),
            ..TierRequirement::disabled("tpm".into())
        },
        speed: TierRequirement {
            max_time_six: Some(170),
            ..TierRequirement::disabled("speed".into())
        },
        secret: TierRequirement {
            min_secrets: Some(100_000),
            ..TierRequirement::disabled("secret".into())
        },
    }
}

/// Role ids drawn from both the managed universe and foreign roles.
fn role_strategy() -> impl Strategy<Value = RoleId> {
    prop_oneof![
        Just(RoleId::from("tpp")),
        Just(RoleId::from("tp")),
        Just(RoleId::from("tpm")),
        Just(RoleId::from("speed")),
        Just(RoleId::from("secret")),
        Just(RoleId::from("member")),
        (30u32..=60).prop_map(|l| RoleId::new(format!("lvl{l}"))),
        "[a-z]{1,8}".prop_map(RoleId::new),
    ]
}

fn flags_strategy() -> impl Strategy<Value = Eligibility> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(top_plus, top_normal, top_minus, speed, secret)| Eligibility {
            top_plus,
            top_normal,
            top_minus,
            speed,
            secret,
        },
    )
}

fn snapshot_strategy() -> impl Strategy<Value = StatSnapshot> {
    (
        0u64..150_000,
        0u64..80_000,
        proptest::option::of(60_000u64..400_000),
        proptest::option::of(60_000u64..400_000),
        proptest::option::of(60_000u64..400_000),
    )
        .prop_map(|(secrets, blood, five, six, seven)| StatSnapshot {
            xp: 0.0,
            secrets,
            blood_mob_kills: blood,
            best_times: BestTimes { five, six, seven },
        })
}

proptest! {
    #[test]
    fn reconcile_is_idempotent(
        current in proptest::collection::vec(role_strategy(), 0..20),
        flags in flags_strategy(),
        level in 0u32..80,
    ) {
        let plan = plan();
        let once = reconcile_for_level(&current, &flags, level, &plan);
        let twice = reconcile_for_level(&once, &flags, level, &plan);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_ignores_input_order(
        current in proptest::collection::vec(role_strategy(), 0..20),
        flags in flags_strategy(),
        level in 0u32..80,
    ) {
        let plan = plan();
        let mut reversed = current.clone();
        reversed.reverse();
        prop_assert_eq!(
            reconcile_for_level(&current, &flags, level, &plan),
            reconcile_for_level(&reversed, &flags, level, &plan)
        );
    }

    #[test]
    fn at_most_one_tier_role_in_output(
        current in proptest::collection::vec(role_strategy(), 0..20),
        flags in flags_strategy(),
        level in 0u32..80,
    ) {
        let plan = plan();
        let out = reconcile_for_level(&current, &flags.cascade(), level, &plan);
        let tiers = [&plan.top_plus, &plan.top_normal, &plan.top_minus]
            .into_iter()
            .filter(|r| out.contains(*r))
            .count();
        prop_assert!(tiers <= 1);
        prop_assert!(out.contains(&plan.member));
    }

    #[test]
    fn foreign_roles_survive(
        foreign in proptest::collection::btree_set("[a-z]{9,12}".prop_map(RoleId::new), 0..8),
        flags in flags_strategy(),
        level in 0u32..80,
    ) {
        let plan = plan();
        let out = reconcile_for_level(&foreign, &flags, level, &plan);
        let universe = plan.managed_universe();
        let passthrough: RoleSet = out.difference(&universe).cloned().collect();
        prop_assert_eq!(passthrough, foreign);
    }

    #[test]
    fn cascade_invariant_holds(
        snapshot in snapshot_strategy(),
        level in 0u32..70,
        voted_in in any::<bool>(),
        voted_out in any::<bool>(),
    ) {
        let reqs = requirements();
        let flags = evaluate(level, &snapshot, &reqs, VotingOverride { voted_in, voted_out });
        if flags.top_plus {
            prop_assert!(flags.top_normal && flags.top_minus);
        }
        if flags.top_normal {
            prop_assert!(flags.top_minus);
        }
    }
}

#[test]
fn level_round_trip_for_every_table_level() {
    let table = LevelTable::catacombs();
    for level in 0..=table.max_level() {
        let xp = table.xp_for_level(level as f64);
        let back = table.level_for_xp(xp);
        assert!(
            (back - level as f64).abs() < 1e-9,
            "level {level}: xp {xp} mapped back to {back}"
        );
    }
}

#[test]
fn explicit_level_role_is_used_verbatim() {
    let plan = plan();
    let custom = RoleId::from("lvl42");
    let out = reconcile(&RoleSet::new(), &Eligibility::default(), Some(&custom), &plan);
    assert!(out.contains(&custom));
}
