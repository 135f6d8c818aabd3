//! Badge thresholds.
//!
//! Every numeric field is optional. An absent threshold means the criterion
//! can never be satisfied, not that it is waived.

use crate::error::RulesError;
use crate::roles::RoleId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five stat-gated roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    TopPlus,
    TopNormal,
    TopMinus,
    Speed,
    Secret,
}

impl Badge {
    pub const ALL: [Badge; 5] = [
        Badge::TopPlus,
        Badge::TopNormal,
        Badge::TopMinus,
        Badge::Speed,
        Badge::Secret,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Badge::TopPlus => "top_plus",
            Badge::TopNormal => "top_normal",
            Badge::TopMinus => "top_minus",
            Badge::Speed => "speed",
            Badge::Secret => "secret",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| RulesError::UnknownBadge(s.to_string()))
    }
}

/// One editable threshold of a [`TierRequirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementField {
    MinLevel,
    MinSecrets,
    MinBloodMobs,
    MaxTimeFive,
    MaxTimeSix,
    MaxTimeSeven,
}

impl RequirementField {
    pub const ALL: [RequirementField; 6] = [
        RequirementField::MinLevel,
        RequirementField::MinSecrets,
        RequirementField::MinBloodMobs,
        RequirementField::MaxTimeFive,
        RequirementField::MaxTimeSix,
        RequirementField::MaxTimeSeven,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequirementField::MinLevel => "min_level",
            RequirementField::MinSecrets => "min_secrets",
            RequirementField::MinBloodMobs => "min_blood_mobs",
            RequirementField::MaxTimeFive => "max_time_five",
            RequirementField::MaxTimeSix => "max_time_six",
            RequirementField::MaxTimeSeven => "max_time_seven",
        }
    }
}

impl fmt::Display for RequirementField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementField {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequirementField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| RulesError::UnknownRequirement(s.to_string()))
    }
}

/// Thresholds for one badge. Time ceilings are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_secrets: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_blood_mobs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_five: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_six: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_seven: Option<u64>,
    /// Role granted when the badge is earned.
    pub role: RoleId,
}

impl TierRequirement {
    /// A requirement with every criterion disabled.
    pub fn disabled(role: RoleId) -> Self {
        Self {
            min_level: None,
            min_secrets: None,
            min_blood_mobs: None,
            max_time_five: None,
            max_time_six: None,
            max_time_seven: None,
            role,
        }
    }

    pub fn get(&self, field: RequirementField) -> Option<u64> {
        match field {
            RequirementField::MinLevel => self.min_level.map(u64::from),
            RequirementField::MinSecrets => self.min_secrets,
            RequirementField::MinBloodMobs => self.min_blood_mobs,
            RequirementField::MaxTimeFive => self.max_time_five,
            RequirementField::MaxTimeSix => self.max_time_six,
            RequirementField::MaxTimeSeven => self.max_time_seven,
        }
    }

    /// Set or clear (`None`) one threshold.
    pub fn set(&mut self, field: RequirementField, value: Option<u64>) -> Result<(), RulesError> {
        match field {
            RequirementField::MinLevel => {
                self.min_level = value
                    .map(|v| {
                        u32::try_from(v).map_err(|_| RulesError::ValueOutOfRange {
                            field: field.as_str(),
                            value: v,
                        })
                    })
                    .transpose()?;
            }
            RequirementField::MinSecrets => self.min_secrets = value,
            RequirementField::MinBloodMobs => self.min_blood_mobs = value,
            RequirementField::MaxTimeFive => self.max_time_five = value,
            RequirementField::MaxTimeSix => self.max_time_six = value,
            RequirementField::MaxTimeSeven => self.max_time_seven = value,
        }
        Ok(())
    }
}

/// Thresholds for all five badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub top_plus: TierRequirement,
    pub top_normal: TierRequirement,
    pub top_minus: TierRequirement,
    pub speed: TierRequirement,
    pub secret: TierRequirement,
}

impl Requirements {
    pub fn get(&self, badge: Badge) -> &TierRequirement {
        match badge {
            Badge::TopPlus => &self.top_plus,
            Badge::TopNormal => &self.top_normal,
            Badge::TopMinus => &self.top_minus,
            Badge::Speed => &self.speed,
            Badge::Secret => &self.secret,
        }
    }

    pub fn get_mut(&mut self, badge: Badge) -> &mut TierRequirement {
        match badge {
            Badge::TopPlus => &mut self.top_plus,
            Badge::TopNormal => &mut self.top_normal,
            Badge::TopMinus => &mut self.top_minus,
            Badge::Speed => &mut self.speed,
            Badge::Secret => &mut self.secret,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Badge, &TierRequirement)> {
        Badge::ALL.into_iter().map(move |b| (b, self.get(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_badge_and_field_names() {
        assert_eq!("top_plus".parse::<Badge>().unwrap(), Badge::TopPlus);
        assert!("topPlus".parse::<Badge>().is_err());
        assert_eq!(
            "max_time_six".parse::<RequirementField>().unwrap(),
            RequirementField::MaxTimeSix
        );
    }

    #[test]
    fn set_and_clear_threshold() {
        let mut req = TierRequirement::disabled("r".into());
        req.set(RequirementField::MinLevel, Some(45)).unwrap();
        assert_eq!(req.min_level, Some(45));
        req.set(RequirementField::MinLevel, None).unwrap();
        assert_eq!(req.get(RequirementField::MinLevel), None);

        let err = req
            .set(RequirementField::MinLevel, Some(u64::MAX))
            .unwrap_err();
        assert!(matches!(err, RulesError::ValueOutOfRange { field: "min_level", .. }));
    }

    #[test]
    fn absent_fields_deserialize_as_disabled() {
        let req: TierRequirement = toml::from_str(
            r#"
min_level = 45
max_time_five = 150
role = "123"
"#,
        )
        .unwrap();
        assert_eq!(req.min_level, Some(45));
        assert_eq!(req.min_secrets, None);
        assert_eq!(req.max_time_five, Some(150));
        assert_eq!(req.role.as_str(), "123");
    }
}
