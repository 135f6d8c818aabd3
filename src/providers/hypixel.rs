//! Stats provider backed by the Hypixel public API.

use super::{PlayerRecord, ProviderError, StatsProvider, http_client};
use async_trait::async_trait;
use rankgate_rules::{BestTimes, GameProfile};
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "stats provider";

/// Kill counters summed into the blood-mob total.
const BLOOD_MOB_STATS: [&str; 3] = [
    "kills_watcher_summon_undead",
    "kills_watcher_summon_skeleton",
    "kills_master_watcher_summon_undead",
];

pub struct HypixelStats {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HypixelStats {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get(&self, path: &str, account_id: &str) -> Result<Value, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("providers.stats_api_key"))?;
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("uuid", account_id)])
            .header("API-Key", key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }
        let json: Value = response.json().await?;
        if json.get("success").and_then(Value::as_bool) != Some(true) {
            let cause = json
                .get("cause")
                .and_then(Value::as_str)
                .unwrap_or("unknown cause")
                .to_string();
            return Err(ProviderError::Rejected {
                service: SERVICE,
                cause,
            });
        }
        Ok(json)
    }
}

#[async_trait]
impl StatsProvider for HypixelStats {
    async fn player(&self, account_id: &str) -> Result<PlayerRecord, ProviderError> {
        let json = self.get("/v2/player", account_id).await?;
        parse_player(&json)
    }

    async fn profiles(&self, account_id: &str) -> Result<Vec<GameProfile>, ProviderError> {
        let json = self.get("/v2/skyblock/profiles", account_id).await?;
        parse_profiles(&json, account_id)
    }
}

/// Extract the declared chat handle and the secrets achievement.
pub fn parse_player(json: &Value) -> Result<PlayerRecord, ProviderError> {
    let player = match json.get("player") {
        Some(Value::Object(_)) => &json["player"],
        Some(Value::Null) | None => {
            return Err(ProviderError::Malformed {
                service: SERVICE,
                detail: "player has never joined".to_string(),
            });
        }
        Some(_) => {
            return Err(ProviderError::Malformed {
                service: SERVICE,
                detail: "player is not an object".to_string(),
            });
        }
    };

    let social = &player["socialMedia"];
    let linked_chat_handle = social["links"]["DISCORD"]
        .as_str()
        .or_else(|| social["DISCORD"].as_str())
        .map(str::to_string);
    let secrets = player["achievements"]["skyblock_treasure_hunter"]
        .as_u64()
        .unwrap_or(0);

    Ok(PlayerRecord {
        linked_chat_handle,
        secrets,
    })
}

/// Build one [`GameProfile`] per profile the account is a member of.
pub fn parse_profiles(json: &Value, account_id: &str) -> Result<Vec<GameProfile>, ProviderError> {
    let Some(profiles) = json.get("profiles").and_then(Value::as_array) else {
        return Err(ProviderError::NoProfileCollection);
    };
    Ok(profiles
        .iter()
        .filter_map(|profile| parse_profile(profile, account_id))
        .collect())
}

fn parse_profile(profile: &Value, account_id: &str) -> Option<GameProfile> {
    let member = profile.get("members")?.get(account_id)?;
    let dungeons = &member["dungeons"]["dungeon_types"];
    let catacombs = &dungeons["catacombs"];
    let master = &dungeons["master_catacombs"];
    let stats = &member["stats"];

    let blood_mob_kills = BLOOD_MOB_STATS
        .iter()
        .map(|key| stats[*key].as_f64().unwrap_or(0.0) as u64)
        .sum();

    Some(GameProfile {
        name: profile["cute_name"].as_str().unwrap_or_default().to_string(),
        last_save: member["last_save"]
            .as_i64()
            .or_else(|| member["profile"]["last_save"].as_i64()),
        xp: catacombs["experience"].as_f64().unwrap_or(0.0),
        blood_mob_kills,
        best_times: BestTimes {
            five: best_time(master, "5"),
            six: best_time(master, "6"),
            seven: best_time(catacombs, "7"),
        },
    })
}

fn best_time(dungeon: &Value, floor: &str) -> Option<u64> {
    dungeon["fastest_time_s_plus"][floor]
        .as_f64()
        .filter(|ms| *ms > 0.0)
        .map(|ms| ms as u64)
}
