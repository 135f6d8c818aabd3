//! Account resolver backed by the Mojang profile API.

use super::{AccountResolver, PlayerAccount, ProviderError, http_client};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "account resolver";

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: String,
    name: String,
}

/// Resolves names and ids, caching every hit for the life of the process.
pub struct MojangResolver {
    client: reqwest::Client,
    account_url: String,
    session_url: String,
    /// Keyed by lower-cased name and by id.
    cache: DashMap<String, PlayerAccount>,
}

impl MojangResolver {
    pub fn new(
        account_url: impl Into<String>,
        session_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            account_url: account_url.into().trim_end_matches('/').to_string(),
            session_url: session_url.into().trim_end_matches('/').to_string(),
            cache: DashMap::new(),
        })
    }

    fn remember(&self, account: &PlayerAccount) {
        self.cache
            .insert(account.name.to_lowercase(), account.clone());
        self.cache.insert(account.id.clone(), account.clone());
    }

    fn cached(&self, key: &str) -> Option<PlayerAccount> {
        self.cache.get(key).map(|entry| entry.value().clone())
    }

    async fn fetch(&self, url: &str) -> Result<Option<PlayerAccount>, ProviderError> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(ProviderError::Status {
                    service: SERVICE,
                    status: status.as_u16(),
                });
            }
            _ => {}
        }
        let profile: ProfileResponse = response.json().await?;
        let account = PlayerAccount {
            id: profile.id,
            name: profile.name,
        };
        self.remember(&account);
        Ok(Some(account))
    }
}

/// Names are 1-16 characters of `[A-Za-z0-9_]`; anything else cannot exist.
fn plausible_name(name: &str) -> bool {
    (1..=16).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl AccountResolver for MojangResolver {
    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerAccount>, ProviderError> {
        if !plausible_name(name) {
            return Ok(None);
        }
        if let Some(account) = self.cached(&name.to_lowercase()) {
            debug!(name = %name, "Account resolved from cache");
            return Ok(Some(account));
        }
        let url = format!("{}/users/profiles/minecraft/{}", self.account_url, name);
        self.fetch(&url).await
    }

    async fn resolve_id(&self, id: &str) -> Result<Option<PlayerAccount>, ProviderError> {
        if let Some(account) = self.cached(id) {
            return Ok(Some(account));
        }
        let url = format!("{}/session/minecraft/profile/{}", self.session_url, id);
        self.fetch(&url).await
    }
}
