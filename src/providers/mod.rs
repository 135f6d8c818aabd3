//! External collaborators: the account resolver, the stats provider, the
//! chat platform's member API and the cosmetic suffix source.
//!
//! Each is an `async_trait` object injected into the
//! [`Verifier`](crate::verify::Verifier) so tests can substitute in-memory
//! fakes for the HTTP clients shipped here.

pub mod discord;
pub mod hypixel;
pub mod mojang;

pub use discord::DiscordMembers;
pub use hypixel::HypixelStats;
pub use mojang::MojangResolver;

use async_trait::async_trait;
use rankgate_rules::{GameProfile, RoleSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} rejected the request: {cause}")]
    Rejected { service: &'static str, cause: String },
    #[error("unexpected response from {service}: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },
    /// The stats provider has no profile collection for the account.
    #[error("account has no profile collection")]
    NoProfileCollection,
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// A game account: stable id plus current display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAccount {
    pub id: String,
    pub name: String,
}

/// Account-level data from the stats provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Chat handle the player declared on their game account.
    pub linked_chat_handle: Option<String>,
    /// Achievement-derived secrets count.
    pub secrets: u64,
}

/// A member of the chat platform as last fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    /// Handle compared against [`PlayerRecord::linked_chat_handle`].
    pub tag: String,
    pub roles: RoleSet,
    pub display_name: Option<String>,
    /// Whether the platform lets us change this member's nickname.
    pub manageable: bool,
}

/// Nickname part of a [`MemberEdit`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NicknameEdit {
    #[default]
    Keep,
    Clear,
    Set(String),
}

/// One write to a member: the whole role set and the nickname, together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEdit {
    pub roles: RoleSet,
    pub nickname: NicknameEdit,
    /// Shown in the platform's own audit log.
    pub reason: Option<String>,
}

#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Look an account up by display name. `Ok(None)` when no such account.
    async fn resolve_name(&self, name: &str) -> Result<Option<PlayerAccount>, ProviderError>;

    /// Look an account up by stable id.
    async fn resolve_id(&self, id: &str) -> Result<Option<PlayerAccount>, ProviderError>;
}

#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn player(&self, account_id: &str) -> Result<PlayerRecord, ProviderError>;

    /// Every game profile of the account.
    ///
    /// Fails with [`ProviderError::NoProfileCollection`] when the account
    /// has never created one.
    async fn profiles(&self, account_id: &str) -> Result<Vec<GameProfile>, ProviderError>;
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// `Ok(None)` when the identity is no longer on the platform.
    async fn fetch_member(&self, id: &str) -> Result<Option<Member>, ProviderError>;

    /// Replace the member's role set (and optionally nickname) in one write.
    async fn edit_member(&self, id: &str, edit: MemberEdit) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait CosmeticSource: Send + Sync {
    /// Text appended after the account name in the nickname.
    async fn suffix(&self, member: &Member) -> Result<String, ProviderError>;
}

/// Cosmetic source that never adds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCosmetics;

#[async_trait]
impl CosmeticSource for NoCosmetics {
    async fn suffix(&self, _member: &Member) -> Result<String, ProviderError> {
        Ok(String::new())
    }
}

/// Shared client builder for the HTTP providers.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("rankgate/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
