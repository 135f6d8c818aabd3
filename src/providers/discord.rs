//! Member directory backed by the Discord REST API.

use super::{Member, MemberDirectory, MemberEdit, NicknameEdit, ProviderError, http_client};
use async_trait::async_trait;
use rankgate_rules::RoleId;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

const SERVICE: &str = "chat platform";

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    username: String,
    #[serde(default)]
    discriminator: Option<String>,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberPayload {
    user: UserPayload,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GuildPayload {
    owner_id: String,
}

pub struct DiscordMembers {
    client: reqwest::Client,
    base_url: String,
    token: String,
    guild_id: String,
    /// The guild owner's nickname cannot be changed by a bot.
    owner_id: OnceCell<String>,
}

impl DiscordMembers {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        guild_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            guild_id: guild_id.into(),
            owner_id: OnceCell::new(),
        })
    }

    fn member_url(&self, id: &str) -> String {
        format!("{}/guilds/{}/members/{}", self.base_url, self.guild_id, id)
    }

    async fn owner_id(&self) -> Result<&str, ProviderError> {
        let owner = self
            .owner_id
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(format!("{}/guilds/{}", self.base_url, self.guild_id))
                    .header("Authorization", format!("Bot {}", self.token))
                    .send()
                    .await?;
                let guild: GuildPayload = check(response)?.json().await?;
                Ok::<_, ProviderError>(guild.owner_id)
            })
            .await?;
        Ok(owner.as_str())
    }
}

fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ProviderError::Status {
            service: SERVICE,
            status: status.as_u16(),
        })
    }
}

/// `name#1234` for legacy accounts, the bare username otherwise.
fn tag(user: &UserPayload) -> String {
    match user.discriminator.as_deref() {
        Some(d) if d != "0" && !d.is_empty() => format!("{}#{}", user.username, d),
        _ => user.username.clone(),
    }
}

fn into_member(payload: MemberPayload, owner_id: &str) -> Member {
    let display_name = payload
        .nick
        .or_else(|| payload.user.global_name.clone())
        .or_else(|| Some(payload.user.username.clone()));
    Member {
        tag: tag(&payload.user),
        manageable: payload.user.id != owner_id,
        id: payload.user.id,
        roles: payload.roles.into_iter().map(RoleId::from).collect(),
        display_name,
    }
}

fn edit_body(edit: &MemberEdit) -> Value {
    let mut body = Map::new();
    body.insert(
        "roles".to_string(),
        Value::Array(
            edit.roles
                .iter()
                .map(|role| Value::String(role.as_str().to_string()))
                .collect(),
        ),
    );
    match &edit.nickname {
        NicknameEdit::Keep => {}
        NicknameEdit::Clear => {
            body.insert("nick".to_string(), Value::Null);
        }
        NicknameEdit::Set(nick) => {
            body.insert("nick".to_string(), Value::String(nick.clone()));
        }
    }
    Value::Object(body)
}

/// Header values must be visible ASCII.
fn audit_reason(reason: &str) -> String {
    reason
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

#[async_trait]
impl MemberDirectory for DiscordMembers {
    async fn fetch_member(&self, id: &str) -> Result<Option<Member>, ProviderError> {
        let response = self
            .client
            .get(self.member_url(id))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(member = %id, "Member not found");
            return Ok(None);
        }
        let payload: MemberPayload = check(response)?.json().await?;
        let owner_id = self.owner_id().await?;
        Ok(Some(into_member(payload, owner_id)))
    }

    async fn edit_member(&self, id: &str, edit: MemberEdit) -> Result<(), ProviderError> {
        let mut request = self
            .client
            .patch(self.member_url(id))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&edit_body(&edit));
        if let Some(reason) = edit.reason.as_deref() {
            request = request.header("X-Audit-Log-Reason", audit_reason(reason));
        }
        check(request.send().await?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankgate_rules::RoleSet;
    use serde_json::json;

    #[test]
    fn member_payload() {
        let payload: MemberPayload = serde_json::from_value(json!({
            "user": { "id": "42", "username": "alice", "discriminator": "0", "global_name": "Alice" },
            "nick": null,
            "roles": ["1", "2"]
        }))
        .unwrap();

        let member = into_member(payload, "7");
        assert_eq!(member.tag, "alice");
        assert_eq!(member.display_name.as_deref(), Some("Alice"));
        assert_eq!(member.roles.len(), 2);
        assert!(member.manageable);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let payload: MemberPayload = serde_json::from_value(json!({
            "user": { "id": "9", "username": "carol", "discriminator": "0" },
            "roles": []
        }))
        .unwrap();

        let member = into_member(payload, "7");
        assert_eq!(member.display_name.as_deref(), Some("carol"));
    }

    #[test]
    fn legacy_tag_and_owner() {
        let payload: MemberPayload = serde_json::from_value(json!({
            "user": { "id": "7", "username": "bob", "discriminator": "1234" },
            "nick": "❮45❯ Bob",
            "roles": []
        }))
        .unwrap();

        let member = into_member(payload, "7");
        assert_eq!(member.tag, "bob#1234");
        assert_eq!(member.display_name.as_deref(), Some("❮45❯ Bob"));
        assert!(!member.manageable);
    }

    #[test]
    fn edit_body_nickname_modes() {
        let roles: RoleSet = ["a", "b"].into_iter().map(RoleId::from).collect();
        let mut edit = MemberEdit {
            roles,
            nickname: NicknameEdit::Keep,
            reason: None,
        };
        assert_eq!(edit_body(&edit), json!({ "roles": ["a", "b"] }));

        edit.nickname = NicknameEdit::Clear;
        assert_eq!(edit_body(&edit), json!({ "roles": ["a", "b"], "nick": null }));

        edit.nickname = NicknameEdit::Set("❮40❯ Bob ".to_string());
        assert_eq!(edit_body(&edit)["nick"], "❮40❯ Bob ");
    }

    #[test]
    fn reason_is_header_safe() {
        assert_eq!(audit_reason("verify ❮x❯\n"), "verify x");
    }
}
