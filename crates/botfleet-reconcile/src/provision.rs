//! Remote chat-platform account provisioning
//!
//! Channel accounts are created through the platform's REST API. Creation
//! is idempotent by convention: a conflict resolves to the existing account.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{step} failed ({status}): {message}")]
    Api {
        step: &'static str,
        status: u16,
        message: String,
    },
}

/// Account lifecycle on a remote chat platform
#[async_trait]
pub trait ChannelProvisioner: Send + Sync {
    /// Base URL the bot should connect to
    fn base_url(&self) -> &str;

    /// Create the bot account, or find it if it already exists
    async fn create_or_find_account(&self, name: &str) -> Result<String, ProvisionError>;

    /// Look up an existing account
    async fn find_account(&self, name: &str) -> Result<Option<String>, ProvisionError>;

    /// Issue a fresh access token for the account
    async fn issue_token(&self, account_id: &str) -> Result<String, ProvisionError>;

    /// Deactivate the account
    async fn disable_account(&self, account_id: &str) -> Result<(), ProvisionError>;
}

/// Credentials obtained for a bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub account_id: String,
    pub token: String,
    pub base_url: String,
}

/// Create-or-find then issue a token, sequentially.
pub async fn provision(
    provisioner: &dyn ChannelProvisioner,
    name: &str,
) -> Result<ProvisionedAccount, ProvisionError> {
    let account_id = provisioner.create_or_find_account(name).await?;
    let token = provisioner.issue_token(&account_id).await?;
    tracing::info!(
        bot = %name,
        account = %account_id,
        token_prefix = %token.chars().take(8).collect::<String>(),
        "Provisioned channel account"
    );
    Ok(ProvisionedAccount {
        account_id,
        token,
        base_url: provisioner.base_url().to_string(),
    })
}

#[derive(Debug, Serialize)]
struct CreateBotRequest<'a> {
    username: &'a str,
    display_name: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Mattermost REST v4 client authenticated with a system-admin token
pub struct MattermostClient {
    client: Client,
    base_url: String,
    admin_token: String,
}

impl MattermostClient {
    pub fn new(base_url: &str, admin_token: impl Into<String>) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token: admin_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error(step: &'static str, response: reqwest::Response) -> ProvisionError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        ProvisionError::Api {
            step,
            status,
            message,
        }
    }
}

#[async_trait]
impl ChannelProvisioner for MattermostClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_or_find_account(&self, name: &str) -> Result<String, ProvisionError> {
        let body = CreateBotRequest {
            username: name,
            display_name: name,
            description: "OpenClaw agent (managed by botfleet)",
        };
        let response = self
            .client
            .post(self.url("/api/v4/bots"))
            .bearer_auth(&self.admin_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let bot: BotResponse = response.json().await?;
            return Ok(bot.user_id);
        }
        if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
            tracing::debug!(bot = %name, status = %status, "Bot account exists, looking it up");
            return match self.find_account(name).await? {
                Some(id) => Ok(id),
                None => Err(ProvisionError::Api {
                    step: "Bot lookup",
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message: format!("bot '{}' exists but could not be looked up", name),
                }),
            };
        }
        Err(Self::error("Create bot", response).await)
    }

    async fn find_account(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        let response = self
            .client
            .get(self.url(&format!("/api/v4/users/username/{}", name)))
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Some(response.json::<UserResponse>().await?.id)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::error("User lookup", response).await),
        }
    }

    async fn issue_token(&self, account_id: &str) -> Result<String, ProvisionError> {
        let response = self
            .client
            .post(self.url(&format!("/api/v4/users/{}/tokens", account_id)))
            .bearer_auth(&self.admin_token)
            .json(&TokenRequest {
                description: "OpenClaw bot token (botfleet)",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error("Token generation", response).await);
        }
        Ok(response.json::<TokenResponse>().await?.token)
    }

    async fn disable_account(&self, account_id: &str) -> Result<(), ProvisionError> {
        let response = self
            .client
            .post(self.url(&format!("/api/v4/bots/{}/disable", account_id)))
            .bearer_auth(&self.admin_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error("Disable bot", response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer, user_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/api/v4/users/{}/tokens", user_id)))
            .and(header("authorization", "Bearer admin-tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "tokid",
                "token": "bot-token-123456",
                "user_id": user_id
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_provision_new_bot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/bots"))
            .and(header("authorization", "Bearer admin-tok"))
            .and(body_partial_json(json!({ "username": "nova" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "user_id": "u-nova",
                "username": "nova"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server, "u-nova").await;

        let client = MattermostClient::new(&format!("{}/", server.uri()), "admin-tok").unwrap();
        let account = provision(&client, "nova").await.unwrap();

        assert_eq!(account.account_id, "u-nova");
        assert_eq!(account.token, "bot-token-123456");
        assert_eq!(account.base_url, server.uri());
    }

    #[tokio::test]
    async fn test_conflict_falls_back_to_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/bots"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "id": "store.sql_bot.save.username_exists"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/users/username/nova"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u-existing",
                "username": "nova"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server, "u-existing").await;

        let client = MattermostClient::new(&server.uri(), "admin-tok").unwrap();
        let account = provision(&client, "nova").await.unwrap();
        assert_eq!(account.account_id, "u-existing");
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/bots"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = MattermostClient::new(&server.uri(), "admin-tok").unwrap();
        let err = provision(&client, "nova").await.unwrap_err();
        match err {
            ProvisionError::Api { status, message, .. } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_find_missing_and_disable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/users/username/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v4/bots/u-1/disable"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user_id": "u-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MattermostClient::new(&server.uri(), "admin-tok").unwrap();
        assert_eq!(client.find_account("ghost").await.unwrap(), None);
        client.disable_account("u-1").await.unwrap();
    }
}
