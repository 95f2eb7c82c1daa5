use crate::acs::{AcsConnection, AcsError, AcsTransport};
use async_trait::async_trait;
use common::config::AcsConfig;
use serde::{Deserialize, Serialize};

const IDENTITY_API_VERSION: &str = "2023-10-01";

/// Capabilities a token can be issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Voip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationUser {
    pub communication_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub token: String,
    pub expires_on: String,
}

/// Issues communication identities and their access tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self) -> Result<CommunicationUser, AcsError>;

    async fn get_token(
        &self,
        user: &CommunicationUser,
        scopes: &[TokenScope],
    ) -> Result<AccessToken, AcsError>;
}

#[derive(Deserialize)]
struct CreateIdentityResponse {
    identity: IdentityBody,
}

#[derive(Deserialize)]
struct IdentityBody {
    id: String,
}

#[derive(Serialize)]
struct IssueTokenRequest<'a> {
    scopes: &'a [TokenScope],
}

#[derive(Debug, Clone)]
pub struct CommunicationIdentityClient {
    transport: AcsTransport,
}

impl CommunicationIdentityClient {
    pub fn new(cfg: &AcsConfig) -> Result<Self, AcsError> {
        let connection = AcsConnection::parse(&cfg.connection_string)?;
        Ok(Self {
            transport: AcsTransport::new(connection, cfg.timeout)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for CommunicationIdentityClient {
    async fn create_user(&self) -> Result<CommunicationUser, AcsError> {
        let url = self.transport.url("identities", IDENTITY_API_VERSION)?;
        let resp: CreateIdentityResponse = self
            .transport
            .post_json(url, &serde_json::json!({}), &[])
            .await?;
        tracing::info!(user = %resp.identity.id, "created communication identity");
        Ok(CommunicationUser {
            communication_user_id: resp.identity.id,
        })
    }

    async fn get_token(
        &self,
        user: &CommunicationUser,
        scopes: &[TokenScope],
    ) -> Result<AccessToken, AcsError> {
        let mut url = self.transport.url("identities", IDENTITY_API_VERSION)?;
        url.path_segments_mut()
            .map_err(|_| AcsError::invalid_connection_string("endpoint cannot carry a path"))?
            .push(&user.communication_user_id)
            .push(":issueAccessToken");

        let token: AccessToken = self
            .transport
            .post_json(url, &IssueTokenRequest { scopes }, &[])
            .await?;
        tracing::debug!(
            user = %user.communication_user_id,
            expires_on = %token.expires_on,
            "issued access token"
        );
        Ok(token)
    }
}
