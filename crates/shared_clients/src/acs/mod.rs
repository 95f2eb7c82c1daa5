//! Azure Communication Services over its REST API: identities with voice
//! access tokens, and SMS.
//!
//! Requests are authenticated with the resource's access key using the
//! HMAC-SHA256 scheme described by the service. See [`auth`].

pub mod auth;
pub mod identity;
pub mod sms;

pub use auth::{AcsConnection, RequestSigner};
pub use identity::{
    AccessToken, CommunicationIdentityClient, CommunicationUser, IdentityProvider, TokenScope,
};
pub use sms::{SmsClient, SmsSendResult, SmsSender};

use common::error::DiagnosticMessage;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcsError {
    #[error("invalid connection string: {context}")]
    InvalidConnectionString { context: DiagnosticMessage },
    #[error("request failed: {context}")]
    Request { context: DiagnosticMessage },
    #[error("service returned {status}: {context}")]
    Service {
        status: StatusCode,
        context: DiagnosticMessage,
    },
    #[error("unexpected response: {context}")]
    UnexpectedResponse { context: DiagnosticMessage },
}

impl AcsError {
    #[track_caller]
    pub fn invalid_connection_string(message: impl Into<String>) -> Self {
        Self::InvalidConnectionString {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn service(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// Message without the location suffix, suitable for echoing to a caller.
    pub fn message(&self) -> &str {
        match self {
            AcsError::InvalidConnectionString { context }
            | AcsError::Request { context }
            | AcsError::Service { context, .. }
            | AcsError::UnexpectedResponse { context } => context.message(),
        }
    }
}

impl From<reqwest::Error> for AcsError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AcsError::request(format!("request to communication services timed out: {err}"))
        } else if err.is_decode() {
            AcsError::unexpected(err.to_string())
        } else {
            AcsError::request(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Signed JSON transport shared by the identity and SMS clients.
#[derive(Debug, Clone)]
pub(crate) struct AcsTransport {
    http: Client,
    signer: RequestSigner,
}

impl AcsTransport {
    pub(crate) fn new(connection: AcsConnection, timeout: Duration) -> Result<Self, AcsError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcsError::request(format!("could not build http client: {e}")))?;
        Ok(Self {
            http,
            signer: RequestSigner::new(connection),
        })
    }

    pub(crate) fn url(&self, path: &str, api_version: &str) -> Result<Url, AcsError> {
        let mut url = self
            .signer
            .connection()
            .endpoint()
            .join(path.trim_start_matches('/'))
            .map_err(|e| AcsError::invalid_connection_string(format!("bad endpoint path: {e}")))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    pub(crate) async fn post_json<B, R>(
        &self,
        url: Url,
        body: &B,
        extra_headers: &[(&str, String)],
    ) -> Result<R, AcsError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| AcsError::unexpected(format!("could not encode request: {e}")))?;
        let date = auth::rfc1123_now();

        let mut request = self
            .http
            .request(Method::POST, url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        for (name, value) in self.signer.signed_headers("POST", &url, &payload, &date)? {
            request = request.header(name, value);
        }
        for (name, value) in extra_headers {
            request = request.header(*name, value);
        }

        let resp = request.body(payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => match env.error.code {
                    Some(code) => format!("{}: {}", code, env.error.message),
                    None => env.error.message,
                },
                Err(_) if text.is_empty() => status.to_string(),
                Err(_) => text,
            };
            return Err(AcsError::service(status, message));
        }

        Ok(resp.json::<R>().await?)
    }
}
