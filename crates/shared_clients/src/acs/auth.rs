use crate::acs::AcsError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::config::parse_acs_connection_string;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// A parsed `endpoint=https://...;accesskey=...` connection string.
#[derive(Clone)]
pub struct AcsConnection {
    endpoint: Url,
    access_key: Vec<u8>,
}

impl AcsConnection {
    pub fn parse(connection_string: &str) -> Result<Self, AcsError> {
        let parts = parse_acs_connection_string(connection_string)
            .map_err(|e| AcsError::invalid_connection_string(e.to_string()))?;

        let mut endpoint = Url::parse(&parts.endpoint)
            .map_err(|e| AcsError::invalid_connection_string(format!("endpoint: {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(AcsError::invalid_connection_string("endpoint has no host"));
        }
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            endpoint,
            access_key: parts.access_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for AcsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcsConnection")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Produces the `x-ms-date`, `x-ms-content-sha256` and `Authorization`
/// headers for a request.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    connection: AcsConnection,
}

impl RequestSigner {
    pub fn new(connection: AcsConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &AcsConnection {
        &self.connection
    }

    pub fn signed_headers(
        &self,
        method: &str,
        url: &Url,
        body: &[u8],
        date: &str,
    ) -> Result<Vec<(&'static str, String)>, AcsError> {
        let content_hash = STANDARD.encode(Sha256::digest(body));

        let mut path_and_query = url.path().to_string();
        if let Some(query) = url.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        let string_to_sign = format!(
            "{}\n{}\n{};{};{}",
            method.to_ascii_uppercase(),
            path_and_query,
            date,
            host,
            content_hash
        );

        let mut mac = HmacSha256::new_from_slice(&self.connection.access_key)
            .map_err(|e| AcsError::invalid_connection_string(format!("unusable access key: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(vec![
            ("x-ms-date", date.to_string()),
            ("x-ms-content-sha256", content_hash),
            (
                "Authorization",
                format!(
                    "HMAC-SHA256 SignedHeaders=x-ms-date;host;x-ms-content-sha256&Signature={signature}"
                ),
            ),
        ])
    }
}

/// Current time in the RFC 1123 form the service expects in `x-ms-date`.
pub fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
