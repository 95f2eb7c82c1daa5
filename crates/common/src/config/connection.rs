use crate::config::error::ConfigError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

/// The pieces of an `endpoint=https://...;accesskey=<base64>` connection
/// string. Keys are matched case-insensitively; unknown segments are ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct AcsConnectionParts {
    pub endpoint: String,
    pub access_key: Vec<u8>,
}

impl fmt::Debug for AcsConnectionParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcsConnectionParts")
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

pub fn parse_acs_connection_string(raw: &str) -> Result<AcsConnectionParts, ConfigError> {
    let mut endpoint = None;
    let mut access_key = None;

    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| {
            ConfigError::malformed_connection_string(format!("segment without '=': '{part}'"))
        })?;
        match key.trim().to_ascii_lowercase().as_str() {
            "endpoint" => endpoint = Some(value.trim().to_string()),
            "accesskey" => access_key = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let endpoint = endpoint
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ConfigError::malformed_connection_string("no endpoint segment"))?;
    let access_key = access_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::malformed_connection_string("no accesskey segment"))?;

    let host = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| {
            ConfigError::malformed_connection_string("endpoint must be an http(s) URL")
        })?;
    if host.is_empty() || host.starts_with('/') || host.contains(char::is_whitespace) {
        return Err(ConfigError::malformed_connection_string(
            "endpoint has no usable host",
        ));
    }

    let access_key = STANDARD.decode(access_key).map_err(|e| {
        ConfigError::malformed_connection_string(format!("accesskey is not base64: {e}"))
    })?;

    Ok(AcsConnectionParts {
        endpoint,
        access_key,
    })
}
