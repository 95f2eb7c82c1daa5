use crate::acs::{auth, AcsConnection, AcsError, AcsTransport};
use async_trait::async_trait;
use common::config::AcsConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SMS_API_VERSION: &str = "2021-03-07";

/// Outcome for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsSendResult {
    pub to: String,
    #[serde(default)]
    pub message_id: Option<String>,
    pub http_status_code: u16,
    pub successful: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<SmsSendResult, AcsError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    from: &'a str,
    sms_recipients: Vec<SmsRecipient<'a>>,
    message: &'a str,
    sms_send_options: SmsSendOptions,
}

#[derive(Serialize)]
struct SmsRecipient<'a> {
    to: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsSendOptions {
    enable_delivery_report: bool,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    value: Vec<SmsSendResult>,
}

/// Sends SMS from the resource's configured phone number.
#[derive(Debug, Clone)]
pub struct SmsClient {
    transport: AcsTransport,
    from: String,
}

impl SmsClient {
    pub fn new(cfg: &AcsConfig) -> Result<Self, AcsError> {
        let connection = AcsConnection::parse(&cfg.connection_string)?;
        Ok(Self {
            transport: AcsTransport::new(connection, cfg.timeout)?,
            from: cfg.phone_number.clone(),
        })
    }
}

#[async_trait]
impl SmsSender for SmsClient {
    async fn send(&self, to: &str, message: &str) -> Result<SmsSendResult, AcsError> {
        let url = self.transport.url("sms", SMS_API_VERSION)?;
        let body = SendMessageRequest {
            from: &self.from,
            sms_recipients: vec![SmsRecipient { to }],
            message,
            sms_send_options: SmsSendOptions {
                enable_delivery_report: false,
            },
        };
        // lets the service drop duplicates if the same request is replayed
        let repeatability = [
            ("Repeatability-Request-ID", Uuid::new_v4().to_string()),
            ("Repeatability-First-Sent", auth::rfc1123_now()),
        ];

        let resp: SendMessageResponse = self.transport.post_json(url, &body, &repeatability).await?;
        let result = resp
            .value
            .into_iter()
            .next()
            .ok_or_else(|| AcsError::unexpected("send response listed no recipients"))?;

        tracing::info!(
            to = %result.to,
            successful = result.successful,
            message_id = result.message_id.as_deref().unwrap_or(""),
            "sms send completed"
        );
        Ok(result)
    }
}
