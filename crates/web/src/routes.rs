use crate::AppState;
use actix_web::{web, HttpResponse, Responder};
use engine::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_clients::acs::{AcsError, TokenScope};

const CUSTOMERS_SQL: &str = "SELECT * FROM get_customers()";

const MISSING_QUERY: &str = "Missing parameter \"query\".";
const GENERATE_FAILED: &str = "Error generating SQL query.";
const CUSTOMERS_FAILED: &str = "Error retrieving customers.";
const ACS_TOKEN_FAILED: &str = "Error creating ACS token.";
const SMS_FIELDS_REQUIRED: &str = "Message and toPhone must be provided!";

/// Mount the API under `/api` plus the unscoped health check.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/customers", web::get().to(customers_handler))
            .route("/generatesql", web::post().to(generate_sql_handler))
            .route("/acstoken", web::get().to(acs_token_handler))
            .route("/sendsms", web::post().to(send_sms_handler)),
    )
    .route("/healthz", web::get().to(health_handler));
}

#[derive(Debug, Deserialize)]
struct GenerateSqlRequest {
    query: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendSmsRequest {
    message: Option<String>,
    #[serde(rename = "toPhone")]
    to_phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AcsTokenResponse {
    user_id: String,
    token: String,
    expires_on: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsResponse {
    status: bool,
    message_id: String,
    message: String,
}

fn error_body(message: &str) -> serde_json::Value {
    json!({ "error": message })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

async fn customers_handler(state: web::Data<AppState>) -> impl Responder {
    match state.db.query(CUSTOMERS_SQL, &[]).await {
        Ok(rows) => HttpResponse::Ok().json(rows.into_rows()),
        Err(err) => {
            tracing::error!(error = %err, "failed to retrieve customers");
            HttpResponse::InternalServerError().json(error_body(CUSTOMERS_FAILED))
        }
    }
}

// An unreadable body is treated the same as one without a query.
async fn generate_sql_handler(
    state: web::Data<AppState>,
    body: Option<web::Json<GenerateSqlRequest>>,
) -> impl Responder {
    let query = body.as_ref().and_then(|b| b.query.as_deref());

    match state.generator.run(query).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(err) if err.kind() == ErrorKind::InvalidRequest => {
            tracing::debug!(error = %err, "rejected generatesql request");
            HttpResponse::BadRequest().json(error_body(MISSING_QUERY))
        }
        Err(err) => {
            tracing::error!(kind = %err.kind(), error = %err, "generatesql failed");
            HttpResponse::InternalServerError().json(error_body(GENERATE_FAILED))
        }
    }
}

async fn acs_token_handler(state: web::Data<AppState>) -> impl Responder {
    let issued = async {
        let user = state.identity.create_user().await?;
        let token = state.identity.get_token(&user, &[TokenScope::Voip]).await?;
        Ok::<_, AcsError>(AcsTokenResponse {
            user_id: user.communication_user_id,
            token: token.token,
            expires_on: token.expires_on,
        })
    }
    .await;

    match issued {
        Ok(body) => {
            tracing::info!(user_id = %body.user_id, "issued acs token");
            HttpResponse::Ok().json(body)
        }
        Err(err) => {
            tracing::error!(kind = "ProviderError", error = %err, "failed to create acs token");
            HttpResponse::InternalServerError().json(error_body(ACS_TOKEN_FAILED))
        }
    }
}

async fn send_sms_handler(
    state: web::Data<AppState>,
    body: Option<web::Json<SendSmsRequest>>,
) -> impl Responder {
    let fields = body.as_ref().and_then(|b| {
        Some((
            non_blank(b.message.as_deref())?,
            non_blank(b.to_phone.as_deref())?,
        ))
    });
    let Some((message, to_phone)) = fields else {
        return HttpResponse::BadRequest().json(json!({
            "status": false,
            "message": SMS_FIELDS_REQUIRED,
        }));
    };

    match state.sms.send(to_phone, message).await {
        Ok(result) => HttpResponse::Ok().json(SendSmsResponse {
            status: result.successful,
            message_id: result.message_id.unwrap_or_default(),
            message: result.error_message.unwrap_or_default(),
        }),
        Err(err) => {
            tracing::error!(kind = "ProviderError", error = %err, "failed to send sms");
            HttpResponse::InternalServerError().json(SendSmsResponse {
                status: false,
                message_id: String::new(),
                message: err.message().to_string(),
            })
        }
    }
}

async fn health_handler() -> impl Responder {
    tracing::debug!("health check requested");
    HttpResponse::Ok().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use common::types::RowSet;
    use database_adapters::{AsyncDatabaseAdapter, DatabaseAdapterError};
    use engine::SqlGenerator;
    use serde_json::Value;
    use shared_clients::acs::{
        AccessToken, CommunicationUser, IdentityProvider, SmsSendResult, SmsSender,
    };
    use shared_clients::openai::{CompletionClient, CompletionError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubDb {
        fail: bool,
        rows: RowSet,
        statements: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AsyncDatabaseAdapter for StubDb {
        async fn execute(&self, _sql: &str) -> Result<(), DatabaseAdapterError> {
            Ok(())
        }

        async fn query(
            &self,
            sql: &str,
            _params: &[Value],
        ) -> Result<RowSet, DatabaseAdapterError> {
            self.statements.lock().unwrap().push(sql.to_string());
            if self.fail {
                return Err(DatabaseAdapterError::connection("connection refused"));
            }
            Ok(self.rows.clone())
        }
    }

    struct StubModel {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for StubModel {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct StubIdentity {
        fail: bool,
        scopes: Mutex<Vec<TokenScope>>,
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn create_user(&self) -> Result<CommunicationUser, AcsError> {
            if self.fail {
                return Err(AcsError::request("connection refused"));
            }
            Ok(CommunicationUser {
                communication_user_id: "8:acs:resource_user".to_string(),
            })
        }

        async fn get_token(
            &self,
            _user: &CommunicationUser,
            scopes: &[TokenScope],
        ) -> Result<AccessToken, AcsError> {
            *self.scopes.lock().unwrap() = scopes.to_vec();
            Ok(AccessToken {
                token: "eyJ0eXAi".to_string(),
                expires_on: "2026-10-17T10:00:00.000Z".to_string(),
            })
        }
    }

    struct StubSms {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SmsSender for StubSms {
        async fn send(&self, to: &str, _message: &str) -> Result<SmsSendResult, AcsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AcsError::request("sms endpoint unreachable"));
            }
            Ok(SmsSendResult {
                to: to.to_string(),
                message_id: Some("Outgoing_1".to_string()),
                http_status_code: 202,
                successful: true,
                error_message: None,
            })
        }
    }

    struct Harness {
        db: Arc<StubDb>,
        model: Arc<StubModel>,
        identity: Arc<StubIdentity>,
        sms: Arc<StubSms>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                db: Arc::new(StubDb {
                    fail: false,
                    rows: RowSet::Empty,
                    statements: Mutex::new(Vec::new()),
                }),
                model: Arc::new(StubModel {
                    reply: r#"{"sql":"SELECT SUM(total) FROM orders","paramValues":[]}"#
                        .to_string(),
                    calls: AtomicUsize::new(0),
                }),
                identity: Arc::new(StubIdentity {
                    fail: false,
                    scopes: Mutex::new(Vec::new()),
                }),
                sms: Arc::new(StubSms {
                    fail: false,
                    calls: AtomicUsize::new(0),
                }),
            }
        }

        fn with_db(mut self, rows: RowSet, fail: bool) -> Self {
            self.db = Arc::new(StubDb {
                fail,
                rows,
                statements: Mutex::new(Vec::new()),
            });
            self
        }

        fn with_reply(mut self, reply: &str) -> Self {
            self.model = Arc::new(StubModel {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            });
            self
        }

        fn failing_acs(mut self) -> Self {
            self.identity = Arc::new(StubIdentity {
                fail: true,
                scopes: Mutex::new(Vec::new()),
            });
            self.sms = Arc::new(StubSms {
                fail: true,
                calls: AtomicUsize::new(0),
            });
            self
        }

        fn state(&self) -> web::Data<AppState> {
            web::Data::new(AppState::new(
                self.db.clone(),
                SqlGenerator::new(self.model.clone(), self.db.clone()),
                self.identity.clone(),
                self.sms.clone(),
            ))
        }
    }

    fn row(v: Value) -> common::types::Row {
        v.as_object().cloned().unwrap()
    }

    macro_rules! app {
        ($harness:expr) => {
            test::init_service(App::new().app_data($harness.state()).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn test_health_is_outside_api_scope() {
        let h = Harness::new();
        let app = app!(h);
        let req = test::TestRequest::get().uri("/healthz").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_customers_returns_rows_from_stored_function() {
        let h = Harness::new().with_db(
            RowSet::Many(vec![row(json!({"id": 1, "company": "Contoso Ltd"}))]),
            false,
        );
        let app = app!(h);
        let req = test::TestRequest::get().uri("/api/customers").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, json!([{"id": 1, "company": "Contoso Ltd"}]));
        assert_eq!(*h.db.statements.lock().unwrap(), vec![CUSTOMERS_SQL.to_string()]);
    }

    #[actix_web::test]
    async fn test_customers_without_rows_is_empty_array() {
        let h = Harness::new();
        let app = app!(h);
        let req = test::TestRequest::get().uri("/api/customers").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn test_customers_failure_is_500_with_message() {
        let h = Harness::new().with_db(RowSet::Empty, true);
        let app = app!(h);
        let req = test::TestRequest::get().uri("/api/customers").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Error retrieving customers."}));
    }

    #[actix_web::test]
    async fn test_generatesql_returns_rows() {
        let h = Harness::new().with_db(RowSet::Single(row(json!({"sum": "1250.00"}))), false);
        let app = app!(h);
        let req = test::TestRequest::post()
            .uri("/api/generatesql")
            .set_json(json!({"query": "total revenue"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!([{"sum": "1250.00"}]));
        assert_eq!(
            *h.db.statements.lock().unwrap(),
            vec!["SELECT SUM(total) FROM orders".to_string()]
        );
    }

    #[actix_web::test]
    async fn test_generatesql_missing_query_is_400_without_model_call() {
        let h = Harness::new();
        let app = app!(h);

        let requests = vec![
            test::TestRequest::post().uri("/api/generatesql").set_json(json!({})).to_request(),
            test::TestRequest::post()
                .uri("/api/generatesql")
                .set_json(json!({"query": "  "}))
                .to_request(),
            test::TestRequest::post()
                .uri("/api/generatesql")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
                .to_request(),
            test::TestRequest::post().uri("/api/generatesql").to_request(),
        ];
        for req in requests {
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({"error": "Missing parameter \"query\"."}));
        }
        assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn test_generatesql_malformed_completion_is_500() {
        let h = Harness::new().with_reply("I cannot help with that.");
        let app = app!(h);
        let req = test::TestRequest::post()
            .uri("/api/generatesql")
            .set_json(json!({"query": "total revenue"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Error generating SQL query."}));
        assert!(h.db.statements.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_generatesql_write_statement_is_500_and_not_executed() {
        let h = Harness::new().with_reply(r#"{"sql":"DELETE FROM orders","paramValues":[]}"#);
        let app = app!(h);
        let req = test::TestRequest::post()
            .uri("/api/generatesql")
            .set_json(json!({"query": "remove all orders"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.db.statements.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_acstoken_issues_voip_token() {
        let h = Harness::new();
        let app = app!(h);
        let req = test::TestRequest::get().uri("/api/acstoken").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            body,
            json!({
                "userId": "8:acs:resource_user",
                "token": "eyJ0eXAi",
                "expiresOn": "2026-10-17T10:00:00.000Z"
            })
        );
        assert_eq!(*h.identity.scopes.lock().unwrap(), vec![TokenScope::Voip]);
    }

    #[actix_web::test]
    async fn test_acstoken_provider_failure_is_500() {
        let h = Harness::new().failing_acs();
        let app = app!(h);
        let req = test::TestRequest::get().uri("/api/acstoken").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Error creating ACS token."}));
    }

    #[actix_web::test]
    async fn test_sendsms_requires_both_fields() {
        let h = Harness::new();
        let app = app!(h);

        for payload in [
            json!({"message": "hello"}),
            json!({"toPhone": "+14255550123"}),
            json!({"message": "", "toPhone": "+14255550123"}),
            json!({"message": "hello", "toPhone": null}),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/sendsms")
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(
                body,
                json!({"status": false, "message": "Message and toPhone must be provided!"})
            );
        }
        assert_eq!(h.sms.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn test_sendsms_success_reports_message_id() {
        let h = Harness::new();
        let app = app!(h);
        let req = test::TestRequest::post()
            .uri("/api/sendsms")
            .set_json(json!({"message": "Your order shipped", "toPhone": "+14255550123"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({"status": true, "messageId": "Outgoing_1", "message": ""})
        );
        assert_eq!(h.sms.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn test_sendsms_provider_failure_is_500() {
        let h = Harness::new().failing_acs();
        let app = app!(h);
        let req = test::TestRequest::post()
            .uri("/api/sendsms")
            .set_json(json!({"message": "hi", "toPhone": "+14255550123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"status": false, "messageId": "", "message": "sms endpoint unreachable"})
        );
    }
}
