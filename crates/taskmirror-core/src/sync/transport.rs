//! Sync endpoint transport
//!
//! One POST per sync call. The body is form-encoded, but `resource_types` and
//! `commands` are JSON arrays embedded as string values, which is how the
//! server expects them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::command::Command;
use super::error::{SyncError, SyncResult};
use crate::models::{Item, Label, Project};

/// Sync token that requests a full resync
pub const FULL_SYNC_TOKEN: &str = "*";

const DEFAULT_USER_AGENT: &str = concat!("taskmirror/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource collections that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Items,
    Projects,
    Labels,
}

impl ResourceType {
    /// Every collection mirrored by the snapshot
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Items,
        ResourceType::Projects,
        ResourceType::Labels,
    ];
}

/// A single call to the sync endpoint
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// `*` for a full sync, otherwise the last token the server returned
    pub sync_token: String,
    pub resource_types: Vec<ResourceType>,
    pub commands: Vec<Command>,
}

impl SyncRequest {
    /// Request everything from scratch
    pub fn full(commands: Vec<Command>) -> Self {
        Self {
            sync_token: FULL_SYNC_TOKEN.to_string(),
            resource_types: ResourceType::ALL.to_vec(),
            commands,
        }
    }

    /// Request changes since `sync_token`
    pub fn incremental(sync_token: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            sync_token: sync_token.into(),
            resource_types: ResourceType::ALL.to_vec(),
            commands,
        }
    }

    pub fn is_full(&self) -> bool {
        self.sync_token == FULL_SYNC_TOKEN
    }

    /// Render the form fields of the request body
    ///
    /// `commands` is omitted when there is nothing to submit.
    pub fn form_fields(&self) -> SyncResult<Vec<(&'static str, String)>> {
        if self.resource_types.is_empty() {
            return Err(SyncError::validation("resource_types must not be empty"));
        }
        if self.sync_token.is_empty() {
            return Err(SyncError::validation("sync_token must not be empty"));
        }

        let mut fields = vec![
            ("sync_token", self.sync_token.clone()),
            ("resource_types", encode_json(&self.resource_types)?),
        ];
        if !self.commands.is_empty() {
            fields.push(("commands", encode_json(&self.commands)?));
        }
        Ok(fields)
    }
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> SyncResult<String> {
    serde_json::to_string(value)
        .map_err(|e| SyncError::validation(format!("failed to encode request: {}", e)))
}

/// Error object the server returns for a rejected command
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerError {
    pub error_code: i64,
    pub error: String,
}

/// Outcome of one command, keyed by its UUID in `sync_status`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawCommandStatus")]
pub enum CommandStatus {
    Ok,
    Failed(ServerError),
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandStatus::Ok)
    }
}

/// The server sends either the literal string "ok" or an error object
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommandStatus {
    Text(String),
    Error(ServerError),
}

impl TryFrom<RawCommandStatus> for CommandStatus {
    type Error = String;

    fn try_from(raw: RawCommandStatus) -> Result<Self, String> {
        match raw {
            RawCommandStatus::Text(s) if s == "ok" => Ok(CommandStatus::Ok),
            RawCommandStatus::Text(s) => Err(format!("unexpected sync status '{}'", s)),
            RawCommandStatus::Error(e) => Ok(CommandStatus::Failed(e)),
        }
    }
}

/// Decoded response body of the sync endpoint
///
/// Collections are only present for requested or affected resource types.
/// Fields this client does not mirror are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncResponse {
    pub sync_token: Option<String>,
    pub full_sync: bool,
    pub items: Vec<Item>,
    pub projects: Vec<Project>,
    pub labels: Vec<Label>,
    pub temp_id_mapping: HashMap<String, String>,
    pub sync_status: HashMap<String, CommandStatus>,
}

/// Something that can execute a sync request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &SyncRequest) -> SyncResult<SyncResponse>;
}

/// Supplies the bearer credential for each request
pub trait Authenticator: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed API token
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Authenticator for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.clone())
    }
}

/// HTTP transport for the sync endpoint
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    user_agent: String,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl HttpTransport {
    /// Create a transport for the API rooted at `base_url`
    ///
    /// The base URL must end with a slash; the endpoint is `<base_url>sync`.
    pub fn new(base_url: &str) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SyncError::Transport)?;
        Self::with_client(base_url, client)
    }

    /// Create a transport using an existing HTTP client
    pub fn with_client(base_url: &str, client: reqwest::Client) -> SyncResult<Self> {
        if !base_url.ends_with('/') {
            return Err(SyncError::validation(format!(
                "base URL must have a trailing slash, but '{}' does not",
                base_url
            )));
        }
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("sync"))
            .map_err(|e| SyncError::validation(format!("invalid base URL '{}': {}", base_url, e)))?;

        Ok(Self {
            client,
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            authenticator: None,
        })
    }

    /// Return a copy that authenticates every request with `authenticator`
    pub fn with_authenticator(&self, authenticator: Arc<dyn Authenticator>) -> Self {
        let mut decorated = self.clone();
        decorated.authenticator = Some(authenticator);
        decorated
    }

    /// Return a copy that sends `token` as bearer credential
    pub fn with_auth_token(&self, token: impl Into<String>) -> Self {
        self.with_authenticator(Arc::new(StaticToken::new(token)))
    }

    /// Override the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Full URL of the sync endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build(&self, fields: &[(&'static str, String)]) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(self.endpoint.clone()).form(fields);
        if !self.user_agent.is_empty() {
            builder = builder.header(USER_AGENT, &self.user_agent);
        }
        if let Some(token) = self.authenticator.as_ref().and_then(|a| a.bearer_token()) {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &SyncRequest) -> SyncResult<SyncResponse> {
        let fields = request.form_fields()?;
        debug!(
            "POST {} (full={}, commands={})",
            self.endpoint,
            request.is_full(),
            request.commands.len()
        );

        let response = self
            .build(&fields)
            .send()
            .await
            .map_err(SyncError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(SyncError::Transport)?;
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<SyncResponse>().await.map_err(|e| {
            if e.is_decode() {
                SyncError::decode(e.to_string())
            } else {
                SyncError::Transport(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::command::{AddProjectArgs, CommandArgs};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project_command() -> Command {
        Command::new(CommandArgs::ProjectAdd(AddProjectArgs::new("test project")))
            .unwrap()
            .with_uuid("temp")
            .with_temp_id("temp")
    }

    #[test]
    fn test_form_fields_full_sync() {
        let request = SyncRequest {
            sync_token: "*".into(),
            resource_types: vec![ResourceType::Projects, ResourceType::Labels],
            commands: Vec::new(),
        };
        let fields = request.form_fields().unwrap();
        assert_eq!(
            fields,
            vec![
                ("sync_token", "*".to_string()),
                ("resource_types", r#"["projects","labels"]"#.to_string()),
            ]
        );
        assert!(request.is_full());
    }

    #[test]
    fn test_form_fields_with_commands() {
        let request = SyncRequest {
            sync_token: "a1b2c3d4".into(),
            resource_types: vec![ResourceType::Projects],
            commands: vec![project_command()],
        };
        let fields = request.form_fields().unwrap();
        assert_eq!(fields[0], ("sync_token", "a1b2c3d4".to_string()));
        assert_eq!(fields[1], ("resource_types", r#"["projects"]"#.to_string()));
        assert_eq!(
            fields[2],
            (
                "commands",
                r#"[{"type":"project_add","temp_id":"temp","uuid":"temp","args":{"name":"test project"}}]"#
                    .to_string()
            )
        );
    }

    #[test]
    fn test_form_fields_rejects_empty_resource_types() {
        let request = SyncRequest {
            sync_token: "*".into(),
            resource_types: Vec::new(),
            commands: Vec::new(),
        };
        assert!(matches!(
            request.form_fields(),
            Err(SyncError::Validation { .. })
        ));
    }

    #[test]
    fn test_sync_status_decoding() {
        let body = r#"{
            "sync_token": "abc",
            "sync_status": {
                "a": "ok",
                "b": {"error_code": 15, "error": "Invalid temporary id"}
            },
            "temp_id_mapping": {},
            "user": {"full_name": "ignored"}
        }"#;
        let response: SyncResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.sync_token.as_deref(), Some("abc"));
        assert_eq!(response.sync_status["a"], CommandStatus::Ok);
        assert_eq!(
            response.sync_status["b"],
            CommandStatus::Failed(ServerError {
                error_code: 15,
                error: "Invalid temporary id".into()
            })
        );
    }

    #[test]
    fn test_sync_status_rejects_unknown_string() {
        let body = r#"{"sync_status": {"a": "maybe"}}"#;
        assert!(serde_json::from_str::<SyncResponse>(body).is_err());
    }

    #[test]
    fn test_base_url_requires_trailing_slash() {
        assert!(matches!(
            HttpTransport::new("https://api.example.com/sync/v9"),
            Err(SyncError::Validation { .. })
        ));
        let transport = HttpTransport::new("https://api.example.com/sync/v9/").unwrap();
        assert_eq!(
            transport.endpoint().as_str(),
            "https://api.example.com/sync/v9/sync"
        );
    }

    #[tokio::test]
    async fn test_execute_posts_form_with_bearer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sync/v9/sync"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("sync_token=*"))
            .and(body_string_contains("resource_types=%5B%22items%22%5D"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sync_token": "next",
                "full_sync": true,
                "items": [{"id": "1", "content": "test item"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&format!("{}/sync/v9/", server.uri()))
            .unwrap()
            .with_auth_token("secret-token");
        let request = SyncRequest {
            sync_token: FULL_SYNC_TOKEN.into(),
            resource_types: vec![ResourceType::Items],
            commands: Vec::new(),
        };

        let response = transport.execute(&request).await.unwrap();
        assert_eq!(response.sync_token.as_deref(), Some("next"));
        assert!(response.full_sync);
        assert_eq!(response.items[0].content, "test item");
    }

    #[tokio::test]
    async fn test_execute_non_success_preserves_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden: bad token"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&format!("{}/", server.uri())).unwrap();
        let result = transport.execute(&SyncRequest::full(Vec::new())).await;

        match result {
            Err(SyncError::HttpStatus { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "Forbidden: bad token");
            }
            other => panic!("expected HttpStatus, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_execute_invalid_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&format!("{}/", server.uri())).unwrap();
        let result = transport.execute(&SyncRequest::full(Vec::new())).await;
        assert!(matches!(result, Err(SyncError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_execute_connection_refused_is_transport_error() {
        // Nothing listens on port 1
        let transport = HttpTransport::new("http://127.0.0.1:1/").unwrap();
        let result = transport.execute(&SyncRequest::full(Vec::new())).await;
        assert!(matches!(result, Err(SyncError::Transport(_))));
    }

    #[tokio::test]
    async fn test_undecorated_transport_sends_no_credential() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("missing token"))
            .mount(&server)
            .await;

        let base = HttpTransport::new(&format!("{}/", server.uri())).unwrap();
        let authed = base.with_auth_token("secret-token");

        assert!(authed.execute(&SyncRequest::full(Vec::new())).await.is_ok());
        assert!(matches!(
            base.execute(&SyncRequest::full(Vec::new())).await,
            Err(SyncError::HttpStatus { status: 401, .. })
        ));
    }
}
