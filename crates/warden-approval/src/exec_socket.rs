//! Client for the external exec-approval service.
//!
//! Protocol: JSON Lines over a Unix socket. The client writes one request
//! line and reads lines until it sees the decision carrying its id.
//!
//! ```text
//! → {"type":"request","token":"…","id":"…","request":{"command":"…","argv":[…],"host":"gateway","security":"allowlist","ask":"always"}}
//! ← {"type":"decision","id":"…","decision":"allow-once"}
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use tracing::debug;
use tracing::warn;
#[cfg(unix)]
use uuid::Uuid;
use warden_config::ExecSocketSection;

use crate::decision::GateDecision;
use crate::error::{ApprovalError, ApprovalResult};

/// Request body sent to the exec-approval service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecApprovalRequest {
    /// Human-readable command line being approved.
    pub command: String,
    /// The same command split into arguments.
    pub argv: Vec<String>,
    /// Host tag.
    pub host: String,
    /// Security policy tag.
    pub security: String,
    /// Ask policy.
    pub ask: String,
    /// Agent identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Conversation session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

impl ExecApprovalRequest {
    /// Build a request for `argv`, with policy tags taken from `settings`.
    #[must_use]
    pub fn new(argv: Vec<String>, settings: &ExecSocketSection, session_key: Option<&str>) -> Self {
        Self {
            command: argv.join(" "),
            argv,
            host: settings.host.clone(),
            security: settings.security.clone(),
            ask: settings.ask.clone(),
            agent_id: settings.agent_id.clone(),
            session_key: session_key.map(ToOwned::to_owned),
        }
    }
}

/// Something that can ask the exec-approval service for a decision.
#[async_trait]
pub trait ExecApprovalClient: Send + Sync {
    /// Ask for a decision. Callers bound the wait with their own timeout.
    async fn request(&self, request: &ExecApprovalRequest) -> ApprovalResult<GateDecision>;
}

#[cfg(unix)]
#[derive(Serialize)]
struct RequestEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    token: Option<&'a str>,
    id: &'a str,
    request: &'a ExecApprovalRequest,
}

#[cfg(unix)]
#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    decision: String,
}

/// [`ExecApprovalClient`] over a Unix domain socket.
#[derive(Clone)]
pub struct UnixSocketApprovalClient {
    path: PathBuf,
    token: Option<String>,
}

impl std::fmt::Debug for UnixSocketApprovalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixSocketApprovalClient")
            .field("path", &self.path)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl UnixSocketApprovalClient {
    /// Client for the service listening at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, token: Option<String>) -> Self {
        Self {
            path: path.into(),
            token,
        }
    }

    /// Build from config. The bearer token is read from `token_env` once,
    /// here. Returns `None` if no socket path is configured.
    #[must_use]
    pub fn from_config(settings: &ExecSocketSection) -> Option<Self> {
        let path = settings.path.clone()?;
        let token = settings.token_env.as_deref().and_then(|var| {
            let value = std::env::var(var).ok();
            if value.is_none() {
                warn!(var, "exec-approval token variable is not set");
            }
            value
        });
        Some(Self::new(path, token))
    }
}

#[cfg(unix)]
#[async_trait]
impl ExecApprovalClient for UnixSocketApprovalClient {
    async fn request(&self, request: &ExecApprovalRequest) -> ApprovalResult<GateDecision> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::UnixStream;

        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            ApprovalError::Transport(format!("connect {}: {e}", self.path.display()))
        })?;
        let (read_half, mut write_half) = stream.into_split();

        let id = Uuid::new_v4().to_string();
        let envelope = RequestEnvelope {
            kind: "request",
            token: self.token.as_deref(),
            id: &id,
            request,
        };
        let mut line = serde_json::to_string(&envelope)?;
        line.push('\n');
        write_half.write_all(line.as_bytes()).await?;
        write_half.flush().await?;
        debug!(id = %id, command = %request.command, "sent exec-approval request");

        let mut lines = BufReader::new(read_half).lines();
        while let Some(line) = lines.next_line().await? {
            let Ok(response) = serde_json::from_str::<ResponseEnvelope>(&line) else {
                debug!("ignoring unparseable line from exec-approval service");
                continue;
            };
            if response.kind == "decision" && response.id == id {
                let decision = GateDecision::from_wire(&response.decision);
                debug!(id = %id, decision = %decision, "exec-approval decision");
                return Ok(decision);
            }
        }
        Err(ApprovalError::Protocol(
            "connection closed before a decision arrived".to_owned(),
        ))
    }
}

#[cfg(not(unix))]
#[async_trait]
impl ExecApprovalClient for UnixSocketApprovalClient {
    async fn request(&self, _request: &ExecApprovalRequest) -> ApprovalResult<GateDecision> {
        Err(ApprovalError::Transport(format!(
            "unix sockets are unavailable on this platform ({})",
            self.path.display()
        )))
    }
}

#[cfg(all(test, not(unix)))]
mod non_unix_tests {
    use super::*;

    #[tokio::test]
    async fn test_request_fails_closed_without_unix_sockets() {
        let client = UnixSocketApprovalClient::new("approvals.sock", None);
        let request = ExecApprovalRequest::new(
            vec!["message.send".to_owned()],
            &ExecSocketSection::default(),
            None,
        );
        let err = client.request(&request).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Transport(_)));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;

    use super::*;

    /// Serve one connection, answering with `reply(id)`.
    fn serve_once<F>(listener: UnixListener, reply: F) -> tokio::task::JoinHandle<serde_json::Value>
    where
        F: FnOnce(&str) -> String + Send + 'static,
    {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let value: serde_json::Value = serde_json::from_str(&line).unwrap();
            let id = value["id"].as_str().unwrap().to_owned();
            write_half.write_all(reply(&id).as_bytes()).await.unwrap();
            value
        })
    }

    fn request() -> ExecApprovalRequest {
        ExecApprovalRequest::new(
            vec!["message.send".to_owned(), "telegram".to_owned(), "alice".to_owned()],
            &ExecSocketSection::default(),
            Some("session-1"),
        )
    }

    #[tokio::test]
    async fn test_round_trip_allow_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approvals.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let server = serve_once(listener, |id| {
            format!(
                "{{\"type\":\"ack\"}}\n{{\"type\":\"decision\",\"id\":\"other\",\"decision\":\"deny\"}}\n\
                 {{\"type\":\"decision\",\"id\":\"{id}\",\"decision\":\"allow-once\"}}\n"
            )
        });

        let client = UnixSocketApprovalClient::new(&path, Some("secret-token".to_owned()));
        let decision = client.request(&request()).await.unwrap();
        assert_eq!(decision, GateDecision::AllowOnce);

        let sent = server.await.unwrap();
        assert_eq!(sent["type"], "request");
        assert_eq!(sent["token"], "secret-token");
        assert_eq!(sent["request"]["command"], "message.send telegram alice");
        assert_eq!(sent["request"]["host"], "gateway");
        assert_eq!(sent["request"]["sessionKey"], "session-1");
        assert!(sent["request"].get("agentId").is_none());
    }

    #[tokio::test]
    async fn test_unknown_decision_denies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approvals.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(listener, |id| {
            format!("{{\"type\":\"decision\",\"id\":\"{id}\",\"decision\":\"maybe\"}}\n")
        });

        let client = UnixSocketApprovalClient::new(&path, None);
        assert_eq!(client.request(&request()).await.unwrap(), GateDecision::Deny);
    }

    #[tokio::test]
    async fn test_closed_connection_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approvals.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let _server = serve_once(listener, |_| String::new());

        let client = UnixSocketApprovalClient::new(&path, None);
        let err = client.request(&request()).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_missing_socket_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = UnixSocketApprovalClient::new(dir.path().join("absent.sock"), None);
        let err = client.request(&request()).await.unwrap_err();
        assert!(matches!(err, ApprovalError::Transport(_)));
    }

    #[test]
    fn test_from_config_requires_path() {
        assert!(UnixSocketApprovalClient::from_config(&ExecSocketSection::default()).is_none());
        let settings = ExecSocketSection {
            path: Some(PathBuf::from("/run/approvals.sock")),
            ..Default::default()
        };
        assert!(UnixSocketApprovalClient::from_config(&settings).is_some());
    }
}
