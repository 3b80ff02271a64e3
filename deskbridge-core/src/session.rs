//! Session lifecycle for the remote facade
//!
//! A [`SessionManager`] owns at most one live transport for the whole
//! process. It connects lazily on the first call, validates configuration
//! before touching the network, decorates every request with the process
//! identity and turns response envelopes into payloads or typed errors.

use crate::error::{BridgeError, Result};
use crate::payload::{Envelope, Params, Payload};
use crate::transport::{Connector, RemoteFacade, Transport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const ENV_USER_EMAIL: &str = "DESKBRIDGE_USER_EMAIL";
pub const ENV_CLIENT_ID: &str = "DESKBRIDGE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DESKBRIDGE_CLIENT_SECRET";
pub const ENV_SERVER_COMMAND: &str = "DESKBRIDGE_SERVER_COMMAND";
pub const ENV_SERVER_ARGS: &str = "DESKBRIDGE_SERVER_ARGS";
pub const ENV_REQUEST_TIMEOUT: &str = "DESKBRIDGE_REQUEST_TIMEOUT_SECS";
pub const ENV_IDENTITY_PARAM: &str = "DESKBRIDGE_IDENTITY_PARAM";

/// Settings read once when the session starts
#[derive(Clone)]
pub struct SessionConfig {
    /// Program launched to serve the remote facade
    pub server_command: String,
    /// Extra arguments for the server program
    pub server_args: Vec<String>,
    /// Identity every request acts on behalf of (required)
    pub user_email: Option<String>,
    /// OAuth client id handed to the server (required)
    pub client_id: Option<String>,
    /// OAuth client secret handed to the server (required)
    pub client_secret: Option<String>,
    /// Parameter name carrying the identity on each request
    pub identity_param: String,
    /// Upper bound for one remote round-trip
    pub request_timeout: Duration,
    /// Upper bound for spawning the transport and completing the handshake
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_command: "workspace-mcp".to_string(),
            server_args: Vec::new(),
            user_email: None,
            client_id: None,
            client_secret: None,
            identity_param: "user_google_email".to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server_command", &self.server_command)
            .field("server_args", &self.server_args)
            .field("user_email", &self.user_email)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("identity_param", &self.identity_param)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Required values after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_email: String,
    pub client_id: String,
    pub client_secret: String,
}

impl SessionConfig {
    /// Build a configuration from an arbitrary variable lookup
    ///
    /// Missing required values are kept as `None`; they are reported by
    /// [`validate`](Self::validate) when the session first connects.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = match non_empty(ENV_REQUEST_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    BridgeError::Configuration(format!(
                        "{} must be a whole number of seconds, got {:?}",
                        ENV_REQUEST_TIMEOUT, raw
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            server_command: non_empty(ENV_SERVER_COMMAND).unwrap_or(defaults.server_command),
            server_args: non_empty(ENV_SERVER_ARGS)
                .map(|args| args.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            user_email: non_empty(ENV_USER_EMAIL),
            client_id: non_empty(ENV_CLIENT_ID),
            client_secret: non_empty(ENV_CLIENT_SECRET),
            identity_param: non_empty(ENV_IDENTITY_PARAM).unwrap_or(defaults.identity_param),
            request_timeout,
            connect_timeout: defaults.connect_timeout,
        })
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from the process environment, filling gaps from a dotenv file
    ///
    /// Variables already set in the environment take precedence, as with
    /// `dotenvy` itself. The process environment is not modified.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            BridgeError::Configuration(format!("Could not read {}: {}", path.display(), e))
        })?;

        let mut file_vars = HashMap::new();
        for item in iter {
            let (name, value) = item.map_err(|e| {
                BridgeError::Configuration(format!("Malformed line in {}: {}", path.display(), e))
            })?;
            file_vars.insert(name, value);
        }

        Self::from_lookup(|name| std::env::var(name).ok().or_else(|| file_vars.get(name).cloned()))
    }

    /// Check that every required value is present
    ///
    /// All missing values are reported at once.
    pub fn validate(&self) -> Result<Credentials> {
        let mut missing = Vec::new();
        if self.user_email.is_none() {
            missing.push(ENV_USER_EMAIL);
        }
        if self.client_id.is_none() {
            missing.push(ENV_CLIENT_ID);
        }
        if self.client_secret.is_none() {
            missing.push(ENV_CLIENT_SECRET);
        }
        if !missing.is_empty() {
            return Err(BridgeError::Configuration(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.server_command.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "server command must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(BridgeError::Configuration(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Credentials {
            user_email: self.user_email.clone().unwrap_or_default(),
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
        })
    }
}

/// A step applied to every request before it is dispatched
pub trait RequestDecorator: Send + Sync {
    fn decorate(&self, operation: &str, params: &mut Params);
}

/// Adds the process identity to requests that do not name one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDecorator {
    param: String,
    value: String,
}

impl IdentityDecorator {
    pub fn new(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            value: value.into(),
        }
    }
}

impl RequestDecorator for IdentityDecorator {
    fn decorate(&self, _operation: &str, params: &mut Params) {
        let supplied = params.get(&self.param).map(|v| !v.is_null()).unwrap_or(false);
        if !supplied {
            params.insert(self.param.clone(), Value::String(self.value.clone()));
        }
    }
}

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

struct LiveSession {
    id: Uuid,
    transport: Box<dyn Transport>,
    identity: IdentityDecorator,
}

/// Owner of the single connection to the remote facade
pub struct SessionManager {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    live: Mutex<Option<LiveSession>>,
    status: watch::Sender<SessionStatus>,
}

impl SessionManager {
    /// Create an unconnected session; nothing is validated or spawned yet
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Unconnected);
        Self {
            config,
            connector,
            decorators: Vec::new(),
            live: Mutex::new(None),
            status,
        }
    }

    /// Add a decorator applied after identity injection
    pub fn with_decorator(mut self, decorator: Arc<dyn RequestDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Observe lifecycle transitions
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Identifier of the live connection, if any
    pub async fn session_id(&self) -> Option<Uuid> {
        self.live.lock().await.as_ref().map(|live| live.id)
    }

    /// Establish the transport if it is not already up
    ///
    /// Configuration is validated first; a missing value fails before any
    /// connection attempt. An explicit call may reopen a closed session.
    pub async fn connect(&self) -> Result<()> {
        let mut live = self.live.lock().await;
        self.connect_locked(&mut live).await
    }

    async fn connect_locked(&self, live: &mut Option<LiveSession>) -> Result<()> {
        if live.is_some() {
            return Ok(());
        }

        let credentials = self.config.validate()?;
        let previous = self.status.send_replace(SessionStatus::Connecting);

        info!(
            "Connecting to remote facade via {} (identity: {})",
            self.config.server_command, credentials.user_email
        );

        let establish = async {
            let mut transport = self.connector.connect(&self.config).await?;
            if let Err(e) = transport.handshake().await {
                if let Err(close_err) = transport.close().await {
                    debug!("Closing after failed handshake also failed: {}", close_err);
                }
                return Err(e);
            }
            Ok::<Box<dyn Transport>, BridgeError>(transport)
        };

        let outcome = match tokio::time::timeout(self.config.connect_timeout, establish).await {
            Ok(Ok(transport)) => Ok(transport),
            Ok(Err(e)) => Err(as_connection_error(e)),
            Err(_) => Err(BridgeError::Timeout {
                timeout_seconds: self.config.connect_timeout.as_secs(),
                context: "establishing session".to_string(),
            }),
        };

        match outcome {
            Ok(transport) => {
                let id = Uuid::new_v4();
                *live = Some(LiveSession {
                    id,
                    transport,
                    identity: IdentityDecorator::new(
                        self.config.identity_param.clone(),
                        credentials.user_email,
                    ),
                });
                self.status.send_replace(SessionStatus::Connected);
                info!("Session {} connected", id);
                Ok(())
            }
            Err(e) => {
                let fallback = if previous == SessionStatus::Closed {
                    SessionStatus::Closed
                } else {
                    SessionStatus::Unconnected
                };
                self.status.send_replace(fallback);
                error!("Failed to establish session: {}", e);
                Err(e)
            }
        }
    }

    /// Tear the transport down; a no-op when nothing is connected
    ///
    /// The session stays closed: later calls fail with
    /// [`BridgeError::SessionClosed`] until [`connect`](Self::connect) is
    /// called explicitly.
    pub async fn disconnect(&self) -> Result<()> {
        let mut live = self.live.lock().await;
        let Some(mut session) = live.take() else {
            debug!("Disconnect requested with no live session");
            return Ok(());
        };

        if let Err(e) = session.transport.close().await {
            warn!("Session {} did not close cleanly: {}", session.id, e);
        }
        self.status.send_replace(SessionStatus::Closed);
        info!("Session {} closed", session.id);
        Ok(())
    }

    /// Run one operation, connecting first if needed
    pub async fn invoke(&self, operation: &str, mut params: Params) -> Result<Payload> {
        let mut live = self.live.lock().await;

        if live.is_none() {
            if self.status() == SessionStatus::Closed {
                return Err(BridgeError::SessionClosed);
            }
            self.connect_locked(&mut live).await?;
        }

        let Some(session) = live.as_mut() else {
            return Err(BridgeError::Connection("session unavailable after connect".to_string()));
        };

        session.identity.decorate(operation, &mut params);
        for decorator in &self.decorators {
            decorator.decorate(operation, &mut params);
        }

        debug!("Invoking {} on session {}", operation, session.id);
        let session_id = session.id;
        let outcome = tokio::time::timeout(
            self.config.request_timeout,
            session.transport.call(operation, params),
        )
        .await;

        let envelope = match outcome {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(BridgeError::Connection(message))) => {
                // The transport is gone; the next call connects afresh
                warn!("Session {} lost its transport: {}", session_id, message);
                *live = None;
                self.status.send_replace(SessionStatus::Unconnected);
                return Err(BridgeError::Connection(message));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(BridgeError::Timeout {
                    timeout_seconds: self.config.request_timeout.as_secs(),
                    context: operation.to_string(),
                })
            }
        };

        classify(operation, envelope)
    }
}

#[async_trait]
impl RemoteFacade for SessionManager {
    async fn invoke(&self, operation: &str, params: Params) -> Result<Payload> {
        SessionManager::invoke(self, operation, params).await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

/// Turn a response envelope into a payload or a remote error
pub fn classify(operation: &str, envelope: Envelope) -> Result<Payload> {
    if envelope.is_error {
        let message = envelope.joined_text();
        let message = if message.trim().is_empty() {
            "remote reported an error without a message".to_string()
        } else {
            message
        };
        warn!("{} failed remotely: {}", operation, message);
        return Err(BridgeError::remote(operation, message));
    }
    Ok(envelope.into_payload())
}

fn as_connection_error(e: BridgeError) -> BridgeError {
    match e {
        BridgeError::Connection(_) | BridgeError::Timeout { .. } | BridgeError::Configuration(_) => e,
        other => BridgeError::Connection(other.to_string()),
    }
}
