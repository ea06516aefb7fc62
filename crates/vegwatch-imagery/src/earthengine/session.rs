//! Credential lifecycle for the Earth Engine REST API.
//!
//! A session starts `Uninitialized`, and moves to `Ready` or `Failed` the first time
//! [`EarthEngineSession::initialize`] runs. The server calls it at startup and only
//! logs a failure; every backend call checks the state again through
//! [`EarthEngineSession::access_token`].
//!
//! A token file is read again on every call once the session is ready, so an
//! external agent can rotate short-lived OAuth2 tokens without a restart.

use std::path::PathBuf;
use tokio::sync::RwLock;
use vegwatch_core::error::{Result, VegwatchError};

/// Environment variable holding an OAuth2 access token
pub const TOKEN_ENV_VAR: &str = "EARTHENGINE_TOKEN";

/// Where the OAuth2 bearer token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Token stored in a file, refreshed by an external agent; re-read on every call
    TokenFile(PathBuf),
    /// Token stored in an environment variable
    Environment(String),
}

impl Default for CredentialSource {
    fn default() -> Self {
        CredentialSource::Environment(TOKEN_ENV_VAR.to_string())
    }
}

impl CredentialSource {
    /// Whether the token can change while the process runs
    fn is_refreshable(&self) -> bool {
        matches!(self, CredentialSource::TokenFile(_))
    }

    async fn resolve(&self) -> std::result::Result<String, String> {
        let token = match self {
            CredentialSource::TokenFile(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("cannot read token file {}: {}", path.display(), e))?,
            CredentialSource::Environment(var) => {
                std::env::var(var).map_err(|_| format!("{} is not set", var))?
            }
        };

        let token = token.trim().to_string();
        if token.is_empty() {
            return Err("access token is empty".to_string());
        }
        Ok(token)
    }
}

/// OAuth2 bearer token; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready(AccessToken),
    Failed { reason: String },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready(_) => "ready",
            SessionState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug)]
pub struct EarthEngineSession {
    credentials: CredentialSource,
    state: RwLock<SessionState>,
}

impl EarthEngineSession {
    pub fn new(credentials: CredentialSource) -> Self {
        Self {
            credentials,
            state: RwLock::new(SessionState::Uninitialized),
        }
    }

    /// Resolve credentials once. Later calls return the recorded outcome.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.write().await;

        if matches!(*state, SessionState::Uninitialized) {
            *state = match self.credentials.resolve().await {
                Ok(token) => {
                    tracing::info!("Earth Engine session ready");
                    SessionState::Ready(AccessToken(token))
                }
                Err(reason) => {
                    tracing::error!(
                        reason = %reason,
                        "Earth Engine session initialization failed"
                    );
                    SessionState::Failed { reason }
                }
            };
        }

        match &*state {
            SessionState::Failed { reason } => {
                Err(VegwatchError::BackendUnavailable {
                    reason: reason.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Token for the next request, initializing lazily on first use
    pub async fn access_token(&self) -> Result<AccessToken> {
        let cached = match &*self.state.read().await {
            SessionState::Ready(token) => Some(token.clone()),
            SessionState::Failed { reason } => {
                return Err(VegwatchError::BackendUnavailable {
                    reason: reason.clone(),
                })
            }
            SessionState::Uninitialized => None,
        };

        if let Some(token) = cached {
            if self.credentials.is_refreshable() {
                return Ok(self.refresh(token).await);
            }
            return Ok(token);
        }

        self.initialize().await?;

        match &*self.state.read().await {
            SessionState::Ready(token) => Ok(token.clone()),
            other => Err(VegwatchError::BackendUnavailable {
                reason: format!("session is {}", other.label()),
            }),
        }
    }

    /// Re-read a rotating token. An unreadable source keeps the cached token.
    async fn refresh(&self, cached: AccessToken) -> AccessToken {
        match self.credentials.resolve().await {
            Ok(fresh) if fresh != cached.secret() => {
                let token = AccessToken(fresh);
                let mut state = self.state.write().await;
                if matches!(*state, SessionState::Ready(_)) {
                    *state = SessionState::Ready(token.clone());
                }
                tracing::debug!("Earth Engine access token rotated");
                token
            }
            Ok(_) => cached,
            Err(reason) => {
                tracing::warn!(
                    reason = %reason,
                    "Cannot re-read Earth Engine token; using the previous one"
                );
                cached
            }
        }
    }
}
