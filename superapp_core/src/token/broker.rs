use super::{error::AuthError, Result};
use crate::bridge::{resolve_method, Outbound};
use crate::registry::AppRegistry;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Bridge topic guests use to ask for a bearer credential
pub const TOKEN_TOPIC: &str = "token";

/// Continuation waiting for a valid token
pub type TokenWaiter = Box<dyn FnOnce(&str) + Send>;

/// Auth collaborator exchanging host credentials for an app-scoped token
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(
        &self,
        client_id: &str,
        existing_token: Option<&str>,
        app_id: &str,
    ) -> Result<String>;

    fn is_expiring_soon(&self, token: &str) -> bool;
}

/// Identity of the guest session a broker serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub app_id: String,
    pub client_id: String,
    pub exchanged_token: Option<String>,
}

impl SessionCredentials {
    pub fn new(app_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            client_id: client_id.into(),
            exchanged_token: None,
        }
    }
}

/// What happened to a token request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequest {
    /// Answered immediately from the cached token
    Resolved,
    /// Waiting for a refresh started elsewhere, or for the first token
    Queued,
    /// Waiting, and this request started the refresh
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// Another refresh was already in flight
    Joined,
    Failed,
}

#[derive(Default)]
struct BrokerState {
    token: Option<String>,
    waiters: VecDeque<TokenWaiter>,
    refreshing: bool,
}

struct BrokerInner {
    session: SessionCredentials,
    exchanger: Arc<dyn TokenExchanger>,
    registry: AppRegistry,
    outbound: Outbound,
    state: Mutex<BrokerState>,
}

/// Clears the in-flight flag if a refresh is abandoned mid-exchange
struct InFlight<'a> {
    state: &'a Mutex<BrokerState>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().refreshing = false;
        }
    }
}

/// Owns one guest session's credential and the callers waiting on it.
///
/// At most one exchange runs at a time; every caller that arrives while it
/// is in flight joins the same outcome. A failed exchange leaves the waiters
/// queued until a later refresh succeeds.
#[derive(Clone)]
pub struct TokenBroker {
    inner: Arc<BrokerInner>,
}

impl TokenBroker {
    pub fn new(
        session: SessionCredentials,
        exchanger: Arc<dyn TokenExchanger>,
        registry: AppRegistry,
        outbound: Outbound,
    ) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                session,
                exchanger,
                registry,
                outbound,
                state: Mutex::new(BrokerState::default()),
            }),
        }
    }

    pub fn session(&self) -> &SessionCredentials {
        &self.inner.session
    }

    /// Currently cached token, valid or not
    pub fn token(&self) -> Option<String> {
        self.inner.state.lock().token.clone()
    }

    /// Seed the cached token, e.g. one restored from secure storage
    pub fn set_token(&self, token: impl Into<String>) {
        self.inner.state.lock().token = Some(token.into());
    }

    /// Number of callers waiting for a token
    pub fn pending(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().refreshing
    }

    /// Queue a waiter without checking the cached token
    pub fn enqueue(&self, waiter: TokenWaiter) {
        self.inner.state.lock().waiters.push_back(waiter);
    }

    /// Open the session with its initial exchange
    pub async fn start(&self) -> RefreshOutcome {
        info!("Starting token session for {}", self.inner.session.app_id);
        self.refresh().await
    }

    /// Hand `waiter` a valid token now, or queue it until one is available.
    ///
    /// A valid cached token also releases everyone already queued. An
    /// expiring token triggers a refresh unless one is in flight. Without any
    /// token the caller simply waits for the session's own exchange.
    pub async fn request_token(&self, waiter: TokenWaiter) -> TokenRequest {
        enum Next {
            ResolveNow(String, TokenWaiter, Vec<TokenWaiter>),
            Refresh,
            Wait,
        }

        let next = {
            let mut state = self.inner.state.lock();
            match state.token.clone() {
                Some(token) if !self.inner.exchanger.is_expiring_soon(&token) => {
                    let queued = state.waiters.drain(..).collect();
                    Next::ResolveNow(token, waiter, queued)
                }
                Some(_) => {
                    state.waiters.push_back(waiter);
                    if state.refreshing {
                        Next::Wait
                    } else {
                        // Claimed under the same lock that saw the stale token
                        state.refreshing = true;
                        Next::Refresh
                    }
                }
                None => {
                    state.waiters.push_back(waiter);
                    Next::Wait
                }
            }
        };

        match next {
            Next::ResolveNow(token, waiter, queued) => {
                if !queued.is_empty() {
                    debug!("Releasing {} queued token waiters", queued.len());
                }
                waiter(&token);
                for queued_waiter in queued {
                    queued_waiter(&token);
                }
                TokenRequest::Resolved
            }
            Next::Refresh => {
                debug!(
                    "Token for {} is expiring, refreshing",
                    self.inner.session.app_id
                );
                self.run_claimed_refresh().await;
                TokenRequest::Refreshing
            }
            Next::Wait => TokenRequest::Queued,
        }
    }

    /// Exchange for a new token, publish it and release all waiters
    pub async fn refresh(&self) -> RefreshOutcome {
        {
            let mut state = self.inner.state.lock();
            if state.refreshing {
                debug!(
                    "Token refresh already in flight for {}",
                    self.inner.session.app_id
                );
                return RefreshOutcome::Joined;
            }
            state.refreshing = true;
        }
        self.run_claimed_refresh().await
    }

    /// Runs the exchange for a caller that has already set `refreshing`
    async fn run_claimed_refresh(&self) -> RefreshOutcome {
        let inner = &self.inner;
        let app_id = inner.session.app_id.as_str();
        let mut in_flight = InFlight {
            state: &inner.state,
            armed: true,
        };

        let existing = inner
            .registry
            .read_app(app_id, |app| app.exchanged_token.clone())
            .flatten()
            .or_else(|| inner.session.exchanged_token.clone());

        let result = match inner
            .exchanger
            .exchange(&inner.session.client_id, existing.as_deref(), app_id)
            .await
        {
            Ok(token) if token.is_empty() => Err(AuthError::EmptyToken),
            other => other,
        };

        match result {
            Ok(token) => {
                let waiters: Vec<TokenWaiter> = {
                    let mut state = inner.state.lock();
                    state.refreshing = false;
                    state.token = Some(token.clone());
                    state.waiters.drain(..).collect()
                };
                in_flight.armed = false;

                if let Err(e) = inner.registry.apply_token_update(app_id, &token) {
                    debug!("Token not recorded in registry: {}", e);
                }
                inner
                    .outbound
                    .push(resolve_method(TOKEN_TOPIC), Value::String(token.clone()));

                info!(
                    "Refreshed token for {}, releasing {} waiters",
                    app_id,
                    waiters.len()
                );
                for waiter in waiters {
                    waiter(&token);
                }
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                error!("Token exchange error for {}: {}", app_id, e);
                RefreshOutcome::Failed
            }
        }
    }
}

impl fmt::Debug for TokenBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TokenBroker")
            .field("app_id", &self.inner.session.app_id)
            .field("has_token", &state.token.is_some())
            .field("pending", &state.waiters.len())
            .field("refreshing", &state.refreshing)
            .finish()
    }
}
