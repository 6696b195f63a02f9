//! Builder pattern for constructing an [`AgentClient`].

use std::sync::Arc;
use std::time::Duration;

use al_domain::Config;
use al_protocol::DEFAULT_API_VERSION;

use crate::client::{AgentClient, WorkerSettings};
use crate::reconnect::ReconnectBackoff;
use crate::registry::DEFAULT_REQUEST_TIMEOUT;
use crate::services::{Authenticator, Credentials, DomainResolver, HttpAuthenticator, StaticDomains};
use crate::supervisor::DEFAULT_SWEEP_INTERVAL;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PING_INTERVAL};
use crate::types::SdkError;

/// Default interval between `.GetClock` keep-alive probes.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);
/// Default broadcast buffer per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Fluent builder for [`AgentClient`].
///
/// `build()` must run inside a Tokio runtime: it spawns the connection
/// worker, which immediately starts domain resolution, login (when no token
/// is given), and the first connect.
///
/// # Example
///
/// ```rust,no_run
/// # use al_agent_sdk::AgentClientBuilder;
/// # async fn demo() -> Result<(), al_agent_sdk::SdkError> {
/// let client = AgentClientBuilder::new()
///     .account_id("12345678")
///     .token("bearer-token")
///     .domain("asyncMessagingEnt", "va.msg.example.net")
///     .request_timeout(std::time::Duration::from_secs(5))
///     .build()?;
/// let mut events = client.subscribe();
/// # Ok(()) }
/// ```
pub struct AgentClientBuilder {
    account_id: String,
    token: Option<String>,
    credentials: Option<Credentials>,
    api_version: String,
    scheme: String,
    request_timeout: Duration,
    sweep_interval: Duration,
    keepalive_interval: Option<Duration>,
    ping_interval: Duration,
    connect_timeout: Duration,
    event_capacity: usize,
    reconnect_backoff: Option<ReconnectBackoff>,
    domains: StaticDomains,
    domain_resolver: Option<Arc<dyn DomainResolver>>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl AgentClientBuilder {
    pub fn new() -> Self {
        Self {
            account_id: String::new(),
            token: None,
            credentials: None,
            api_version: DEFAULT_API_VERSION.into(),
            scheme: "wss".into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            keepalive_interval: Some(DEFAULT_KEEPALIVE_INTERVAL),
            ping_interval: DEFAULT_PING_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            reconnect_backoff: None,
            domains: StaticDomains::new(),
            domain_resolver: None,
            authenticator: None,
        }
    }

    /// Seed a builder from a loaded [`Config`]. Secrets come from the
    /// environment variables the config names.
    pub fn from_config(config: &Config) -> Self {
        let conn = &config.connection;
        let mut builder = Self::new()
            .account_id(config.account.account_id.clone())
            .api_version(conn.api_version.clone())
            .scheme(conn.scheme.clone())
            .request_timeout(conn.request_timeout())
            .sweep_interval(conn.sweep_interval())
            .ping_interval(conn.ping_interval())
            .event_capacity(conn.event_capacity);
        builder.domains = StaticDomains::from(&config.domains);
        if conn.keepalive_interval_ms == 0 {
            builder = builder.disable_keepalive();
        } else {
            builder = builder.keepalive_interval(conn.keepalive_interval());
        }

        if let Some(token) = config.account.token() {
            builder = builder.token(token);
        } else if let (Some(user), Some(password)) =
            (config.account.username.clone(), config.account.password())
        {
            builder = builder.credentials(user, password);
        }
        if conn.auto_reconnect {
            builder = builder.reconnect_backoff(ReconnectBackoff::default());
        }
        builder
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = id.into();
        self
    }

    /// Use a pre-issued bearer token; the login exchange is skipped.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Log in with these credentials at startup (ignored if a token is set).
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    // ── Endpoint ─────────────────────────────────────────────────────

    /// Messaging API version (default `2.1`).
    pub fn api_version(mut self, v: impl Into<String>) -> Self {
        self.api_version = v.into();
        self
    }

    /// URI scheme, `wss` by default. `ws` is meant for local test servers.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Add an entry to the static domain table.
    pub fn domain(mut self, service: impl Into<String>, domain: impl Into<String>) -> Self {
        self.domains.insert(service, domain);
        self
    }

    /// Replace the static domain table with a custom resolver.
    pub fn domain_resolver(mut self, resolver: impl DomainResolver + 'static) -> Self {
        self.domain_resolver = Some(Arc::new(resolver));
        self
    }

    /// Replace the HTTP login exchange.
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    // ── Timing ───────────────────────────────────────────────────────

    /// Default per-request deadline (default 10s).
    pub fn request_timeout(mut self, d: Duration) -> Self {
        self.request_timeout = d;
        self
    }

    /// Period of the timeout sweep (default 1s).
    pub fn sweep_interval(mut self, d: Duration) -> Self {
        self.sweep_interval = d;
        self
    }

    /// Period of the `.GetClock` keep-alive probe (default 60s).
    pub fn keepalive_interval(mut self, d: Duration) -> Self {
        self.keepalive_interval = Some(d);
        self
    }

    pub fn disable_keepalive(mut self) -> Self {
        self.keepalive_interval = None;
        self
    }

    /// Period of WebSocket pings (default 60s).
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }

    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    /// Broadcast buffer per subscriber (default 1024). Slow subscribers
    /// past this lag and skip events.
    pub fn event_capacity(mut self, n: usize) -> Self {
        self.event_capacity = n;
        self
    }

    /// Reconnect automatically after an unexpected close.
    pub fn reconnect_backoff(mut self, policy: ReconnectBackoff) -> Self {
        self.reconnect_backoff = Some(policy);
        self
    }

    /// Check preconditions, then spawn the connection worker.
    pub fn build(self) -> Result<AgentClient, SdkError> {
        let settings = self.into_settings()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SdkError::Config("AgentClient must be built inside a Tokio runtime".into()))?;
        Ok(AgentClient::spawn(&runtime, settings))
    }

    fn into_settings(self) -> Result<WorkerSettings, SdkError> {
        if self.account_id.trim().is_empty() {
            return Err(SdkError::Config("account_id is required".into()));
        }
        let token = self.token.filter(|t| !t.trim().is_empty());
        let credentials = self
            .credentials
            .filter(|c| !c.username.is_empty() && !c.password.is_empty());
        if token.is_none() && credentials.is_none() {
            return Err(SdkError::Config(
                "either a token or username + password is required".into(),
            ));
        }
        for (name, d) in [
            ("request_timeout", Some(self.request_timeout)),
            ("sweep_interval", Some(self.sweep_interval)),
            ("ping_interval", Some(self.ping_interval)),
            ("keepalive_interval", self.keepalive_interval),
        ] {
            if d == Some(Duration::ZERO) {
                return Err(SdkError::Config(format!("{name} must be non-zero")));
            }
        }

        let domain_resolver: Arc<dyn DomainResolver> = match self.domain_resolver {
            Some(resolver) => resolver,
            None => Arc::new(self.domains),
        };
        let authenticator: Arc<dyn Authenticator> = match self.authenticator {
            Some(auth) => auth,
            None => Arc::new(HttpAuthenticator::new(self.connect_timeout)?),
        };

        Ok(WorkerSettings {
            account_id: self.account_id,
            token,
            credentials,
            api_version: self.api_version,
            scheme: self.scheme,
            request_timeout: self.request_timeout,
            sweep_interval: self.sweep_interval,
            keepalive_interval: self.keepalive_interval,
            ping_interval: self.ping_interval,
            connect_timeout: self.connect_timeout,
            event_capacity: self.event_capacity,
            reconnect_backoff: self.reconnect_backoff,
            domain_resolver,
            authenticator,
        })
    }
}

impl Default for AgentClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
