//! Startup collaborators: service-domain resolution and the login exchange.
//!
//! Both run once before the first connect. Their failures are not retried;
//! the worker reports them as [`SdkEvent::Error`](crate::SdkEvent::Error)
//! and leaves the client unconnected.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::SdkError;

/// Service whose domain hosts the messaging socket.
pub const MESSAGING_SERVICE: &str = "asyncMessagingEnt";
/// Service whose domain hosts the login endpoint.
pub const LOGIN_SERVICE: &str = "agentVep";
/// Version parameter of the login endpoint.
pub const LOGIN_API_VERSION: &str = "1.3";

/// Maps an account id to its service-name → domain table.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve(&self, account_id: &str) -> Result<HashMap<String, String>, SdkError>;
}

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(
        &self,
        domain: &str,
        account_id: &str,
        credentials: &Credentials,
    ) -> Result<String, SdkError>;
}

/// Username + password pair. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Static domains
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A [`DomainResolver`] over a fixed table, typically the `[domains]`
/// section of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticDomains {
    domains: HashMap<String, String>,
}

impl StaticDomains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: impl Into<String>, domain: impl Into<String>) -> Self {
        self.insert(service, domain);
        self
    }

    pub fn insert(&mut self, service: impl Into<String>, domain: impl Into<String>) {
        self.domains.insert(service.into(), domain.into());
    }

    pub fn get(&self, service: &str) -> Option<&str> {
        self.domains.get(service).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl From<&BTreeMap<String, String>> for StaticDomains {
    fn from(table: &BTreeMap<String, String>) -> Self {
        Self {
            domains: table.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[async_trait]
impl DomainResolver for StaticDomains {
    async fn resolve(&self, account_id: &str) -> Result<HashMap<String, String>, SdkError> {
        if self.domains.is_empty() {
            return Err(SdkError::DomainResolution(format!(
                "no domains configured for account {account_id}"
            )));
        }
        Ok(self.domains.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP login
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct LoginResponse {
    bearer: String,
}

/// Login over HTTPS: `POST https://{domain}/api/account/{id}/login?v=1.3`.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    http: Client,
    scheme: String,
}

impl HttpAuthenticator {
    pub fn new(timeout: Duration) -> Result<Self, SdkError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            scheme: "https".into(),
        })
    }

    /// Use plain HTTP (local test servers).
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn login_url(&self, domain: &str, account_id: &str) -> String {
        format!(
            "{}://{domain}/api/account/{account_id}/login?v={LOGIN_API_VERSION}",
            self.scheme
        )
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn login(
        &self,
        domain: &str,
        account_id: &str,
        credentials: &Credentials,
    ) -> Result<String, SdkError> {
        let url = self.login_url(domain, account_id);
        tracing::debug!(url = %url, username = %credentials.username, "logging in");

        let resp = self
            .http
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(|e| SdkError::Login(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(SdkError::Login(format!("HTTP {status}: {body}")));
        }

        let parsed: LoginResponse = resp
            .json()
            .await
            .map_err(|e| SdkError::Login(format!("unexpected login response: {e}")))?;
        if parsed.bearer.is_empty() {
            return Err(SdkError::Login("login response carried an empty bearer".into()));
        }
        Ok(parsed.bearer)
    }
}
