use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Account identity and credential sources.
///
/// Secrets never live in the file: the config only names the environment
/// variables that hold them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: String,
    /// Environment variable holding a pre-issued bearer token.
    /// When set and non-empty, the login exchange is skipped.
    #[serde(default = "d_token_env")]
    pub token_env: String,
    /// Login user name, used only when no bearer token is available.
    #[serde(default)]
    pub username: Option<String>,
    /// Environment variable holding the login password.
    #[serde(default = "d_password_env")]
    pub password_env: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            token_env: d_token_env(),
            username: None,
            password_env: d_password_env(),
        }
    }
}

impl AccountConfig {
    /// Bearer token from `token_env`, if set and non-empty.
    pub fn token(&self) -> Option<String> {
        read_secret(&self.token_env)
    }

    /// Password from `password_env`, if set and non-empty.
    pub fn password(&self) -> Option<String> {
        read_secret(&self.password_env)
    }
}

fn read_secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

// ── serde default helpers ───────────────────────────────────────────

fn d_token_env() -> String {
    "AL_TOKEN".into()
}
fn d_password_env() -> String {
    "AL_PASSWORD".into()
}
