use std::time::Duration;

use al_domain::config::Config;

#[test]
fn default_connection_values() {
    let config = Config::default();
    assert_eq!(config.connection.api_version, "2.1");
    assert_eq!(config.connection.scheme, "wss");
    assert_eq!(config.connection.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.connection.sweep_interval(), Duration::from_secs(1));
    assert_eq!(config.connection.keepalive_interval(), Duration::from_secs(60));
    assert!(!config.connection.auto_reconnect);
}

#[test]
fn default_secret_env_names() {
    let config = Config::default();
    assert_eq!(config.account.token_env, "AL_TOKEN");
    assert_eq!(config.account.password_env, "AL_PASSWORD");
    assert!(config.account.username.is_none());
}

#[test]
fn partial_connection_section_keeps_other_defaults() {
    let toml_str = r#"
[connection]
request_timeout_ms = 2500
scheme = "ws"
"#;
    let config = Config::from_toml(toml_str).unwrap();
    assert_eq!(config.connection.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.connection.scheme, "ws");
    assert_eq!(config.connection.api_version, "2.1");
    assert_eq!(config.connection.event_capacity, 1024);
}

#[test]
fn domains_table_preserves_service_casing() {
    let toml_str = r#"
[account]
account_id = "12345678"
username = "bot"

[domains]
asyncMessagingEnt = "va.msg.example.net"
agentVep = "va.agentvep.example.net"
"#;
    let config = Config::from_toml(toml_str).unwrap();
    assert_eq!(config.account.account_id, "12345678");
    assert_eq!(config.account.username.as_deref(), Some("bot"));
    assert_eq!(
        config.domains.get("asyncMessagingEnt").map(String::as_str),
        Some("va.msg.example.net")
    );
    assert_eq!(config.domains.len(), 2);
}

#[test]
fn token_env_is_read_and_blank_values_ignored() {
    let toml_str = r#"
[account]
account_id = "acct"
token_env = "AL_TEST_TOKEN_READ"
password_env = "AL_TEST_PASSWORD_BLANK"
"#;
    let config = Config::from_toml(toml_str).unwrap();
    std::env::set_var("AL_TEST_TOKEN_READ", "tok");
    std::env::set_var("AL_TEST_PASSWORD_BLANK", "   ");
    assert_eq!(config.account.token().as_deref(), Some("tok"));
    assert!(config.account.password().is_none());
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = Config::from_toml("[connection\nscheme = 1").unwrap_err();
    assert!(err.to_string().starts_with("config:"));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = Config::load("/definitely/not/here/agentlink.toml").unwrap();
    assert_eq!(config.connection.api_version, "2.1");
}
