use sx_domain::config::{Config, Limit, ReissuePolicy, StorageBackend};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8000);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn admin_token_env_default() {
    let config = Config::default();
    assert_eq!(config.admin.token_env, "SEOX_ADMIN_TOKEN");
}

#[test]
fn default_storage_is_file_backed() {
    let config = Config::default();
    assert_eq!(config.storage.backend, StorageBackend::File);
    assert_eq!(config.storage.path, std::path::PathBuf::from("./data"));
}

#[test]
fn full_config_file_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080

[llm]
model = "gpt-4o"
max_tokens = 250

[plans]
basic = 1000
pro = 10000
agency = -1

[accounts]
reissue_policy = "when_exhausted"
min_interval_ms = 2000
key_ttl_days = 30
register_plan = "basic"

[storage]
backend = "memory"

[admin]
token_env = "MY_ADMIN_TOKEN"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.max_tokens, 250);
    assert_eq!(config.plans.limit_for("agency"), Some(Limit::Unlimited));
    assert_eq!(config.accounts.reissue_policy, ReissuePolicy::WhenExhausted);
    assert_eq!(config.accounts.min_interval_ms, Some(2000));
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.admin.token_env, "MY_ADMIN_TOKEN");
    assert!(config.validate().is_empty());
}

#[test]
fn negative_limit_other_than_sentinel_is_rejected() {
    let toml_str = r#"
[plans]
broken = -7
"#;
    assert!(toml::from_str::<Config>(toml_str).is_err());
}
