use cr_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config
        .server
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
    assert!(config
        .server
        .allowed_origins
        .contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn cors_config_parses_custom_origins() {
    let toml_str = r#"
[server]
allowed_origins = ["https://myapp.com", "http://localhost:3000"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.allowed_origins.len(), 2);
}

#[test]
fn secret_env_var_names_default() {
    let config = Config::default();
    assert_eq!(config.auth.client_secret_env, "CHATRELAY_CLIENT_SECRET");
    assert_eq!(config.provider.api_key_env, "CHATRELAY_PROVIDER_API_KEY");
}

#[test]
fn companion_url_absent_by_default() {
    assert!(Config::default().chat.companion_url.is_none());
}
