// Configuration loading through an injected lookup

use adt_client::config::Config;
use std::collections::HashMap;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

const REQUIRED: [(&str, &str); 4] = [
    ("ADT_HOST", "vhcalnplci"),
    ("ADT_CLIENT", "001"),
    ("ADT_USERNAME", "DEVELOPER"),
    ("ADT_PASSWORD", "Down1oad"),
];

#[test]
fn test_config_minimal_environment() {
    let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert_eq!(config.base_endpoint(), "https://vhcalnplci:443/sap/bc/adt");
    assert_eq!(config.client, "001");
    assert_eq!(config.log_format, "text");
    assert_eq!(config.retry_policy().max_retries, 2);
}

#[test]
fn test_config_lab_system() {
    let mut vars = REQUIRED.to_vec();
    vars.extend([
        ("ADT_USE_TLS", "false"),
        ("ADT_PORT", "50000"),
        ("ADT_RETRY_BACKOFF_MS", "50"),
    ]);
    let config = Config::from_lookup(lookup_from(&vars)).unwrap();
    assert_eq!(config.base_endpoint(), "http://vhcalnplci:50000/sap/bc/adt");
    assert_eq!(
        config.retry_policy().initial_backoff,
        std::time::Duration::from_millis(50)
    );
}

#[test]
fn test_config_error_names_the_variable() {
    let err = Config::from_lookup(lookup_from(&REQUIRED[..3])).unwrap_err();
    assert_eq!(err.kind(), adt_client::ErrorKind::Configuration);
    assert!(err.to_string().contains("ADT_PASSWORD"));
}

#[test]
fn test_config_never_prints_password() {
    let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert_eq!(config.password(), "Down1oad");
    assert!(!format!("{:?}", config).contains("Down1oad"));
}
