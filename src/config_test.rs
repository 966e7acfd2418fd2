use super::*;
use crate::guard::RouteClass;

fn config(vars: &[(&str, &str)]) -> Result<AuthConfig, ConfigError> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    AuthConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn defaults_to_memory_without_api_key() {
    let cfg = config(&[]).unwrap();
    assert_eq!(cfg.provider, ProviderKind::Memory);
    assert!(cfg.firebase.is_none());
    assert_eq!(cfg.routes, RouteTable::default());
}

#[test]
fn api_key_selects_firebase_with_defaults() {
    let cfg = config(&[("FIREBASE_API_KEY", "key-123")]).unwrap();
    assert_eq!(cfg.provider, ProviderKind::Firebase);
    assert_eq!(cfg.firebase, Some(FirebaseConfig::new("key-123")));
}

#[test]
fn firebase_overrides_are_parsed() {
    let cfg = config(&[
        ("AUTH_PROVIDER", "firebase"),
        ("FIREBASE_API_KEY", "key-123"),
        ("FIREBASE_AUTH_BASE_URL", "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/"),
        ("AUTH_REQUEST_TIMEOUT_SECS", "5"),
        ("AUTH_CONNECT_TIMEOUT_SECS", "2"),
        ("AUTH_SESSION_FILE", "/tmp/lumigram-session.json"),
    ])
    .unwrap();
    let firebase = cfg.firebase.unwrap();
    assert_eq!(firebase.base_url, "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1");
    assert_eq!(firebase.timeouts, AuthTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(firebase.session_file, Some(PathBuf::from("/tmp/lumigram-session.json")));
}

#[test]
fn explicit_memory_ignores_api_key() {
    let cfg = config(&[("AUTH_PROVIDER", "memory"), ("FIREBASE_API_KEY", "key-123")]).unwrap();
    assert_eq!(cfg.provider, ProviderKind::Memory);
    assert!(cfg.firebase.is_none());
}

#[test]
fn firebase_without_api_key_errors() {
    let err = config(&[("AUTH_PROVIDER", "firebase")]).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { ref var } if var == "FIREBASE_API_KEY"));
}

#[test]
fn blank_api_key_counts_as_unset() {
    let cfg = config(&[("FIREBASE_API_KEY", "   ")]).unwrap();
    assert_eq!(cfg.provider, ProviderKind::Memory);
}

#[test]
fn unknown_provider_errors() {
    let err = config(&[("AUTH_PROVIDER", "cognito")]).unwrap_err().to_string();
    assert!(err.contains("unknown AUTH_PROVIDER"));
}

#[test]
fn bad_timeout_errors() {
    let err = config(&[("FIREBASE_API_KEY", "k"), ("AUTH_REQUEST_TIMEOUT_SECS", "soon")]).unwrap_err().to_string();
    assert!(err.contains("AUTH_REQUEST_TIMEOUT_SECS"));
}

#[test]
fn custom_routes_are_parsed() {
    let cfg = config(&[
        ("AUTH_LOGIN_ROUTE", "/signin"),
        ("AUTH_LANDING_ROUTE", "/feed"),
        ("AUTH_PUBLIC_ROUTES", "/signup, /forgot ,"),
    ])
    .unwrap();
    assert_eq!(cfg.routes.login(), "/signin");
    assert_eq!(cfg.routes.landing(), "/feed");
    assert_eq!(cfg.routes.classify("/forgot"), RouteClass::Public);
    assert_eq!(cfg.routes.classify("/signin"), RouteClass::Public);
    assert_eq!(cfg.routes.classify("/login"), RouteClass::Protected);
}

#[test]
fn public_landing_route_errors() {
    let err = config(&[("AUTH_LANDING_ROUTE", "/register")]).unwrap_err();
    assert!(matches!(err, ConfigError::Routes(RouteTableError::PublicLanding(_))));
}
