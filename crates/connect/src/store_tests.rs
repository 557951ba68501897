// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

const STORE_YAML: &str = r#"
version: 1
connections:
  mysql:
    primary:
      host: mysql-primary.example.com
      port: 3306
      user: app_user
      password: ${TEST_STORE_MYSQL_PASSWORD}
      default: true
    secondary:
      host: mysql-secondary.example.com
      port: 3306
      user: ro_user
      password: plain-secret
  supabase:
    default:
      url: https://example.supabase.co
      service_role_key: literal-key
  duckdb:
    local:
      path: ./local.duckdb
"#;

fn store_in(dir: &Path, content: &str) -> ConnectionStore {
    fs::write(dir.join(CONNECTIONS_FILE), content).unwrap();
    ConnectionStore::from_dir(dir)
}

#[test]
fn resolves_explicit_alias() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path(), STORE_YAML);

    let record = store.resolve("mysql", Some("secondary"), None).unwrap();
    assert_eq!(record["host"], "mysql-secondary.example.com");
    assert_eq!(record["_family"], "mysql");
    assert_eq!(record["_alias"], "secondary");
}

#[test]
fn default_flag_selects_alias() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("TEST_STORE_MYSQL_PASSWORD", "hunter2");
    let store = store_in(tmp.path(), STORE_YAML);

    let record = store.resolve("mysql", None, None).unwrap();
    assert_eq!(record["_alias"], "primary");
    assert_eq!(record["password"], "hunter2");
    // The internal flag is stripped from the returned record.
    assert!(record.get("default").is_none());
    std::env::remove_var("TEST_STORE_MYSQL_PASSWORD");
}

#[test]
fn alias_named_default_is_fallback() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path(), STORE_YAML);

    let record = store.resolve("supabase", None, None).unwrap();
    assert_eq!(record["_alias"], "default");
    assert_eq!(record["url"], "https://example.supabase.co");
}

#[test]
fn no_default_lists_available_aliases() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path(), STORE_YAML);

    let err = store.resolve("duckdb", None, None).unwrap_err();
    match err {
        ConnectError::NoDefaultConnection { family, available } => {
            assert_eq!(family, "duckdb");
            assert_eq!(available, vec!["local"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn multiple_defaults_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(
        tmp.path(),
        r#"
connections:
  mysql:
    a: {host: a, default: true}
    b: {host: b, default: true}
"#,
    );
    let err = store.resolve("mysql", None, None).unwrap_err();
    assert!(matches!(err, ConnectError::MultipleDefaults { family } if family == "mysql"));
}

#[test]
fn unknown_family_and_alias() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path(), STORE_YAML);

    let err = store.resolve("oracle", None, None).unwrap_err();
    assert!(matches!(err, ConnectError::UnknownFamily { family, .. } if family == "oracle"));

    let err = store.resolve("mysql", Some("tertiary"), None).unwrap_err();
    match err {
        ConnectError::UnknownAlias {
            family,
            alias,
            available,
        } => {
            assert_eq!(family, "mysql");
            assert_eq!(alias, "tertiary");
            assert_eq!(available, vec!["primary", "secondary"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_a_typed_error() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ConnectionStore::from_dir(tmp.path());
    let err = store.resolve("mysql", None, None).unwrap_err();
    assert!(matches!(err, ConnectError::MissingConnectionsFile { .. }));
}

#[test]
fn env_substitution_walks_lists_and_maps() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("TEST_STORE_NESTED_TOKEN", "tok-1");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  api:
    main:
      auth:
        token: ${TEST_STORE_NESTED_TOKEN}
      hosts:
        - one.${TEST_STORE_NESTED_TOKEN}.example
        - two.example
"#,
    );

    let record = store.resolve("api", Some("main"), None).unwrap();
    assert_eq!(record["auth"]["token"], "tok-1");
    assert_eq!(record["hosts"], json!(["one.tok-1.example", "two.example"]));
    std::env::remove_var("TEST_STORE_NESTED_TOKEN");
}

#[test]
fn missing_env_var_names_everything() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::remove_var("TEST_STORE_UNSET_PASSWORD");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  mysql:
    primary:
      password: ${TEST_STORE_UNSET_PASSWORD}
"#,
    );

    let err = store.resolve("mysql", Some("primary"), None).unwrap_err();
    match &err {
        ConnectError::MissingEnvVar {
            family,
            alias,
            field,
            var,
        } => {
            assert_eq!(family, "mysql");
            assert_eq!(alias, "primary");
            assert_eq!(field, "password");
            assert_eq!(var, "TEST_STORE_UNSET_PASSWORD");
        }
        other => panic!("unexpected error: {other}"),
    }
    let message = err.to_string();
    assert!(message.contains("TEST_STORE_UNSET_PASSWORD"));
    assert!(message.contains("mysql"));
    assert!(message.contains("primary"));
}

#[test]
fn empty_env_var_is_treated_as_missing() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("TEST_STORE_EMPTY_PASSWORD", "");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  mysql:
    primary:
      password: ${TEST_STORE_EMPTY_PASSWORD}
"#,
    );

    let err = store.resolve("mysql", Some("primary"), None).unwrap_err();
    assert!(matches!(err, ConnectError::MissingEnvVar { .. }));
    std::env::remove_var("TEST_STORE_EMPTY_PASSWORD");
}

#[test]
fn nested_field_path_appears_in_diagnostic() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::remove_var("TEST_STORE_NESTED_UNSET");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  api:
    main:
      auth:
        token: ${TEST_STORE_NESTED_UNSET}
"#,
    );

    let err = store.resolve("api", Some("main"), None).unwrap_err();
    assert!(matches!(
        err,
        ConnectError::MissingEnvVar { field, .. } if field == "auth.token"
    ));
}

#[test]
fn cache_rereads_when_file_changes() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(
        tmp.path(),
        "connections:\n  mysql:\n    primary: {host: one, default: true}\n",
    );
    let record = store.resolve("mysql", None, None).unwrap();
    assert_eq!(record["host"], "one");

    // Rewrite with a different host and a strictly newer mtime.
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(
        tmp.path().join(CONNECTIONS_FILE),
        "connections:\n  mysql:\n    primary: {host: two, default: true}\n",
    )
    .unwrap();

    let record = store.resolve("mysql", None, None).unwrap();
    assert_eq!(record["host"], "two");
}

#[test]
fn resolve_emits_session_events_without_values() {
    let tmp = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    std::env::set_var("TEST_STORE_EVENT_PASSWORD", "supersecret");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  mysql:
    primary:
      password: ${TEST_STORE_EVENT_PASSWORD}
      default: true
"#,
    );

    let ctx = osiris_session::SessionContext::create(
        logs.path(),
        "run",
        osiris_session::SessionConfig::default(),
    )
    .unwrap();
    {
        let _guard = osiris_session::set_current(ctx.clone());
        store.resolve("mysql", None, Some("extract")).unwrap();
    }

    let events = fs::read_to_string(ctx.dir().join("events.jsonl")).unwrap();
    assert!(events.contains("connection_resolve_start"));
    assert!(events.contains("connection_resolve_complete"));
    assert!(events.contains("\"ok\":true"));
    assert!(events.contains("\"step_id\":\"extract\""));
    assert!(!events.contains("supersecret"));
    std::env::remove_var("TEST_STORE_EVENT_PASSWORD");
}

#[test]
fn failed_resolve_event_names_env_var() {
    let tmp = tempfile::tempdir().unwrap();
    let logs = tempfile::tempdir().unwrap();
    std::env::remove_var("TEST_STORE_EVENT_UNSET");
    let store = store_in(
        tmp.path(),
        r#"
connections:
  mysql:
    primary:
      password: ${TEST_STORE_EVENT_UNSET}
      default: true
"#,
    );

    let ctx = osiris_session::SessionContext::create(
        logs.path(),
        "run",
        osiris_session::SessionConfig::default(),
    )
    .unwrap();
    {
        let _guard = osiris_session::set_current(ctx.clone());
        assert!(store.resolve("mysql", None, Some("extract")).is_err());
    }

    let events = fs::read_to_string(ctx.dir().join("events.jsonl")).unwrap();
    assert!(events.contains("\"ok\":false"));
    assert!(events.contains("\"env_var\":\"TEST_STORE_EVENT_UNSET\""));
}
