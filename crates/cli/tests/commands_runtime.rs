use std::env;
use std::sync::{Mutex, OnceLock};

use casenote_cli::commands::{ingest, migrate, reset};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_with_non_sqlite_url() {
    with_env(&[("CASENOTE_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_reports_connectivity_failure_for_unreachable_database() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite:///no-such-dir/casenote.db")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4, "expected connectivity failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn ingest_loads_bundled_samples() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = ingest::run(None);
        assert_eq!(result.exit_code, 0, "expected successful ingest run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ingest");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("bundled samples"));
        assert!(message.contains("3 created, 0 updated"));
    });
}

#[test]
fn ingest_reads_a_wrapped_threads_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("threads.json");
    std::fs::write(
        &path,
        r#"{"threads": [{
            "thread_id": "CE-900001-001",
            "subject": "Where is my order?",
            "topic": "late_delivery",
            "initiated_by": "customer",
            "order_id": "ORD-71547",
            "product": "Walnut Desk Organizer",
            "messages": []
        }]}"#,
    )
    .expect("write threads file");

    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = ingest::run(Some(path.as_path()));
        assert_eq!(result.exit_code, 0, "expected successful file ingest");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("1 created, 0 updated"));
    });
}

#[test]
fn ingest_reports_missing_threads_file() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = ingest::run(Some(std::path::Path::new("does-not-exist.json")));
        assert_eq!(result.exit_code, 2, "expected threads file failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "threads_file");
    });
}

#[test]
fn reset_requires_a_scope_flag() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = reset::run(None, false);
        assert_eq!(result.exit_code, 2, "expected usage failure code");
        assert_eq!(parse_payload(&result.output)["error_class"], "usage");

        let result = reset::run(Some("CE-405467-683"), true);
        assert_eq!(result.exit_code, 2, "expected usage failure code");
        assert_eq!(parse_payload(&result.output)["error_class"], "usage");
    });
}

#[test]
fn reset_all_truncates_export_logs() {
    let dir = TempDir::new().expect("tempdir");
    let output_dir = dir.path().to_string_lossy().to_string();

    with_env(
        &[
            ("CASENOTE_DATABASE_URL", "sqlite::memory:"),
            ("CASENOTE_EXPORT_OUTPUT_DIR", output_dir.as_str()),
        ],
        || {
            let result = reset::run(None, true);
            assert_eq!(result.exit_code, 0, "expected successful full reset");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains("export logs truncated"));
        },
    );

    assert!(dir.path().join("approved_summaries.jsonl").exists());
    assert!(dir.path().join("crm_notes.jsonl").exists());
}

#[test]
fn reset_single_unknown_thread_reports_not_found() {
    with_env(&[("CASENOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = reset::run(Some("CE-000000-000"), false);
        assert_eq!(result.exit_code, 6, "expected not-found failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CASENOTE_DATABASE_URL",
        "CASENOTE_DATABASE_MAX_CONNECTIONS",
        "CASENOTE_DATABASE_TIMEOUT_SECS",
        "CASENOTE_LLM_API_KEY",
        "CASENOTE_LLM_BASE_URL",
        "CASENOTE_LLM_MODEL",
        "CASENOTE_LLM_TIMEOUT_SECS",
        "CASENOTE_SERVER_BIND_ADDRESS",
        "CASENOTE_SERVER_PORT",
        "CASENOTE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CASENOTE_EXPORT_OUTPUT_DIR",
        "CASENOTE_CRM_ORDERS_PATH",
        "CASENOTE_CRM_CUSTOMERS_PATH",
        "CASENOTE_LOGGING_LEVEL",
        "CASENOTE_LOGGING_FORMAT",
        "CASENOTE_LOG_LEVEL",
        "CASENOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
