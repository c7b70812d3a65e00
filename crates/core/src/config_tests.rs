// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kind::Kind;
use std::io::Write;
use yare::parameterized;

const FLEET: &str = r#"
[defaults]
build_wait_timeout = "5m"
connect_timeout = "90s"
health_interval = "15s"

[[worker]]
name = "linux-large"
kind = "{{ arch }}-large"
build_wait_timeout = "0s"
min_uptime = "10m"

[worker.commands]
start = "cloudctl up linux-large"
stop = "cloudctl down linux-large"
health = "cloudctl ping linux-large"

[[worker]]
name = "mac"
kind = "m2"
build_wait_timeout = "never"
"#;

#[test]
fn parses_defaults_and_workers() {
    let config = FleetConfig::parse(FLEET).unwrap();
    assert_eq!(
        config.defaults.build_wait_timeout,
        IdleTimeout::After(Duration::from_secs(300))
    );
    assert_eq!(config.defaults.connect_timeout, Duration::from_secs(90));
    assert_eq!(config.defaults.health_interval, Duration::from_secs(15));
    assert_eq!(config.workers.len(), 2);
}

#[test]
fn worker_configs_apply_defaults_and_overrides() {
    let workers = FleetConfig::parse(FLEET).unwrap().worker_configs().unwrap();

    let linux = &workers[0];
    assert_eq!(linux.name, "linux-large");
    assert_eq!(linux.kind, KindExpr::Template("{{ arch }}-large".to_string()));
    assert_eq!(linux.build_wait_timeout, IdleTimeout::After(Duration::ZERO));
    assert_eq!(linux.connect_timeout, Duration::from_secs(90));
    assert_eq!(linux.min_uptime, Some(Duration::from_secs(600)));
    assert_eq!(
        linux.commands.start.as_deref(),
        Some("cloudctl up linux-large")
    );
    assert!(linux.commands.stop_fast.is_none());

    let mac = &workers[1];
    assert_eq!(mac.kind, KindExpr::Static(Kind::new("m2")));
    assert_eq!(mac.build_wait_timeout, IdleTimeout::Never);
    assert_eq!(mac.min_uptime, None);
}

#[test]
fn empty_file_uses_builtin_defaults() {
    let config = FleetConfig::parse("").unwrap();
    assert!(config.workers.is_empty());
    assert_eq!(
        config.defaults.build_wait_timeout,
        IdleTimeout::After(Duration::from_secs(600))
    );
}

#[test]
fn duplicate_worker_names_rejected() {
    let config = FleetConfig::parse(
        r#"
[[worker]]
name = "w"
[[worker]]
name = "w"
"#,
    )
    .unwrap();
    let err = config.worker_configs().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateWorker(ref n) if n == "w"));
}

#[test]
fn empty_worker_name_rejected() {
    let config = FleetConfig::parse("[[worker]]\nname = \"  \"\n").unwrap();
    assert!(matches!(
        config.worker_configs().unwrap_err(),
        ConfigError::EmptyName
    ));
}

#[test]
fn invalid_duration_is_parse_error() {
    let err = FleetConfig::parse("[defaults]\nbuild_wait_timeout = \"soon\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[parameterized(
    never = { "never", IdleTimeout::Never },
    zero = { "0s", IdleTimeout::After(Duration::ZERO) },
    minutes = { "10m", IdleTimeout::After(Duration::from_secs(600)) },
    compound = { "1h 30m", IdleTimeout::After(Duration::from_secs(5400)) },
)]
fn idle_timeout_from_str(raw: &str, expected: IdleTimeout) {
    assert_eq!(raw.parse::<IdleTimeout>().unwrap(), expected);
}

#[test]
fn idle_timeout_display_roundtrips() {
    for timeout in [IdleTimeout::Never, IdleTimeout::After(Duration::from_secs(90))] {
        assert_eq!(timeout.to_string().parse::<IdleTimeout>().unwrap(), timeout);
    }
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FLEET.as_bytes()).unwrap();

    let config = FleetConfig::load(file.path()).unwrap();
    assert_eq!(config.workers[1].name, "mac");
}

#[test]
fn load_missing_file_reports_path() {
    let err = FleetConfig::load(Path::new("/nonexistent/fleet.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/fleet.toml"));
}

#[test]
fn builder_sets_fields() {
    let config = WorkerConfig::new("w")
        .with_kind(KindExpr::parse("a"))
        .with_build_wait_timeout(IdleTimeout::Never)
        .with_connect_timeout(Duration::from_secs(5))
        .with_min_uptime(Duration::from_secs(60));
    assert_eq!(config.kind, KindExpr::Static(Kind::new("a")));
    assert_eq!(config.build_wait_timeout.duration(), None);
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.min_uptime, Some(Duration::from_secs(60)));
}
