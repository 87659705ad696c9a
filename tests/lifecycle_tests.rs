//! End-to-end lifecycle flows over in-memory collaborators.
//!
//! Descriptors are resolved from real files so identity, planning and the
//! controller are exercised together.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use modelctl::application::identity;
use modelctl::application::lifecycle::CONFIG_TARGET;
use modelctl::domain::{InstanceKind, ListedState, SyncOutcome};
use modelctl::error::{Error, StartStage};
use modelctl::testkit::harness::Harness;
use modelctl::testkit::probe::ScriptedProbe;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn yaml_config_starts_single_instance_with_config_mount() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "Llama 3.1 8B.yaml", "served-model-name: [llama-8b, alias]\n");
    let descriptor = identity::resolve(&path).unwrap();
    assert_eq!(descriptor.id.as_str(), "Llama_3_1_8B");

    let h = Harness::new();
    let report = h.lifecycle.start(&descriptor).await.unwrap();

    assert_eq!(report.kind, InstanceKind::Single);
    assert_eq!(report.model_name, "llama-8b");
    let spec = h.runtime.spec("Llama_3_1_8B").unwrap();
    let config_mount = spec
        .mounts
        .iter()
        .find(|m| m.target == CONFIG_TARGET)
        .unwrap();
    assert!(config_mount.read_only);
    assert!(config_mount.source.ends_with("Llama 3.1 8B.yaml"));
}

#[tokio::test]
async fn json_config_with_repository_is_composite() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("repo")).unwrap();
    let path = write(
        dir.path(),
        "sd.json",
        r#"{"model": "sdxl", "model_repository": "repo", "provider": "custom"}"#,
    );
    let descriptor = identity::resolve(&path).unwrap();

    let h = Harness::new();
    let report = h.lifecycle.start(&descriptor).await.unwrap();

    assert_eq!(report.kind, InstanceKind::Composite);
    let entries = h.registry.entries_named("sdxl");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].provider, "custom");
    assert_eq!(h.runtime.running(), vec!["sd__adapter", "sd__server"]);
}

#[tokio::test]
async fn composite_waits_for_every_role() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "sd.yaml", "model: sdxl\nmodel-repository: /srv/sd\n");
    let descriptor = identity::resolve(&path).unwrap();

    let h = Harness::builder()
        .probe(ScriptedProbe::ready_after_any(3))
        .build();
    let report = h.lifecycle.start(&descriptor).await.unwrap();

    // Checks are probed in order: three rounds until the server is ready,
    // then two more until the adapter is.
    assert_eq!(report.attempts, 5);
    let urls = h.probe.urls();
    assert!(urls.iter().any(|u| u.ends_with("/v2/health/ready")), "{urls:?}");
    assert!(urls.iter().any(|u| u.ends_with("/health")), "{urls:?}");
}

#[tokio::test]
async fn duplicate_registry_entries_are_all_patched() {
    let h = Harness::new();
    let a = h.registry.seed("demo", "http://stale:1/v1", "old", "openai");
    let b = h.registry.seed("demo", "http://stale:2/v1", "old", "openai");
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "demo.yaml", "model: demo\n")).unwrap();

    let report = h.lifecycle.start(&descriptor).await.unwrap();

    match &report.sync {
        Some(SyncOutcome::Patched(ids)) => {
            assert_eq!(ids.len(), 2);
            assert!(ids.contains(&a) && ids.contains(&b));
        }
        other => panic!("expected patch, got {other:?}"),
    }
    assert_eq!(h.registry.create_calls(), 0);
    for id in [&a, &b] {
        let entry = h.registry.entry(id).unwrap();
        assert_eq!(entry.upstream_url, report.endpoint);
        assert_eq!(entry.api_key, report.credential.expose());
    }
}

#[tokio::test]
async fn one_failed_patch_fails_start_but_keeps_instance() {
    let h = Harness::new();
    let a = h.registry.seed("demo", "http://stale:1/v1", "old", "openai");
    let b = h.registry.seed("demo", "http://stale:2/v1", "old", "openai");
    h.registry.fail_patch(&a);
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "demo.yaml", "model: demo\n")).unwrap();

    let err = h.lifecycle.start(&descriptor).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Start {
            stage: StartStage::Registry,
            ..
        }
    ));
    assert!(err.to_string().contains(&a), "{err}");
    assert_ne!(h.registry.entry(&b).unwrap().api_key, "old");
    assert_eq!(h.runtime.running(), vec!["demo".to_string()]);
}

#[tokio::test]
async fn busy_ports_are_never_assigned() {
    let h = Harness::builder().busy_ports(50000..=50997).build();
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "m.yaml", "model: m\n")).unwrap();

    let report = h.lifecycle.start(&descriptor).await.unwrap();
    assert!(report.units[0].2 >= 50998);
}

#[tokio::test]
async fn exhausted_range_fails_at_allocate() {
    let h = Harness::builder().busy_ports(50000..=50999).build();
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "m.yaml", "model: m\n")).unwrap();

    let err = h.lifecycle.start(&descriptor).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Start { stage: StartStage::Allocate, ref source, .. }
            if matches!(**source, Error::PortExhausted { .. })
    ));
    assert!(h.runtime.launched().is_empty());
}

#[tokio::test]
async fn stop_cleans_up_after_health_timeout() {
    let h = Harness::builder()
        .probe(ScriptedProbe::ready_after_any(1_000))
        .health_timeout(Duration::from_millis(40))
        .build();
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "m.yaml", "model: m\n")).unwrap();

    h.lifecycle.start(&descriptor).await.unwrap_err();
    assert_eq!(
        h.lifecycle.list().await.unwrap()[0].state,
        ListedState::Unhealthy
    );

    h.lifecycle.stop(&descriptor).await.unwrap();
    assert!(h.runtime.running().is_empty());
    assert!(h.lifecycle.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn credentials_rotate_on_restart() {
    let h = Harness::new();
    let dir = TempDir::new().unwrap();
    let descriptor = identity::resolve(&write(dir.path(), "m.yaml", "model: m\n")).unwrap();

    let first = h.lifecycle.start(&descriptor).await.unwrap();
    let second = h.lifecycle.start(&descriptor).await.unwrap();

    assert_ne!(first.credential.expose(), second.credential.expose());
    assert_eq!(
        h.registry.entries_named("m")[0].api_key,
        second.credential.expose()
    );
}
