//! Create, destroy and reload against a simulated host.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use common::Sandbox;
use thinlxc_common::error::ThinLxcError;
use thinlxc_common::types::{ContainerName, ContainerState, PortMapping};
use thinlxc_runtime::container::ContainerSpec;

fn name(s: &str) -> ContainerName {
    ContainerName::new(s).unwrap()
}

fn forwarded_spec(n: &str, last_octet: u8, host: u16, container: u16) -> ContainerSpec {
    let mut spec = ContainerSpec::new(name(n));
    spec.address = Some(Ipv4Addr::new(10, 0, 3, last_octet));
    spec.ports = PortMapping { host, container };
    spec
}

#[test]
fn create_then_destroy_leaves_nothing_behind() {
    let sb = Sandbox::new();
    let c = sb
        .orchestrator
        .create(forwarded_spec("c1", 245, 9999, 8888))
        .expect("create");

    assert!(sb.orchestrator.is_mounted(&c));
    assert!(sb.orchestrator.rule_exists(&c));
    let config = std::fs::read_to_string(&c.config_path).expect("config");
    assert!(config.contains("10.0.3.245/24"));

    sb.orchestrator.destroy(&c.name).expect("destroy");
    assert!(!c.path.exists());
    assert!(!sb.orchestrator.rule_exists(&c));
    assert_eq!(sb.host.rule_count(), 0);
}

#[test]
fn create_persists_metadata_record() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c4"))).expect("create");
    let loaded = sb.orchestrator.store().load(&c.name).expect("load");
    assert_eq!(loaded, c);
    assert_eq!(loaded.hostname, "c4");
    assert!(sb.host.calls("iptables").is_empty());
}

#[test]
fn duplicate_name_is_rejected() {
    let sb = Sandbox::new();
    let _ = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    let err = sb.orchestrator.create(ContainerSpec::new(name("c1"))).unwrap_err();
    assert!(matches!(err, ThinLxcError::Validation { .. }));
}

#[test]
fn missing_base_image_fails_before_touching_disk() {
    let sb = Sandbox::new();
    let mut spec = ContainerSpec::new(name("c1"));
    spec.base_image = Some(sb.dir.path().join("nope"));
    let err = sb.orchestrator.create(spec).unwrap_err();
    assert!(matches!(err, ThinLxcError::NotFound { kind: "base image", .. }));
    assert!(!sb.containers_root().join("c1").exists());
}

#[test]
fn mount_failure_aborts_create_without_rollback() {
    let sb = Sandbox::new();
    let root = sb.containers_root().join("c1");
    sb.host.fail_mount_at(&root.join("c1"));
    let err = sb.orchestrator.create(ContainerSpec::new(name("c1"))).unwrap_err();
    assert!(matches!(err, ThinLxcError::ExternalTool { .. }));
    assert!(root.join(".metadata.json").exists());

    sb.orchestrator.destroy(&name("c1")).expect("destroy converges");
    assert!(!root.exists());
}

#[test]
fn bind_mount_destinations_are_created() {
    let sb = Sandbox::new();
    let data = sb.dir.path().join("data");
    let conf = sb.dir.path().join("app.conf");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(&conf, "key=value").unwrap();

    let mut spec = ContainerSpec::new(name("c3"));
    spec.bind_mounts = BTreeMap::from([
        (data.clone(), PathBuf::from("/mnt/data")),
        (conf.clone(), PathBuf::from("/etc/app.conf")),
    ]);
    let c = sb.orchestrator.create(spec).expect("create");

    assert!(c.rootfs.join("mnt/data").is_dir());
    assert!(c.rootfs.join("etc/app.conf").is_file());
    let config = std::fs::read_to_string(&c.config_path).unwrap();
    assert!(config.contains(&format!("lxc.mount.entry = {} mnt/data none bind,rw 0 0", data.display())));
}

#[test]
fn missing_bind_source_is_not_found() {
    let sb = Sandbox::new();
    let mut spec = ContainerSpec::new(name("c3"));
    spec.bind_mounts = BTreeMap::from([(sb.dir.path().join("absent"), PathBuf::from("/mnt/x"))]);
    let err = sb.orchestrator.create(spec).unwrap_err();
    assert!(matches!(err, ThinLxcError::NotFound { kind: "bind mount source", .. }));
}

#[test]
fn destroy_refuses_running_container() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    sb.orchestrator.start(&c.name).expect("start");

    let err = sb.orchestrator.destroy(&c.name).unwrap_err();
    assert!(matches!(err, ThinLxcError::Conflict { .. }));
    assert!(c.path.exists());
    assert!(sb.host.calls("umount").is_empty());
}

#[test]
fn destroy_proceeds_when_state_is_unknown() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    sb.host.set_state("c1", ContainerState::Unknown);
    sb.orchestrator.destroy(&c.name).expect("destroy");
    assert!(!c.path.exists());
}

#[test]
fn destroy_unknown_container_is_not_found() {
    let sb = Sandbox::new();
    let err = sb.orchestrator.destroy(&name("ghost")).unwrap_err();
    assert!(matches!(err, ThinLxcError::NotFound { .. }));
}

#[test]
fn busy_unmount_is_retried() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    sb.host.fail_next_umounts(2);
    sb.orchestrator.destroy(&c.name).expect("destroy");
    assert_eq!(sb.host.calls("umount").len(), 3);
    assert!(!c.path.exists());
}

#[test]
fn exhausted_unmount_retries_keep_the_root() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    sb.host.fail_next_umounts(100);
    let err = sb.orchestrator.destroy(&c.name).unwrap_err();
    assert!(matches!(err, ThinLxcError::ExternalTool { .. }));
    // one attempt plus the configured retries
    assert_eq!(sb.host.calls("umount").len(), 6);
    assert!(c.path.exists());
}

#[test]
fn reload_restores_mounts_and_rules_after_reboot() {
    let sb = Sandbox::new();
    let mut created = Vec::new();
    for (i, n) in ["a1", "a2", "a3"].iter().enumerate() {
        let octet = 10 + u8::try_from(i).unwrap();
        let port = 9000 + u16::try_from(i).unwrap();
        created.push(sb.orchestrator.create(forwarded_spec(n, octet, port, 80)).expect("create"));
    }
    let merged: Vec<_> = created.iter().map(|c| c.ro_layer.as_path()).collect();
    sb.host.reboot(&merged);
    assert!(created.iter().all(|c| !sb.orchestrator.is_mounted(c)));

    let report = sb.orchestrator.reload().expect("reload");
    assert_eq!(report.reloaded, 3);
    assert!(report.is_clean());
    for c in &created {
        assert!(sb.orchestrator.is_mounted(c));
        assert!(sb.orchestrator.rule_exists(c));
    }
    assert_eq!(sb.host.rule_count(), 3);
}

#[test]
fn reload_is_idempotent() {
    let sb = Sandbox::new();
    let _ = sb
        .orchestrator
        .create(forwarded_spec("c1", 245, 9999, 8888))
        .expect("create");
    let mounts_before = sb.host.calls("mount ").len();

    let report = sb.orchestrator.reload().expect("reload");
    assert_eq!(report.reloaded, 1);
    assert_eq!(sb.host.calls("mount ").len(), mounts_before);
    assert_eq!(sb.host.rule_count(), 1);
}

#[test]
fn reload_without_ports_leaves_firewall_alone() {
    let sb = Sandbox::new();
    let c = sb.orchestrator.create(ContainerSpec::new(name("c1"))).expect("create");
    sb.host.reboot(&[c.ro_layer.as_path()]);

    let report = sb.orchestrator.reload().expect("reload");
    assert_eq!(report.reloaded, 1);
    assert!(sb.orchestrator.is_mounted(&c));
    assert!(sb.host.calls("iptables").is_empty());
    assert_eq!(sb.host.rule_count(), 0);
}

#[test]
fn reload_continues_past_a_failing_container() {
    let sb = Sandbox::new();
    let bad = sb.orchestrator.create(ContainerSpec::new(name("b1"))).expect("create");
    let good = sb.orchestrator.create(ContainerSpec::new(name("g1"))).expect("create");
    sb.host.reboot(&[bad.ro_layer.as_path(), good.ro_layer.as_path()]);
    sb.host.fail_mount_at(&bad.ro_layer);

    let report = sb.orchestrator.reload().expect("reload");
    assert_eq!(report.reloaded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, bad.name);
    assert!(sb.orchestrator.is_mounted(&good));
}

#[test]
fn list_reports_state_mount_and_forwarding() {
    let sb = Sandbox::new();
    let _ = sb
        .orchestrator
        .create(forwarded_spec("web", 20, 8080, 80))
        .expect("create");
    let _ = sb.orchestrator.create(ContainerSpec::new(name("db"))).expect("create");
    sb.orchestrator.start(&name("web")).expect("start");

    let statuses = sb.orchestrator.list().expect("list");
    let names: Vec<_> = statuses.iter().map(|s| s.container.name.to_string()).collect();
    assert_eq!(names, ["db", "web"]);
    assert_eq!(statuses[0].state, ContainerState::Stopped);
    assert!(!statuses[0].forwarded);
    assert_eq!(statuses[1].state, ContainerState::Running);
    assert!(statuses[1].mounted);
    assert!(statuses[1].forwarded);
}
