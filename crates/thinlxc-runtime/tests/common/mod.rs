//! In-memory host shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_common::types::ContainerState;
use thinlxc_core::exec::{CommandRunner, command_line};
use thinlxc_runtime::lifecycle::Orchestrator;

/// Simulates `mount`, `umount`, `iptables` and the `lxc-*` tools.
///
/// Mounting materializes `{merged}/rootfs`; unmounting removes it.
#[derive(Default)]
pub struct FakeHost {
    rules: Mutex<HashSet<String>>,
    states: Mutex<HashMap<String, ContainerState>>,
    calls: Mutex<Vec<String>>,
    umount_failures: AtomicU32,
    fail_mount: Mutex<HashSet<PathBuf>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_state(&self, name: &str, state: ContainerState) {
        let _ = self.states.lock().unwrap().insert(name.to_string(), state);
    }

    /// Makes the next `n` unmounts fail with "target is busy".
    pub fn fail_next_umounts(&self, n: u32) {
        self.umount_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_mount_at(&self, merged: &Path) {
        let _ = self.fail_mount.lock().unwrap().insert(merged.to_path_buf());
    }

    pub fn rule_count(&self) -> usize {
        self.rules.lock().unwrap().len()
    }

    /// Simulates a host reboot: mounts and firewall rules vanish.
    pub fn reboot(&self, mounted: &[&Path]) {
        self.rules.lock().unwrap().clear();
        for merged in mounted {
            let _ = std::fs::remove_dir_all(merged.join("rootfs"));
        }
    }

    pub fn calls(&self, program: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(program))
            .cloned()
            .collect()
    }

    fn failure(program: &str, args: &[String], output: &str) -> ThinLxcError {
        ThinLxcError::ExternalTool {
            command: command_line(program, args),
            output: output.to_string(),
        }
    }

    fn mount(&self, args: &[String]) -> Result<String> {
        let merged = PathBuf::from(args.last().unwrap());
        if self.fail_mount.lock().unwrap().contains(&merged) {
            return Err(Self::failure("mount", args, "mount: special device overlay does not exist"));
        }
        std::fs::create_dir_all(merged.join("rootfs/etc")).unwrap();
        Ok(String::new())
    }

    fn umount(&self, args: &[String]) -> Result<String> {
        let pending = self.umount_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.umount_failures.store(pending - 1, Ordering::SeqCst);
            return Err(Self::failure("umount", args, "umount: target is busy"));
        }
        let merged = PathBuf::from(&args[0]);
        std::fs::remove_dir_all(merged.join("rootfs")).unwrap();
        Ok(String::new())
    }

    fn iptables(&self, args: &[String]) -> Result<String> {
        let key = args[3..].join(" ");
        let mut rules = self.rules.lock().unwrap();
        let ok = match args[2].as_str() {
            "-C" => rules.contains(&key),
            "-A" => rules.insert(key),
            "-D" => rules.remove(&key),
            other => panic!("unexpected iptables action {other}"),
        };
        if ok {
            Ok(String::new())
        } else {
            Err(Self::failure("iptables", args, "Bad rule (does a matching rule exist in that chain?)."))
        }
    }

    fn lxc(&self, program: &str, args: &[String]) -> Result<String> {
        let name = args[1].clone();
        let mut states = self.states.lock().unwrap();
        match program {
            "lxc-info" => {
                let state = states.get(&name).copied().unwrap_or(ContainerState::Stopped);
                Ok(format!("State:          {state}\nPID:            4242\n"))
            }
            "lxc-start" => {
                let _ = states.insert(name, ContainerState::Running);
                Ok(String::new())
            }
            "lxc-stop" => {
                let _ = states.insert(name, ContainerState::Stopped);
                Ok(String::new())
            }
            other => panic!("unexpected lxc tool {other}"),
        }
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push(command_line(program, args));
        match program {
            "mount" => self.mount(args),
            "umount" => self.umount(args),
            "iptables" => self.iptables(args),
            _ => self.lxc(program, args),
        }
    }
}

/// A scratch host: containers root, base image and an orchestrator.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub host: Arc<FakeHost>,
    pub orchestrator: Orchestrator,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base_image = dir.path().join("baseCN");
        std::fs::create_dir_all(base_image.join("rootfs/etc")).unwrap();

        let config = ThinLxcConfig {
            containers_root: dir.path().join("containers"),
            base_image,
            unmount_backoff_ms: 1,
            poll_interval_ms: 10,
            settle_delay_ms: 0,
            wait_timeout_ms: 2_000,
            ..ThinLxcConfig::default()
        };
        let host = FakeHost::new();
        let orchestrator = Orchestrator::new(config, host.clone()).unwrap();
        Self {
            dir,
            host,
            orchestrator,
        }
    }

    pub fn containers_root(&self) -> PathBuf {
        self.orchestrator.config().containers_root.clone()
    }
}
