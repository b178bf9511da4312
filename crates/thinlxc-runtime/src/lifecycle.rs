//! Container lifecycle: create, destroy and reload.
//!
//! Every step is sequential and the first failure aborts the operation
//! without rolling back completed steps. Running `destroy` or `reload`
//! again converges a partially applied container.

use std::sync::Arc;

use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_common::types::{ContainerName, ContainerState};
use thinlxc_core::exec::CommandRunner;
use thinlxc_core::filesystem::bind::prepare_bind_mounts;
use thinlxc_core::network::forward::PortForward;

use crate::container::{Container, ContainerSpec};
use crate::lxc::LxcClient;
use crate::metadata::MetadataStore;
use crate::monitor::{MonitorOptions, StateMonitor};
use crate::render::ConfigRenderer;

/// Outcome of a [`Orchestrator::reload`] sweep.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Containers remounted and re-forwarded without error.
    pub reloaded: usize,
    /// Containers whose reload failed, with the first error hit.
    pub failures: Vec<(ContainerName, ThinLxcError)>,
}

impl ReloadReport {
    /// Whether every container reloaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Point-in-time view of one container.
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    /// Persisted configuration.
    pub container: Container,
    /// State reported by the runtime.
    pub state: ContainerState,
    /// Whether the overlay is mounted.
    pub mounted: bool,
    /// Whether the forwarding rule is installed.
    pub forwarded: bool,
}

/// Drives containers through their lifecycle on one host.
pub struct Orchestrator {
    config: ThinLxcConfig,
    runner: Arc<dyn CommandRunner>,
    store: MetadataStore,
    monitor: StateMonitor,
    renderer: ConfigRenderer,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator running external tools through `runner`.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Config` if the configuration is invalid, or
    /// `ThinLxcError::Render` if the built-in templates fail to load.
    pub fn new(config: ThinLxcConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        config.validate()?;
        let client = LxcClient::new(Arc::clone(&runner));
        Ok(Self {
            store: MetadataStore::new(config.containers_root.clone()),
            monitor: StateMonitor::new(client, MonitorOptions::from_config(&config)),
            renderer: ConfigRenderer::new()?,
            runner,
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ThinLxcConfig {
        &self.config
    }

    /// Metadata store backing this orchestrator.
    #[must_use]
    pub const fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// State monitor sharing this orchestrator's runner.
    #[must_use]
    pub const fn monitor(&self) -> &StateMonitor {
        &self.monitor
    }

    /// Runtime client sharing this orchestrator's runner.
    #[must_use]
    pub fn lxc(&self) -> LxcClient {
        LxcClient::new(Arc::clone(&self.runner))
    }

    fn forward_rule(&self, container: &Container) -> PortForward {
        container.port_forward(&self.config.bridge_subnet)
    }

    /// Creates a container and leaves it ready for `lxc-start`.
    ///
    /// Steps: validate, create the overlay directories, persist metadata,
    /// mount, prepare bind mounts, render configuration, install the
    /// forwarding rule.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Validation` for a name collision or bad
    /// parameters, `ThinLxcError::NotFound` for a missing base image or bind
    /// mount source, or the first failing step's error.
    pub fn create(&self, spec: ContainerSpec) -> Result<Container> {
        let container = Container::new(&self.config, spec)?;
        if !container.base_image.is_dir() {
            return Err(ThinLxcError::NotFound {
                kind: "base image",
                id: container.base_image.display().to_string(),
            });
        }
        tracing::info!(container = %container.name, path = %container.path.display(), "creating container");

        let layers = container.layers();
        layers.setup()?;
        self.store.persist(&container)?;
        layers.mount(self.runner.as_ref())?;
        let mounts = prepare_bind_mounts(&container.rootfs, &container.bind_mounts)?;
        self.renderer.render_all(&container, &mounts, &self.config)?;
        self.forward_rule(&container).forward(self.runner.as_ref())?;

        tracing::info!(container = %container.name, config = %container.config_path.display(), "container created");
        Ok(container)
    }

    /// Tears a stopped container down and removes its root.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::NotFound` if no metadata exists,
    /// `ThinLxcError::Conflict` if the runtime reports the container active,
    /// or the first failing step's error.
    pub fn destroy(&self, name: &ContainerName) -> Result<()> {
        let container = self.store.load(name)?;
        let state = self.monitor.query(name);
        if matches!(
            state,
            ContainerState::Running | ContainerState::Starting | ContainerState::Stopping
        ) {
            return Err(ThinLxcError::Conflict {
                message: format!("container {name} is {state}; stop it before destroying"),
            });
        }
        tracing::info!(container = %name, %state, "destroying container");

        self.forward_rule(&container).unforward(self.runner.as_ref())?;
        let layers = container.layers();
        if layers.is_mounted() {
            layers.unmount(
                self.runner.as_ref(),
                self.config.unmount_retries,
                self.config.unmount_backoff(),
            )?;
        } else {
            tracing::debug!(container = %name, "overlay not mounted, skipping unmount");
        }
        layers.cleanup()?;

        tracing::info!(container = %name, "container destroyed");
        Ok(())
    }

    /// Restores mounts and forwarding for every persisted container.
    ///
    /// Meant to run once after host boot. A container that fails is recorded
    /// in the report and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Returns an error only if the containers root cannot be listed.
    pub fn reload(&self) -> Result<ReloadReport> {
        let mut report = ReloadReport::default();
        for name in self.store.enumerate()? {
            match self.reload_one(&name) {
                Ok(()) => report.reloaded += 1,
                Err(e) => {
                    tracing::warn!(container = %name, error = %e, "reload failed");
                    report.failures.push((name, e));
                }
            }
        }
        tracing::info!(reloaded = report.reloaded, failed = report.failures.len(), "reload finished");
        Ok(report)
    }

    fn reload_one(&self, name: &ContainerName) -> Result<()> {
        let container = self.store.load(name)?;
        let layers = container.layers();
        if !layers.is_mounted() {
            layers.setup()?;
            layers.mount(self.runner.as_ref())?;
        }
        let rule = self.forward_rule(&container);
        if !rule.rule_exists(self.runner.as_ref()) {
            rule.forward(self.runner.as_ref())?;
        }
        tracing::debug!(container = %name, "container reloaded");
        Ok(())
    }

    /// Whether the container's overlay is mounted.
    #[must_use]
    pub fn is_mounted(&self, container: &Container) -> bool {
        container.layers().is_mounted()
    }

    /// Whether the container's forwarding rule is installed.
    #[must_use]
    pub fn rule_exists(&self, container: &Container) -> bool {
        self.forward_rule(container).rule_exists(self.runner.as_ref())
    }

    /// Current status of a persisted container.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::NotFound` if no metadata exists.
    pub fn status(&self, name: &ContainerName) -> Result<ContainerStatus> {
        let container = self.store.load(name)?;
        Ok(ContainerStatus {
            state: self.monitor.query(name),
            mounted: self.is_mounted(&container),
            forwarded: self.rule_exists(&container),
            container,
        })
    }

    /// Status of every persisted container, sorted by name.
    ///
    /// Containers whose metadata fails to load are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the containers root cannot be listed.
    pub fn list(&self) -> Result<Vec<ContainerStatus>> {
        Ok(self
            .store
            .enumerate()?
            .iter()
            .filter_map(|name| self.status(name).ok())
            .collect())
    }

    /// Asks the runtime to start a persisted container.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::NotFound` if no metadata exists, or the
    /// `lxc-start` failure.
    pub fn start(&self, name: &ContainerName) -> Result<()> {
        let container = self.store.load(name)?;
        self.lxc().start(&container)
    }

    /// Asks the runtime to stop a persisted container.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::NotFound` if no metadata exists, or the
    /// `lxc-stop` failure.
    pub fn stop(&self, name: &ContainerName) -> Result<()> {
        let _ = self.store.load(name)?;
        self.lxc().stop(name)
    }
}
